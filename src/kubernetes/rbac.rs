// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Role bindings granting the service account administrative rights

use crate::constants::rbac::{ADMIN_CLUSTER_ROLE, API_GROUP};
use crate::error::{ProvisionError, Result};
use crate::kubernetes::service_accounts::managed_labels;
use crate::types::{Diagnostic, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRoleBinding, RoleBinding, RoleRef, Subject};
use kube::{
    api::{ObjectMeta, PostParams},
    Api, Client,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use tracing::{debug, info, instrument, warn};

/// Name of the cluster-wide binding for a service account
pub fn cluster_role_binding_name(sa: &ServiceAccount) -> String {
    format!("{}-{}-{}", sa.namespace, sa.name, ADMIN_CLUSTER_ROLE)
}

/// Name of the per-namespace binding for a service account
pub fn role_binding_name(sa: &ServiceAccount) -> String {
    format!("{}-admin", sa.name)
}

/// Grant the service account admin rights: cluster-wide when no target
/// namespace list was given, otherwise one RoleBinding per bound namespace.
#[instrument(skip(client, sa), fields(service_account = %sa.qualified_name()))]
pub async fn ensure_admin_bindings(client: &Client, sa: &ServiceAccount) -> Result<Diagnostic> {
    if sa.is_cluster_wide() {
        let name = cluster_role_binding_name(sa);
        let api: Api<ClusterRoleBinding> = Api::all(client.clone());
        let desired = ClusterRoleBinding {
            metadata: binding_meta(&name, None),
            role_ref: admin_role_ref(),
            subjects: Some(vec![subject(sa)]),
        };
        let label = format!("clusterrolebinding {}", name);
        return ensure_binding(api, &name, &label, desired, sa, |b| {
            (&b.role_ref, b.subjects.as_deref())
        })
        .await;
    }

    let name = role_binding_name(sa);
    let mut summaries = Vec::new();
    let mut warnings = Vec::new();

    for namespace in sa.bound_namespaces() {
        let api: Api<RoleBinding> = Api::namespaced(client.clone(), namespace);
        let desired = RoleBinding {
            metadata: binding_meta(&name, Some(namespace)),
            role_ref: admin_role_ref(),
            subjects: Some(vec![subject(sa)]),
        };
        let label = format!("rolebinding {}/{}", namespace, name);
        let diagnostic = ensure_binding(api, &name, &label, desired, sa, |b| {
            (&b.role_ref, b.subjects.as_deref())
        })
        .await?;
        summaries.push(diagnostic.summary);
        warnings.extend(diagnostic.warnings);
    }

    Ok(Diagnostic {
        summary: summaries.join("; "),
        warnings,
    })
}

/// Get-or-create a binding. An existing binding that grants a different role
/// or omits the account is reported as a warning and left as is.
async fn ensure_binding<K, F>(
    api: Api<K>,
    name: &str,
    label: &str,
    desired: K,
    sa: &ServiceAccount,
    grant_of: F,
) -> Result<Diagnostic>
where
    K: Clone + DeserializeOwned + Serialize + Debug,
    F: Fn(&K) -> (&RoleRef, Option<&[Subject]>),
{
    match api.get(name).await {
        Ok(existing) => {
            let (role_ref, subjects) = grant_of(&existing);
            let mut diagnostic = Diagnostic::new(format!("{} already exists", label));
            if let Some(warning) = binding_conflict(label, role_ref, subjects, sa) {
                warn!("{}", warning);
                diagnostic.warnings.push(warning);
            } else {
                debug!("{} already grants {}", label, ADMIN_CLUSTER_ROLE);
            }
            Ok(diagnostic)
        }
        Err(kube::Error::Api(err)) if err.code == 404 => {
            info!("Creating {}", label);
            match api.create(&PostParams::default(), &desired).await {
                Ok(_) => Ok(Diagnostic::new(format!("{} created", label))),
                Err(kube::Error::Api(err)) if err.code == 409 => {
                    Ok(Diagnostic::new(format!("{} already exists", label)))
                }
                Err(e) => Err(ProvisionError::from_api(e, &format!("create {}", label))),
            }
        }
        Err(e) => Err(ProvisionError::from_api(e, &format!("get {}", label))),
    }
}

fn binding_conflict(
    label: &str,
    role_ref: &RoleRef,
    subjects: Option<&[Subject]>,
    sa: &ServiceAccount,
) -> Option<String> {
    if role_ref.kind != "ClusterRole" || role_ref.name != ADMIN_CLUSTER_ROLE {
        return Some(format!(
            "{} exists with role {} {}, expected ClusterRole {}; left untouched",
            label, role_ref.kind, role_ref.name, ADMIN_CLUSTER_ROLE
        ));
    }

    let bound = subjects.unwrap_or_default().iter().any(|s| {
        s.kind == "ServiceAccount"
            && s.name == sa.name
            && s.namespace.as_deref() == Some(sa.namespace.as_str())
    });
    if !bound {
        return Some(format!(
            "{} exists but does not bind service account {}; left untouched",
            label,
            sa.qualified_name()
        ));
    }

    None
}

fn binding_meta(name: &str, namespace: Option<&str>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        labels: Some(managed_labels()),
        ..Default::default()
    }
}

fn admin_role_ref() -> RoleRef {
    RoleRef {
        api_group: API_GROUP.to_string(),
        kind: "ClusterRole".to_string(),
        name: ADMIN_CLUSTER_ROLE.to_string(),
    }
}

fn subject(sa: &ServiceAccount) -> Subject {
    Subject {
        kind: "ServiceAccount".to_string(),
        name: sa.name.clone(),
        namespace: Some(sa.namespace.clone()),
        ..Default::default()
    }
}
