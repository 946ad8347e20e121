// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Service account management utilities

use crate::constants::{annotations, MANAGER_NAME};
use crate::error::{ProvisionError, Result};
use crate::types::{Diagnostic, ServiceAccount};
use k8s_openapi::api::core::v1::ServiceAccount as KServiceAccount;
use kube::{
    api::{ObjectMeta, PostParams},
    Api, Client,
};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Ensure the service account exists, creating it if it doesn't
#[instrument(skip(client, sa), fields(service_account = %sa.qualified_name()))]
pub async fn ensure_service_account(client: &Client, sa: &ServiceAccount) -> Result<Diagnostic> {
    let accounts: Api<KServiceAccount> = Api::namespaced(client.clone(), &sa.namespace);

    match accounts.get(&sa.name).await {
        Ok(_) => {
            debug!("Service account {} already exists", sa.qualified_name());
            Ok(Diagnostic::new(format!(
                "service account {} already exists",
                sa.qualified_name()
            )))
        }
        Err(kube::Error::Api(err)) if err.code == 404 => create_service_account(client, sa).await,
        Err(e) => Err(ProvisionError::from_api(
            e,
            &format!("get serviceaccount {}", sa.qualified_name()),
        )),
    }
}

/// Create the service account; an AlreadyExists conflict counts as success
#[instrument(skip(client, sa), fields(service_account = %sa.qualified_name()))]
pub async fn create_service_account(client: &Client, sa: &ServiceAccount) -> Result<Diagnostic> {
    let accounts: Api<KServiceAccount> = Api::namespaced(client.clone(), &sa.namespace);

    info!("Creating service account {}", sa.qualified_name());
    match accounts.create(&PostParams::default(), &build_service_account(sa)).await {
        Ok(_) => {
            info!("Service account {} created successfully", sa.qualified_name());
            Ok(Diagnostic::new(format!(
                "service account {} created",
                sa.qualified_name()
            )))
        }
        Err(kube::Error::Api(err)) if err.code == 409 => {
            debug!("Service account {} was created concurrently", sa.qualified_name());
            Ok(Diagnostic::new(format!(
                "service account {} already exists",
                sa.qualified_name()
            )))
        }
        Err(e) => Err(ProvisionError::from_api(
            e,
            &format!("create serviceaccount {}", sa.qualified_name()),
        )),
    }
}

fn build_service_account(sa: &ServiceAccount) -> KServiceAccount {
    KServiceAccount {
        metadata: ObjectMeta {
            name: Some(sa.name.clone()),
            namespace: Some(sa.namespace.clone()),
            labels: Some(managed_labels()),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub(crate) fn managed_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(annotations::MANAGED_BY.to_string(), MANAGER_NAME.to_string())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        conflict_json, forbidden_json, not_found_json, paths, service_account_json, MockService,
    };

    fn account() -> ServiceAccount {
        ServiceAccount::new("ci", "ci-deployer")
    }

    #[tokio::test]
    async fn test_existing_account_is_not_recreated() {
        let mock = MockService::new().on_get(
            &paths::service_account("ci", "ci-deployer"),
            200,
            &service_account_json("ci", "ci-deployer"),
        );
        let client = mock.clone().into_client();

        let diagnostic = ensure_service_account(&client, &account()).await.unwrap();

        assert!(diagnostic.summary.contains("already exists"));
        assert_eq!(mock.count("POST", &paths::service_accounts("ci")), 0);
    }

    #[tokio::test]
    async fn test_missing_account_is_created() {
        let mock = MockService::new()
            .on_get(
                &paths::service_account("ci", "ci-deployer"),
                404,
                &not_found_json("serviceaccounts", "ci-deployer"),
            )
            .on_post(
                &paths::service_accounts("ci"),
                201,
                &service_account_json("ci", "ci-deployer"),
            );
        let client = mock.clone().into_client();

        let diagnostic = ensure_service_account(&client, &account()).await.unwrap();

        assert_eq!(diagnostic.summary, "service account ci/ci-deployer created");
        assert_eq!(mock.count("POST", &paths::service_accounts("ci")), 1);
    }

    #[tokio::test]
    async fn test_create_conflict_counts_as_success() {
        let mock = MockService::new().on_post(
            &paths::service_accounts("ci"),
            409,
            &conflict_json("serviceaccounts", "ci-deployer"),
        );
        let client = mock.into_client();

        let diagnostic = create_service_account(&client, &account()).await.unwrap();
        assert!(diagnostic.summary.contains("already exists"));
    }

    #[tokio::test]
    async fn test_forbidden_create_is_permission_denied() {
        let mock = MockService::new().on_post(
            &paths::service_accounts("ci"),
            403,
            &forbidden_json("serviceaccounts is forbidden"),
        );
        let client = mock.into_client();

        let err = ensure_service_account(&client, &account()).await.unwrap_err();
        assert!(matches!(err, ProvisionError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_api_error() {
        let mock = MockService::new().on_get(
            &paths::service_account("ci", "ci-deployer"),
            500,
            r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"etcd unavailable","reason":"InternalError","code":500}"#,
        );
        let client = mock.into_client();

        let err = ensure_service_account(&client, &account()).await.unwrap_err();
        assert!(matches!(err, ProvisionError::ApiError(_)));
    }

    #[test]
    fn test_build_service_account_is_labelled() {
        let built = build_service_account(&account());
        assert_eq!(built.metadata.name.as_deref(), Some("ci-deployer"));
        assert_eq!(built.metadata.namespace.as_deref(), Some("ci"));
        assert_eq!(
            built.metadata.labels.unwrap().get(annotations::MANAGED_BY).unwrap(),
            MANAGER_NAME
        );
    }
}
