// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Service account token secret creation and polling

use crate::constants::{annotations, poll, secret as keys};
use crate::error::{ProvisionError, Result};
use crate::kubernetes::service_accounts::managed_labels;
use crate::types::{Diagnostic, ServiceAccount};
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{ObjectMeta, PostParams},
    Api, Client,
};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Bounded exponential backoff used while the control plane fills in the token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRetry {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for SecretRetry {
    fn default() -> Self {
        Self {
            max_attempts: poll::MAX_ATTEMPTS,
            initial_interval: Duration::from_millis(poll::INITIAL_INTERVAL_MILLIS),
            max_interval: Duration::from_millis(poll::MAX_INTERVAL_MILLIS),
        }
    }
}

/// Token and CA read from a populated token secret
#[derive(Clone, PartialEq, Eq)]
pub struct TokenData {
    pub token: Vec<u8>,
    pub ca_certificate: Vec<u8>,
}

impl std::fmt::Debug for TokenData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenData")
            .field("token", &"<redacted>")
            .field("ca_certificate", &self.ca_certificate.len())
            .finish()
    }
}

/// Create the token secret for the service account unless it already exists
#[instrument(skip(client, sa), fields(service_account = %sa.qualified_name()))]
pub async fn ensure_token_secret(client: &Client, sa: &ServiceAccount) -> Result<Diagnostic> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), &sa.namespace);
    let name = sa.token_secret_name();

    match secrets.get(&name).await {
        Ok(existing) => {
            check_token_secret(&existing, sa)?;
            debug!("Token secret {}/{} already exists", sa.namespace, name);
            Ok(Diagnostic::new(format!(
                "secret {}/{} already exists",
                sa.namespace, name
            )))
        }
        Err(kube::Error::Api(err)) if err.code == 404 => {
            info!("Creating token secret {}/{}", sa.namespace, name);
            match secrets.create(&PostParams::default(), &build_token_secret(sa)).await {
                Ok(_) => Ok(Diagnostic::new(format!("secret {}/{} created", sa.namespace, name))),
                Err(kube::Error::Api(err)) if err.code == 409 => Ok(Diagnostic::new(format!(
                    "secret {}/{} already exists",
                    sa.namespace, name
                ))),
                Err(e) => Err(ProvisionError::SecretCreateFailed(format!(
                    "Failed to create secret {}/{}: {}",
                    sa.namespace, name, e
                ))),
            }
        }
        Err(e) => Err(ProvisionError::SecretCreateFailed(format!(
            "Failed to check secret {}/{}: {}",
            sa.namespace, name, e
        ))),
    }
}

/// Poll the token secret until both the token and the CA bundle are present.
/// Gives up with `SecretTimeout` after `retry.max_attempts` reads.
#[instrument(skip(client, sa, retry), fields(service_account = %sa.qualified_name()))]
pub async fn wait_for_token(
    client: &Client,
    sa: &ServiceAccount,
    retry: &SecretRetry,
) -> Result<TokenData> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), &sa.namespace);
    let name = sa.token_secret_name();
    let mut interval = retry.initial_interval;

    for attempt in 1..=retry.max_attempts {
        match secrets.get(&name).await {
            Ok(secret) => {
                if let Some(data) = token_data(&secret) {
                    info!("Token secret {}/{} populated", sa.namespace, name);
                    return Ok(data);
                }
                debug!(
                    "Token secret {}/{} not populated yet (attempt {}/{})",
                    sa.namespace, name, attempt, retry.max_attempts
                );
            }
            Err(e) => {
                warn!(
                    "Error reading token secret {}/{} (attempt {}/{}): {}",
                    sa.namespace, name, attempt, retry.max_attempts, e
                );
            }
        }

        if attempt < retry.max_attempts {
            sleep(interval).await;
            // Exponential backoff with max cap
            interval = (interval * 2).min(retry.max_interval);
        }
    }

    Err(ProvisionError::SecretTimeout(format!(
        "{}/{} after {} attempts",
        sa.namespace, name, retry.max_attempts
    )))
}

/// Reject a same-named secret that is not a token for this account
fn check_token_secret(secret: &Secret, sa: &ServiceAccount) -> Result<()> {
    let name = sa.token_secret_name();

    if secret.type_.as_deref() != Some(keys::TOKEN_TYPE) {
        return Err(ProvisionError::SecretCreateFailed(format!(
            "secret {}/{} exists with type {}, expected {}",
            sa.namespace,
            name,
            secret.type_.as_deref().unwrap_or("<none>"),
            keys::TOKEN_TYPE
        )));
    }

    let owner = secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(annotations::SERVICE_ACCOUNT_NAME));
    if owner.map(String::as_str) != Some(sa.name.as_str()) {
        return Err(ProvisionError::SecretCreateFailed(format!(
            "secret {}/{} belongs to service account {}, not {}",
            sa.namespace,
            name,
            owner.map(String::as_str).unwrap_or("<none>"),
            sa.name
        )));
    }

    Ok(())
}

fn token_data(secret: &Secret) -> Option<TokenData> {
    let data = secret.data.as_ref()?;
    let token = data.get(keys::TOKEN_KEY).filter(|t| !t.0.is_empty())?;
    let ca = data.get(keys::CA_KEY).filter(|c| !c.0.is_empty())?;

    Some(TokenData {
        token: token.0.clone(),
        ca_certificate: ca.0.clone(),
    })
}

fn build_token_secret(sa: &ServiceAccount) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(sa.token_secret_name()),
            namespace: Some(sa.namespace.clone()),
            labels: Some(managed_labels()),
            annotations: Some(BTreeMap::from([(
                annotations::SERVICE_ACCOUNT_NAME.to_string(),
                sa.name.clone(),
            )])),
            ..Default::default()
        },
        type_: Some(keys::TOKEN_TYPE.to_string()),
        ..Default::default()
    }
}
