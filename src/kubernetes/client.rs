// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Source kubeconfig loading and client creation

use crate::constants::timeouts::{CONNECT_SECS, READ_SECS};
use crate::error::{ProvisionError, Result};
use crate::types::ClusterContext;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config as KConfig};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// A client bound to one context of the source kubeconfig
#[derive(Clone)]
pub struct Connection {
    pub client: Client,
    pub context: ClusterContext,
    pub api_server_url: String,
}

/// Load the source kubeconfig and build a client for the requested context
#[instrument(skip(source), fields(context = %context))]
pub async fn connect(source: Option<&Path>, context: &ClusterContext) -> Result<Connection> {
    let kubeconfig = read_kubeconfig(source)?;
    let context_name = select_context(&kubeconfig, context)?;

    let options = KubeConfigOptions {
        context: Some(context_name.clone()),
        ..Default::default()
    };
    let mut config = KConfig::from_custom_kubeconfig(kubeconfig, &options)
        .await
        .map_err(|e| {
            ProvisionError::KubeconfigError(format!(
                "Failed to create config for context {}: {}",
                context_name, e
            ))
        })?;
    config.connect_timeout = Some(Duration::from_secs(CONNECT_SECS));
    config.read_timeout = Some(Duration::from_secs(READ_SECS));

    let api_server_url = config.cluster_url.to_string().trim_end_matches('/').to_string();
    debug!("Context {} points at {}", context_name, api_server_url);

    let client = Client::try_from(config)
        .map_err(|e| ProvisionError::KubeconfigError(format!("Failed to create client: {}", e)))?;

    Ok(Connection {
        client,
        context: ClusterContext::new(context_name),
        api_server_url,
    })
}

fn read_kubeconfig(source: Option<&Path>) -> Result<Kubeconfig> {
    match source {
        Some(path) => {
            info!("Reading kubeconfig from {}", path.display());
            Kubeconfig::read_from(path).map_err(|e| {
                ProvisionError::KubeconfigError(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                ))
            })
        }
        None => Kubeconfig::read().map_err(|e| {
            ProvisionError::KubeconfigError(format!("Failed to read default kubeconfig: {}", e))
        }),
    }
}

/// Pick the context to use, falling back to `current-context` when none was requested
pub fn select_context(kubeconfig: &Kubeconfig, requested: &ClusterContext) -> Result<String> {
    let name = if requested.is_current() {
        kubeconfig
            .current_context
            .clone()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                ProvisionError::ContextNotFound(
                    "<current-context> (no context requested and none is current)".to_string(),
                )
            })?
    } else {
        requested.name().to_string()
    };

    if kubeconfig.contexts.iter().any(|c| c.name == name) {
        Ok(name)
    } else {
        Err(ProvisionError::ContextNotFound(name))
    }
}

/// Confirm the API server answers, returning its version string
#[instrument(skip(client))]
pub async fn verify_reachable(client: &Client) -> Result<String> {
    let info = client
        .apiserver_version()
        .await
        .map_err(|e| ProvisionError::Unreachable(e.to_string()))?;
    Ok(info.git_version)
}
