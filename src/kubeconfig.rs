// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Standalone kubeconfig generation for a service account token.

use crate::error::{ProvisionError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct KubeconfigFile {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub clusters: Vec<NamedCluster>,
    pub users: Vec<NamedUser>,
    pub contexts: Vec<NamedContext>,
    #[serde(rename = "current-context")]
    pub current_context: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: ClusterEntry,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClusterEntry {
    pub server: String,
    #[serde(rename = "certificate-authority-data")]
    pub certificate_authority_data: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NamedUser {
    pub name: String,
    pub user: UserEntry,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserEntry {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NamedContext {
    pub name: String,
    pub context: ContextEntry,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ContextEntry {
    pub cluster: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Builds a single cluster/user/context kubeconfig bound to a bearer token.
#[derive(Debug, Clone)]
pub struct KubeconfigAssembler {
    source_context: String,
    namespace: Option<String>,
}

impl KubeconfigAssembler {
    pub fn new(source_context: impl Into<String>) -> Self {
        Self {
            source_context: source_context.into(),
            namespace: None,
        }
    }

    /// Default namespace recorded in the generated context
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Name shared by the cluster, user and context entries
    pub fn entry_name(&self, service_account_name: &str) -> String {
        format!("{}@{}", service_account_name, self.source_context)
    }

    /// Render the kubeconfig. Identical inputs always give identical bytes.
    pub fn build(
        &self,
        api_server_url: &str,
        ca_certificate: &[u8],
        service_account_name: &str,
        token: &[u8],
    ) -> Result<Vec<u8>> {
        let file = self.document(api_server_url, ca_certificate, service_account_name, token)?;
        let yaml = serde_yaml::to_string(&file)
            .map_err(|e| ProvisionError::AssemblyError(format!("Failed to serialize: {}", e)))?;
        Ok(yaml.into_bytes())
    }

    fn document(
        &self,
        api_server_url: &str,
        ca_certificate: &[u8],
        service_account_name: &str,
        token: &[u8],
    ) -> Result<KubeconfigFile> {
        if api_server_url.is_empty() {
            return Err(ProvisionError::AssemblyError("API server URL is empty".to_string()));
        }
        if service_account_name.is_empty() {
            return Err(ProvisionError::AssemblyError(
                "service account name is empty".to_string(),
            ));
        }
        let token = std::str::from_utf8(token)
            .map_err(|e| ProvisionError::AssemblyError(format!("token is not UTF-8: {}", e)))?;
        if token.is_empty() {
            return Err(ProvisionError::AssemblyError("token is empty".to_string()));
        }

        let name = self.entry_name(service_account_name);

        Ok(KubeconfigFile {
            api_version: "v1".to_string(),
            kind: "Config".to_string(),
            clusters: vec![NamedCluster {
                name: name.clone(),
                cluster: ClusterEntry {
                    server: api_server_url.to_string(),
                    certificate_authority_data: STANDARD.encode(ca_certificate),
                },
            }],
            users: vec![NamedUser {
                name: name.clone(),
                user: UserEntry {
                    token: token.to_string(),
                },
            }],
            contexts: vec![NamedContext {
                name: name.clone(),
                context: ContextEntry {
                    cluster: name.clone(),
                    user: name.clone(),
                    namespace: self.namespace.clone(),
                },
            }],
            current_context: name,
        })
    }
}
