// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! A connection to one cluster and the provisioning operations run against it.

use crate::error::{ProvisionError, Result};
use crate::kubeconfig::KubeconfigAssembler;
use crate::kubernetes::{
    connect, ensure_admin_bindings, ensure_service_account, ensure_token_secret,
    verify_reachable, wait_for_token, Connection, SecretRetry,
};
use crate::types::{ClusterContext, Diagnostic, ProvisionedCredential, ServiceAccount};
use kube::Client;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

/// Where the kubeconfig goes, plus an owner-only temporary file beside it
/// that replaces the destination once the content is complete. Dropping
/// the target removes the temporary file and leaves the destination as is.
#[derive(Debug)]
pub struct KubeconfigTarget {
    path: PathBuf,
    temp: NamedTempFile,
}

impl KubeconfigTarget {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub struct Cluster {
    source_kubeconfig: Option<PathBuf>,
    context: ClusterContext,
    connection: Option<Connection>,
    resolved: bool,
    secret_retry: SecretRetry,
}

impl Cluster {
    /// A cluster reached through a context of a kubeconfig file.
    /// `None` uses the default kubeconfig lookup.
    pub fn new(source_kubeconfig: Option<PathBuf>, context: ClusterContext) -> Self {
        Self {
            source_kubeconfig,
            context,
            connection: None,
            resolved: false,
            secret_retry: SecretRetry::default(),
        }
    }

    /// A cluster reached through an already built client
    pub fn with_client(context: ClusterContext, client: Client, api_server_url: &str) -> Self {
        Self {
            source_kubeconfig: None,
            context: context.clone(),
            connection: Some(Connection {
                client,
                context,
                api_server_url: api_server_url.trim_end_matches('/').to_string(),
            }),
            resolved: false,
            secret_retry: SecretRetry::default(),
        }
    }

    pub fn with_secret_retry(mut self, retry: SecretRetry) -> Self {
        self.secret_retry = retry;
        self
    }

    pub fn context(&self) -> &ClusterContext {
        &self.context
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn api_server_url(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.api_server_url.as_str())
    }

    fn connection(&self) -> Result<&Connection> {
        match &self.connection {
            Some(connection) if self.resolved => Ok(connection),
            _ => Err(ProvisionError::ClusterNotResolved(format!(
                "context {} has not been resolved",
                self.context
            ))),
        }
    }

    /// Check the context exists and its API server answers
    #[instrument(skip(self), fields(context = %self.context))]
    pub async fn resolve(&mut self) -> Result<Diagnostic> {
        let connection = match &self.connection {
            Some(connection) => connection.clone(),
            None => {
                let connection =
                    connect(self.source_kubeconfig.as_deref(), &self.context).await?;
                self.connection = Some(connection.clone());
                connection
            }
        };
        self.context = connection.context.clone();

        let version = verify_reachable(&connection.client).await?;
        self.resolved = true;

        info!(
            "Resolved context {} at {} ({})",
            self.context, connection.api_server_url, version
        );
        Ok(Diagnostic::new(format!(
            "context {} resolved to {} ({})",
            self.context, connection.api_server_url, version
        )))
    }

    /// Get-or-create the service account and its admin binding(s)
    #[instrument(skip(self, sa), fields(context = %self.context, service_account = %sa.qualified_name()))]
    pub async fn ensure_service_account(&self, sa: &ServiceAccount) -> Result<Diagnostic> {
        sa.validate()?;
        let connection = self.connection()?;

        let account = ensure_service_account(&connection.client, sa).await?;
        let bindings = ensure_admin_bindings(&connection.client, sa).await?;

        Ok(Diagnostic {
            summary: format!("{}; {}", account.summary, bindings.summary),
            warnings: account.warnings.into_iter().chain(bindings.warnings).collect(),
        })
    }

    /// Make sure the token secret exists and read back its token and CA
    #[instrument(skip(self, sa), fields(context = %self.context, service_account = %sa.qualified_name()))]
    pub async fn ensure_secret(&self, sa: &ServiceAccount) -> Result<ProvisionedCredential> {
        let connection = self.connection()?;

        let created = ensure_token_secret(&connection.client, sa).await?;
        debug!("{}", created.summary);

        let data = wait_for_token(&connection.client, sa, &self.secret_retry).await?;

        Ok(ProvisionedCredential {
            service_account: sa.qualified_name(),
            token: data.token,
            ca_certificate: data.ca_certificate,
            api_server_url: connection.api_server_url.clone(),
        })
    }

    /// Prepare the output file, creating parent directories as needed.
    /// An existing directory gets `kubeconfig-<name>` appended. A file
    /// already at the destination is not touched until the new content
    /// is written.
    #[instrument(skip(self, sa), fields(service_account = %sa.qualified_name()))]
    pub async fn define_kubeconfig(
        &self,
        output: &Path,
        sa: &ServiceAccount,
    ) -> Result<KubeconfigTarget> {
        let default_name = default_output_name(sa);
        let mut path = if output.as_os_str().is_empty() {
            PathBuf::from(&default_name)
        } else {
            output.to_path_buf()
        };

        if fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false) {
            path.push(&default_name);
        }

        let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent.to_path_buf(),
            None => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .await
            .map_err(|source| ProvisionError::PathError {
                path: parent.clone(),
                source,
            })?;

        // Created 0600 on unix
        let temp = tempfile::Builder::new()
            .prefix(".kubeconfig-")
            .tempfile_in(&parent)
            .map_err(|source| ProvisionError::PathError {
                path: parent.clone(),
                source,
            })?;

        debug!(
            "Kubeconfig will be written to {} via {}",
            path.display(),
            temp.path().display()
        );
        Ok(KubeconfigTarget { path, temp })
    }

    /// Render the kubeconfig for the credential and write it to the target
    #[instrument(skip(self, target, sa, credential), fields(path = %target.path.display()))]
    pub async fn create_kubeconfig(
        &self,
        target: KubeconfigTarget,
        sa: &ServiceAccount,
        credential: &ProvisionedCredential,
    ) -> Result<PathBuf> {
        self.connection()?;

        let assembler = KubeconfigAssembler::new(self.context.name()).with_namespace(&sa.namespace);
        let content = assembler.build(
            &credential.api_server_url,
            &credential.ca_certificate,
            &sa.name,
            &credential.token,
        )?;

        let KubeconfigTarget { path, temp } = target;
        let write_error = |source: std::io::Error| ProvisionError::WriteError {
            path: path.clone(),
            source,
        };
        let (file, temp_path) = temp.into_parts();
        let mut file = File::from_std(file);
        file.write_all(&content).await.map_err(write_error)?;
        file.flush().await.map_err(write_error)?;
        file.sync_all().await.map_err(write_error)?;
        drop(file);

        temp_path.persist(&path).map_err(|e| write_error(e.error))?;

        info!(
            "Wrote kubeconfig for {} to {}",
            assembler.entry_name(&sa.name),
            path.display()
        );
        Ok(path)
    }
}

fn default_output_name(sa: &ServiceAccount) -> String {
    format!("kubeconfig-{}", sa.name)
}
