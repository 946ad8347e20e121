// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The provisioning pipeline: a strictly linear state machine over one
//! cluster and one service account.
//!
//! Each stage consumes the previous stage's output. The first failure moves
//! the pipeline to `Failed` and nothing after it runs. Resources already
//! created are left in place; every cluster-mutating stage is idempotent, so
//! re-running is the recovery path.

use crate::cluster::{Cluster, KubeconfigTarget};
use crate::config::ProvisionConfig;
use crate::error::{ProvisionError, StageError};
use crate::types::{ProvisionedCredential, ServiceAccount};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// A unit of work in the pipeline, named in failure reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ResolveCluster,
    EnsureServiceAccount,
    EnsureSecret,
    DefineKubeconfig,
    CreateKubeconfig,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::ResolveCluster => "resolve cluster",
            Stage::EnsureServiceAccount => "ensure service account",
            Stage::EnsureSecret => "materialize token secret",
            Stage::DefineKubeconfig => "define kubeconfig",
            Stage::CreateKubeconfig => "create kubeconfig",
        })
    }
}

/// Where the pipeline is. Each state carries what the next stage needs.
#[derive(Debug)]
pub enum ProvisionState {
    Init,
    ClusterResolved,
    ServiceAccountEnsured,
    SecretMaterialized(ProvisionedCredential),
    KubeconfigDefined(ProvisionedCredential, KubeconfigTarget),
    KubeconfigWritten(PathBuf),
    Done(PathBuf),
    Failed { stage: Stage, cause: String },
}

impl ProvisionState {
    /// The stage that moves this state forward, if any
    pub fn next_stage(&self) -> Option<Stage> {
        match self {
            ProvisionState::Init => Some(Stage::ResolveCluster),
            ProvisionState::ClusterResolved => Some(Stage::EnsureServiceAccount),
            ProvisionState::ServiceAccountEnsured => Some(Stage::EnsureSecret),
            ProvisionState::SecretMaterialized(_) => Some(Stage::DefineKubeconfig),
            ProvisionState::KubeconfigDefined(..) => Some(Stage::CreateKubeconfig),
            ProvisionState::KubeconfigWritten(_)
            | ProvisionState::Done(_)
            | ProvisionState::Failed { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProvisionState::Init => "Init",
            ProvisionState::ClusterResolved => "ClusterResolved",
            ProvisionState::ServiceAccountEnsured => "ServiceAccountEnsured",
            ProvisionState::SecretMaterialized(_) => "SecretMaterialized",
            ProvisionState::KubeconfigDefined(..) => "KubeconfigDefined",
            ProvisionState::KubeconfigWritten(_) => "KubeconfigWritten",
            ProvisionState::Done(_) => "Done",
            ProvisionState::Failed { .. } => "Failed",
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOutcome {
    pub kubeconfig_path: PathBuf,
    /// Context name inside the generated kubeconfig
    pub context_name: String,
    /// Conditions reported along the way, such as conflicting bindings left untouched
    pub warnings: Vec<String>,
    pub stages: Vec<Stage>,
}

pub struct Provisioner {
    cluster: Cluster,
    account: ServiceAccount,
    output: PathBuf,
    timeout: Duration,
    state: ProvisionState,
    warnings: Vec<String>,
    completed: Vec<Stage>,
}

impl Provisioner {
    /// Build a pipeline for the configured cluster and service account.
    /// Invalid account names are rejected here, before any stage runs.
    pub fn new(config: ProvisionConfig) -> Result<Self, ProvisionError> {
        let cluster = Cluster::new(config.source_kubeconfig.clone(), config.context())
            .with_secret_retry(config.secret_retry.clone());
        Self::with_cluster(config, cluster)
    }

    /// Build a pipeline over an already constructed cluster
    pub fn with_cluster(config: ProvisionConfig, cluster: Cluster) -> Result<Self, ProvisionError> {
        let account = config.service_account();
        account.validate()?;

        Ok(Self {
            cluster,
            account,
            output: config.output_path(),
            timeout: config.timeout,
            state: ProvisionState::Init,
            warnings: Vec::new(),
            completed: Vec::new(),
        })
    }

    pub fn state(&self) -> &ProvisionState {
        &self.state
    }

    /// Run every remaining stage in order. Stops at the first failure, on
    /// cancellation, or when the overall deadline passes.
    #[instrument(skip(self, cancel), fields(service_account = %self.account.qualified_name()))]
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<ProvisionOutcome, StageError> {
        let deadline = Instant::now() + self.timeout;

        while let Some(stage) = self.state.next_stage() {
            let state = std::mem::replace(&mut self.state, ProvisionState::Init);
            debug!("Running stage '{}' from state {}", stage, state.name());

            let result = guarded(cancel, deadline, self.timeout, self.advance(state)).await;

            match result {
                Ok(next) => {
                    info!("Stage '{}' complete, now {}", stage, next.name());
                    self.completed.push(stage);
                    self.state = next;
                }
                Err(source) => {
                    error!("Stage '{}' failed: {}", stage, source);
                    self.state = ProvisionState::Failed {
                        stage,
                        cause: source.to_string(),
                    };
                    return Err(StageError { stage, source });
                }
            }
        }

        let path = match std::mem::replace(&mut self.state, ProvisionState::Init) {
            ProvisionState::KubeconfigWritten(path) | ProvisionState::Done(path) => path,
            ProvisionState::Failed { stage, cause } => {
                self.state = ProvisionState::Failed {
                    stage,
                    cause: cause.clone(),
                };
                return Err(StageError {
                    stage,
                    source: ProvisionError::AlreadyFailed(cause),
                });
            }
            other => {
                // Loop only exits on a state without a next stage
                let stage = other.next_stage().unwrap_or(Stage::CreateKubeconfig);
                self.state = other;
                return Err(StageError {
                    stage,
                    source: ProvisionError::AlreadyFailed("pipeline stopped early".to_string()),
                });
            }
        };

        self.state = ProvisionState::Done(path.clone());
        Ok(ProvisionOutcome {
            kubeconfig_path: path,
            context_name: format!("{}@{}", self.account.name, self.cluster.context().name()),
            warnings: self.warnings.clone(),
            stages: self.completed.clone(),
        })
    }

    async fn advance(&mut self, state: ProvisionState) -> Result<ProvisionState, ProvisionError> {
        match state {
            ProvisionState::Init => {
                let diagnostic = self.cluster.resolve().await?;
                debug!("{}", diagnostic.summary);
                Ok(ProvisionState::ClusterResolved)
            }
            ProvisionState::ClusterResolved => {
                let diagnostic = self.cluster.ensure_service_account(&self.account).await?;
                debug!("{}", diagnostic.summary);
                for warning in &diagnostic.warnings {
                    warn!("{}", warning);
                }
                self.warnings.extend(diagnostic.warnings);
                Ok(ProvisionState::ServiceAccountEnsured)
            }
            ProvisionState::ServiceAccountEnsured => {
                let credential = self.cluster.ensure_secret(&self.account).await?;
                Ok(ProvisionState::SecretMaterialized(credential))
            }
            ProvisionState::SecretMaterialized(credential) => {
                let target = self
                    .cluster
                    .define_kubeconfig(&self.output, &self.account)
                    .await?;
                Ok(ProvisionState::KubeconfigDefined(credential, target))
            }
            ProvisionState::KubeconfigDefined(credential, target) => {
                let path = self
                    .cluster
                    .create_kubeconfig(target, &self.account, &credential)
                    .await?;
                Ok(ProvisionState::KubeconfigWritten(path))
            }
            terminal => Ok(terminal),
        }
    }
}

/// Race a stage against cancellation and the pipeline deadline
async fn guarded<T>(
    cancel: &CancellationToken,
    deadline: Instant,
    timeout: Duration,
    work: impl Future<Output = Result<T, ProvisionError>>,
) -> Result<T, ProvisionError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProvisionError::Cancelled),
        _ = tokio::time::sleep_until(deadline) => Err(ProvisionError::DeadlineExceeded(timeout)),
        result = work => result,
    }
}
