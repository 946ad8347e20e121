// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::provisioner::Stage;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Context '{0}' not found in kubeconfig")]
    ContextNotFound(String),

    #[error("API server unreachable: {0}")]
    Unreachable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Kubernetes API error: {0}")]
    ApiError(#[from] kube::Error),

    #[error("Timed out waiting for secret {0} to be populated")]
    SecretTimeout(String),

    #[error("Secret creation failed: {0}")]
    SecretCreateFailed(String),

    #[error("Invalid output path {}: {source}", path.display())]
    PathError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to assemble kubeconfig: {0}")]
    AssemblyError(String),

    #[error("Failed to write kubeconfig {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load kubeconfig: {0}")]
    KubeconfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cluster not resolved: {0}")]
    ClusterNotResolved(String),

    #[error("Pipeline already failed: {0}")]
    AlreadyFailed(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

impl ProvisionError {
    /// Classify a Kubernetes API failure, splitting out authorization errors.
    pub fn from_api(err: kube::Error, action: &str) -> Self {
        match err {
            kube::Error::Api(ref resp) if resp.code == 403 => {
                ProvisionError::PermissionDenied(format!("{}: {}", action, resp.message))
            }
            other => ProvisionError::ApiError(other),
        }
    }
}

/// A pipeline failure tagged with the stage that produced it.
#[derive(Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: ProvisionError,
}

pub type Result<T> = std::result::Result<T, ProvisionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use kube::error::ErrorResponse;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "forbidden by policy".to_string(),
            reason: "Forbidden".to_string(),
            code,
        })
    }

    #[test]
    fn test_from_api_forbidden_is_permission_denied() {
        let err = ProvisionError::from_api(api_error(403), "create serviceaccount ci/deployer");
        match err {
            ProvisionError::PermissionDenied(msg) => {
                assert!(msg.contains("create serviceaccount ci/deployer"));
                assert!(msg.contains("forbidden by policy"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_api_other_codes_wrap_transport_error() {
        let err = ProvisionError::from_api(api_error(500), "get secret");
        assert!(matches!(err, ProvisionError::ApiError(_)));
    }

    #[test]
    fn test_stage_error_names_stage_and_cause() {
        let err = StageError {
            stage: Stage::ResolveCluster,
            source: ProvisionError::ContextNotFound("prod".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "resolve cluster failed: Context 'prod' not found in kubeconfig"
        );
    }
}
