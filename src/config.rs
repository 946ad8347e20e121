// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{poll, timeouts};
use crate::kubernetes::SecretRetry;
use crate::types::{ClusterContext, ServiceAccount};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Command line arguments; every flag can also come from the environment
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sa-kubeconfig",
    version,
    about = "Create a service account and a standalone kubeconfig for it",
    long_about = "Given a kubeconfig and context, creates:\n  \
        * a ServiceAccount\n  \
        * a binding granting it cluster-admin (cluster-wide, or per target namespace)\n  \
        * a token Secret for the ServiceAccount (if not already present)\n  \
        * a kubeconfig file authenticating as the ServiceAccount"
)]
pub struct Args {
    /// Kubeconfig to start with (defaults to $KUBECONFIG or ~/.kube/config)
    #[arg(short = 'i', long = "kubeconfig", env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig to write (defaults to kubeconfig-<service account name>)
    #[arg(short = 'o', long = "output", env = "SA_KUBECONFIG_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Context to use (defaults to the current context)
    #[arg(short = 'c', long = "context", env = "SA_KUBECONFIG_CONTEXT", default_value = "")]
    pub context: String,

    /// Namespace to create the service account in
    #[arg(short = 'n', long = "namespace", env = "SA_KUBECONFIG_NAMESPACE")]
    pub namespace: String,

    /// Service account name
    #[arg(short = 's', long = "service-account-name", env = "SA_KUBECONFIG_NAME")]
    pub service_account_name: String,

    /// Comma-separated namespaces to grant access to instead of the whole cluster
    #[arg(
        short = 't',
        long = "target-namespaces",
        env = "SA_KUBECONFIG_TARGET_NAMESPACES",
        default_value = ""
    )]
    pub target_namespaces: String,

    /// Overall deadline in seconds
    #[arg(long = "timeout", env = "SA_KUBECONFIG_TIMEOUT", default_value_t = timeouts::PIPELINE_SECS)]
    pub timeout: u64,

    /// Reads of the token secret before giving up
    #[arg(long = "secret-attempts", env = "SA_KUBECONFIG_SECRET_ATTEMPTS", default_value_t = poll::MAX_ATTEMPTS)]
    pub secret_attempts: u32,

    /// Verbose output
    #[arg(short = 'v', long = "verbose", env = "SA_KUBECONFIG_VERBOSE")]
    pub verbose: bool,
}

/// Everything one provisioning run needs, passed explicitly to the Provisioner
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub source_kubeconfig: Option<PathBuf>,
    /// Empty selects the kubeconfig's current context
    pub context: String,
    pub namespace: String,
    pub service_account_name: String,
    /// Comma-separated, possibly empty
    pub target_namespaces: String,
    pub output: Option<PathBuf>,
    pub timeout: Duration,
    pub secret_retry: SecretRetry,
}

impl ProvisionConfig {
    pub fn context(&self) -> ClusterContext {
        ClusterContext::new(self.context.trim())
    }

    pub fn service_account(&self) -> ServiceAccount {
        ServiceAccount::new(self.namespace.trim(), self.service_account_name.trim())
            .with_target_namespaces(&self.target_namespaces)
    }

    /// Requested output path, or `kubeconfig-<name>` in the working directory
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| {
                PathBuf::from(format!("kubeconfig-{}", self.service_account_name.trim()))
            })
    }
}

impl From<Args> for ProvisionConfig {
    fn from(args: Args) -> Self {
        Self {
            source_kubeconfig: args.kubeconfig.filter(|p| !p.as_os_str().is_empty()),
            context: args.context,
            namespace: args.namespace,
            service_account_name: args.service_account_name,
            target_namespaces: args.target_namespaces,
            output: args.output,
            timeout: Duration::from_secs(args.timeout.max(1)),
            secret_retry: SecretRetry {
                max_attempts: args.secret_attempts.max(1),
                ..SecretRetry::default()
            },
        }
    }
}
