// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Kubernetes annotation keys and labels
pub mod annotations {
    /// Binds a token secret to its service account
    pub const SERVICE_ACCOUNT_NAME: &str = "kubernetes.io/service-account.name";
    /// Marks resources created by this tool
    pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
}

/// The tool name recorded in the managed-by label
pub const MANAGER_NAME: &str = "sa-kubeconfig";

/// RBAC settings for the provisioned account
pub mod rbac {
    pub const API_GROUP: &str = "rbac.authorization.k8s.io";
    /// ClusterRole granted to the service account, cluster-wide or per namespace
    pub const ADMIN_CLUSTER_ROLE: &str = "cluster-admin";
}

/// Service account token secret layout
pub mod secret {
    pub const TOKEN_TYPE: &str = "kubernetes.io/service-account-token";
    pub const TOKEN_KEY: &str = "token";
    pub const CA_KEY: &str = "ca.crt";
    pub const NAME_SUFFIX: &str = "-token";
}

/// Secret polling configuration
pub mod poll {
    /// Number of reads before giving up on the token being populated
    pub const MAX_ATTEMPTS: u32 = 10;
    /// Initial polling interval in milliseconds
    pub const INITIAL_INTERVAL_MILLIS: u64 = 250;
    /// Maximum polling interval in milliseconds (exponential backoff cap)
    pub const MAX_INTERVAL_MILLIS: u64 = 2_000;
}

/// Client and pipeline timeouts
pub mod timeouts {
    pub const CONNECT_SECS: u64 = 10;
    pub const READ_SECS: u64 = 30;
    /// Overall deadline for one provisioning run
    pub const PIPELINE_SECS: u64 = 120;
}
