// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Plain data carried through the provisioning pipeline.

pub mod context;
pub mod credential;
pub mod service_account;

pub use context::ClusterContext;
pub use credential::ProvisionedCredential;
pub use service_account::ServiceAccount;

/// Human-readable result of a cluster operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostic {
    pub summary: String,
    /// Conditions left untouched that the operator should know about
    pub warnings: Vec<String>,
}

impl Diagnostic {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            warnings: Vec::new(),
        }
    }
}
