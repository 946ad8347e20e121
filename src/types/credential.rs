// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::fmt;

/// Token material read back from a service account token secret.
///
/// Held in memory only; it is persisted solely inside the generated kubeconfig.
#[derive(Clone, PartialEq, Eq)]
pub struct ProvisionedCredential {
    /// `namespace/name` of the owning service account
    pub service_account: String,
    pub token: Vec<u8>,
    /// PEM encoded cluster CA bundle
    pub ca_certificate: Vec<u8>,
    pub api_server_url: String,
}

impl fmt::Debug for ProvisionedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionedCredential")
            .field("service_account", &self.service_account)
            .field("token", &format_args!("<{} bytes redacted>", self.token.len()))
            .field("ca_certificate", &format_args!("<{} bytes>", self.ca_certificate.len()))
            .field("api_server_url", &self.api_server_url)
            .finish()
    }
}
