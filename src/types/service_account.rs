// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::secret::NAME_SUFFIX;
use crate::error::{ProvisionError, Result};

/// The service account to provision and the namespaces it is granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccount {
    pub namespace: String,
    pub name: String,
    /// Namespaces covered by role bindings. `None` means a cluster-wide
    /// binding; any supplied list, even one naming only `namespace`, keeps
    /// the grant namespaced.
    pub target_namespaces: Option<Vec<String>>,
}

impl ServiceAccount {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            target_namespaces: None,
        }
    }

    /// Set the target namespaces from a comma-separated list. An empty
    /// string leaves the grant cluster-wide.
    pub fn with_target_namespaces(mut self, csv: &str) -> Self {
        self.target_namespaces = (!csv.is_empty()).then(|| parse_namespace_list(csv));
        self
    }

    /// Check the names are usable before touching the cluster
    pub fn validate(&self) -> Result<()> {
        if !is_dns_label(&self.namespace) {
            return Err(ProvisionError::InvalidInput(format!(
                "namespace '{}' is not a valid RFC 1123 label",
                self.namespace
            )));
        }
        if !is_dns_subdomain(&self.name) {
            return Err(ProvisionError::InvalidInput(format!(
                "service account name '{}' is not a valid RFC 1123 subdomain",
                self.name
            )));
        }
        let Some(targets) = &self.target_namespaces else {
            return Ok(());
        };
        if targets.is_empty() {
            return Err(ProvisionError::InvalidInput(
                "target namespace list has no entries".to_string(),
            ));
        }
        if let Some(bad) = targets.iter().find(|ns| !is_dns_label(ns)) {
            return Err(ProvisionError::InvalidInput(format!(
                "target namespace '{}' is not a valid RFC 1123 label",
                bad
            )));
        }
        Ok(())
    }

    pub fn is_cluster_wide(&self) -> bool {
        self.target_namespaces.is_none()
    }

    /// All namespaces a namespaced grant must cover, home namespace first
    pub fn bound_namespaces(&self) -> Vec<&str> {
        let home = self.namespace.as_str();
        std::iter::once(home)
            .chain(
                self.target_namespaces
                    .iter()
                    .flatten()
                    .map(String::as_str)
                    .filter(|ns| *ns != home),
            )
            .collect()
    }

    pub fn token_secret_name(&self) -> String {
        format!("{}{}", self.name, NAME_SUFFIX)
    }

    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Split a comma-separated namespace list, dropping blanks and duplicates
fn parse_namespace_list(csv: &str) -> Vec<String> {
    let mut namespaces: Vec<String> = Vec::new();
    for ns in csv.split(',').map(str::trim) {
        if ns.is_empty() || namespaces.iter().any(|n| n == ns) {
            continue;
        }
        namespaces.push(ns.to_string());
    }
    namespaces
}

fn is_dns_label(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 63
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !value.starts_with('-')
        && !value.ends_with('-')
}

fn is_dns_subdomain(value: &str) -> bool {
    !value.is_empty() && value.len() <= 253 && value.split('.').all(is_dns_label)
}
