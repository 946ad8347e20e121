// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::fmt;

/// A named context within a kubeconfig file.
///
/// An empty name stands for the kubeconfig's `current-context` until the
/// cluster has been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ClusterContext {
    name: String,
}

impl ClusterContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this refers to the kubeconfig's current context
    pub fn is_current(&self) -> bool {
        self.name.is_empty()
    }
}

impl fmt::Display for ClusterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_current() {
            f.write_str("<current-context>")
        } else {
            f.write_str(&self.name)
        }
    }
}
