// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod cluster;
pub mod config;
pub mod constants;
pub mod error;
pub mod kubeconfig;
pub mod kubernetes;
pub mod provisioner;
pub mod types;

#[cfg(test)]
pub mod test_utils;

pub use cluster::Cluster;
pub use config::ProvisionConfig;
pub use error::{ProvisionError, StageError};
pub use kubeconfig::KubeconfigAssembler;
pub use provisioner::{ProvisionOutcome, Provisioner, Stage};
