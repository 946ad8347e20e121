// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for client creation, service accounts, role bindings and token secrets.

pub mod client;
pub mod rbac;
pub mod secrets;
pub mod service_accounts;

pub use client::{connect, verify_reachable, Connection};
pub use rbac::ensure_admin_bindings;
pub use secrets::{ensure_token_secret, wait_for_token, SecretRetry, TokenData};
pub use service_accounts::{create_service_account, ensure_service_account};
