// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses.

use http::{Request, Response};
use kube::client::Body;
use kube::Client;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

type Route = (String, String);

/// A mock HTTP service that returns predefined responses based on request paths.
///
/// Several responses registered for the same route are served in order; the
/// last one keeps being returned once the queue is drained. Every request is
/// recorded so tests can assert on what the code under test called.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<Route, VecDeque<(u16, String)>>>>,
    requests: Arc<Mutex<Vec<Route>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.push("GET", path, status, body)
    }

    /// Add a response for POST requests matching the exact path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.push("POST", path, status, body)
    }

    fn push(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back((status, body.to_string()));
        self
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    /// All requests received so far, as (method, path)
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests received for a method and exact path
    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, p)| m == method && p == path)
            .count()
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(&(method.to_string(), path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        self.requests
            .lock()
            .unwrap()
            .push((method.clone(), path.clone()));
        let response = self.find_response(&method, &path);

        Box::pin(async move {
            let (status, body) = response.unwrap_or_else(|| (404, not_found_json("resource", &path)));
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// API paths used by the provisioning calls
pub mod paths {
    pub const VERSION: &str = "/version";
    const RBAC: &str = "/apis/rbac.authorization.k8s.io/v1";

    pub fn service_accounts(namespace: &str) -> String {
        format!("/api/v1/namespaces/{}/serviceaccounts", namespace)
    }

    pub fn service_account(namespace: &str, name: &str) -> String {
        format!("{}/{}", service_accounts(namespace), name)
    }

    pub fn secrets(namespace: &str) -> String {
        format!("/api/v1/namespaces/{}/secrets", namespace)
    }

    pub fn secret(namespace: &str, name: &str) -> String {
        format!("{}/{}", secrets(namespace), name)
    }

    pub fn cluster_role_bindings() -> String {
        format!("{}/clusterrolebindings", RBAC)
    }

    pub fn cluster_role_binding(name: &str) -> String {
        format!("{}/{}", cluster_role_bindings(), name)
    }

    pub fn role_bindings(namespace: &str) -> String {
        format!("{}/namespaces/{}/rolebindings", RBAC, namespace)
    }

    pub fn role_binding(namespace: &str, name: &str) -> String {
        format!("{}/{}", role_bindings(namespace), name)
    }
}

/// Create a mock API server version response
pub fn version_json() -> String {
    serde_json::json!({
        "major": "1",
        "minor": "30",
        "gitVersion": "v1.30.2",
        "gitCommit": "39683505b630ff2121012f3c5b16215a1449d5ed",
        "gitTreeState": "clean",
        "buildDate": "2024-06-11T20:21:00Z",
        "goVersion": "go1.22.4",
        "compiler": "gc",
        "platform": "linux/amd64"
    })
    .to_string()
}

/// Create a mock ServiceAccount JSON response
pub fn service_account_json(namespace: &str, name: &str) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "ServiceAccount",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": "test-uid"
        }
    })
    .to_string()
}

/// Create a mock ClusterRoleBinding JSON response
pub fn cluster_role_binding_json(name: &str, role: &str, sa_namespace: &str, sa_name: &str) -> String {
    serde_json::json!({
        "apiVersion": "rbac.authorization.k8s.io/v1",
        "kind": "ClusterRoleBinding",
        "metadata": { "name": name },
        "roleRef": {
            "apiGroup": "rbac.authorization.k8s.io",
            "kind": "ClusterRole",
            "name": role
        },
        "subjects": [{
            "kind": "ServiceAccount",
            "name": sa_name,
            "namespace": sa_namespace
        }]
    })
    .to_string()
}

/// Create a mock RoleBinding JSON response
pub fn role_binding_json(
    namespace: &str,
    name: &str,
    role: &str,
    sa_namespace: &str,
    sa_name: &str,
) -> String {
    serde_json::json!({
        "apiVersion": "rbac.authorization.k8s.io/v1",
        "kind": "RoleBinding",
        "metadata": { "name": name, "namespace": namespace },
        "roleRef": {
            "apiGroup": "rbac.authorization.k8s.io",
            "kind": "ClusterRole",
            "name": role
        },
        "subjects": [{
            "kind": "ServiceAccount",
            "name": sa_name,
            "namespace": sa_namespace
        }]
    })
    .to_string()
}

/// Create a mock token Secret; `data` values are raw and get base64 encoded
pub fn token_secret_json(
    namespace: &str,
    name: &str,
    sa_name: &str,
    data: &[(&str, &[u8])],
) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine};

    let data: serde_json::Map<String, serde_json::Value> = data
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(STANDARD.encode(v))))
        .collect();

    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "annotations": {
                "kubernetes.io/service-account.name": sa_name
            }
        },
        "type": "kubernetes.io/service-account-token",
        "data": data
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    status_json(404, "NotFound", &format!("{} \"{}\" not found", resource, name))
}

/// Create a 403 forbidden response
pub fn forbidden_json(message: &str) -> String {
    status_json(403, "Forbidden", message)
}

/// Create a 409 already exists response
pub fn conflict_json(resource: &str, name: &str) -> String {
    status_json(409, "AlreadyExists", &format!("{} \"{}\" already exists", resource, name))
}

fn status_json(code: u16, reason: &str, message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}
