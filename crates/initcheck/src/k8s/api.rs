/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Kubernetes API Module
//!
//! This module provides functionality for interacting with the Kubernetes API server.
//!
//! ## Key Components
//!
//! ### Client Creation
//! ```ignore
//! pub async fn create_k8s_client(kubeconfig_path: Option<&str>, request_timeout: Duration) -> Result<K8sClient, Error>
//! ```
//! Creates a Kubernetes client using either in-cluster config or a provided kubeconfig path.
//!
//! ### Identity Discovery
//! The checker runs inside the pod whose release it validates. Its namespace
//! comes from the `NAMESPACE` environment variable or the mounted
//! serviceaccount namespace file; its pod name comes from `POD_NAME`,
//! `HOSTNAME`, or `/etc/hostname`.
//!
//! ### Job Access
//! Jobs are listed with a label selector and refreshed individually between
//! polling rounds. All access is read-only.
//!
//! ## Error Handling
//!
//! Transient API errors (throttling, server unavailability, timeouts) are
//! retried with exponential backoff; all other errors propagate to the caller.

use backoff::ExponentialBackoffBuilder;
use initcheck_utils::logging::prelude::*;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use kube::api::ListParams;
use kube::Api;
use kube::Client as K8sClient;
use kube::Error as KubeError;
use std::time::Duration;

/// Mounted serviceaccount file holding the pod's own namespace
const NAMESPACE_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Retry configuration for Kubernetes operations
struct RetryConfig {
    max_elapsed_time: Duration,
    initial_interval: Duration,
    max_interval: Duration,
    multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_elapsed_time: Duration::from_secs(60),
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(15),
            multiplier: 2.0,
        }
    }
}

/// Determines if a Kubernetes error is retryable
fn is_retryable_error(error: &KubeError) -> bool {
    match error {
        KubeError::Api(api_err) => {
            matches!(api_err.code, 429 | 500 | 503 | 504)
                || matches!(
                    api_err.reason.as_str(),
                    "ServiceUnavailable" | "InternalError" | "Timeout"
                )
        }
        _ => false,
    }
}

/// Executes a Kubernetes operation with retries
async fn with_retries<F, Fut, T>(
    operation: F,
    config: RetryConfig,
) -> Result<T, Box<dyn std::error::Error>>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, KubeError>>,
{
    let backoff = ExponentialBackoffBuilder::new()
        .with_initial_interval(config.initial_interval)
        .with_max_interval(config.max_interval)
        .with_multiplier(config.multiplier)
        .with_max_elapsed_time(Some(config.max_elapsed_time))
        .build();

    let operation_with_backoff = || async {
        match operation().await {
            Ok(value) => Ok(value),
            Err(error) => {
                if is_retryable_error(&error) {
                    warn!("Retryable error encountered: {}", error);
                    Err(backoff::Error::Transient {
                        err: error,
                        retry_after: None,
                    })
                } else {
                    error!("Non-retryable error encountered: {}", error);
                    Err(backoff::Error::Permanent(error))
                }
            }
        }
    };

    backoff::future::retry(backoff, operation_with_backoff)
        .await
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
}

/// Creates a Kubernetes client from either in-cluster config or a kubeconfig path.
///
/// # Arguments
/// * `kubeconfig_path` - Optional path to a kubeconfig file; in-cluster config is used when absent
/// * `request_timeout` - Timeout applied to individual API requests
///
/// # Returns
/// * `Result<K8sClient, Box<dyn std::error::Error>>` - Connected client or error with message
pub async fn create_k8s_client(
    kubeconfig_path: Option<&str>,
    request_timeout: Duration,
) -> Result<K8sClient, Box<dyn std::error::Error>> {
    // Set KUBECONFIG environment variable if path is provided
    if let Some(path) = kubeconfig_path {
        std::env::set_var("KUBECONFIG", path);
    }

    let mut config = kube::Config::infer()
        .await
        .map_err(|e| format!("Failed to infer Kubernetes config: {}", e))?;
    config.connect_timeout = Some(request_timeout);
    config.read_timeout = Some(request_timeout);

    let client = K8sClient::try_from(config)
        .map_err(|e| format!("Failed to create Kubernetes client: {}", e))?;

    // Verify cluster connectivity; a test pod's serviceaccount cannot list
    // namespaces, so the version endpoint is used instead
    let version = client
        .apiserver_version()
        .await
        .map_err(|e| format!("Failed to connect to Kubernetes cluster: {}", e))?;
    debug!("Connected to Kubernetes API server {}", version.git_version);

    Ok(client)
}

/// Resolves the namespace the checker operates in.
///
/// Resolution order: explicit override, `NAMESPACE` environment variable,
/// then the mounted serviceaccount namespace file.
pub fn current_namespace(namespace_override: Option<&str>) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(ns) = namespace_override {
        return Ok(ns.to_string());
    }
    if let Ok(ns) = std::env::var("NAMESPACE") {
        return Ok(ns);
    }

    let contents = std::fs::read_to_string(NAMESPACE_FILE)
        .map_err(|e| format!("Failed to read namespace from {}: {}", NAMESPACE_FILE, e))?;
    Ok(contents.trim().to_string())
}

/// Resolves the name of the pod the checker runs in.
///
/// Resolution order: explicit override, `POD_NAME`, `HOSTNAME`, then
/// `/etc/hostname`. In a pod the hostname is the pod name.
pub fn current_pod_name(pod_name_override: Option<&str>) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(name) = pod_name_override {
        return Ok(name.to_string());
    }
    if let Ok(name) = std::env::var("POD_NAME") {
        return Ok(name);
    }
    if let Ok(name) = std::env::var("HOSTNAME") {
        return Ok(name);
    }

    let contents = std::fs::read_to_string("/etc/hostname")
        .map_err(|e| format!("Failed to determine pod name: {}", e))?;
    Ok(contents.trim().to_string())
}

/// Fetches a pod by name from the given namespace.
pub async fn get_pod(
    client: &K8sClient,
    namespace: &str,
    name: &str,
) -> Result<Pod, Box<dyn std::error::Error>> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let name = name.to_string();
    with_retries(
        move || {
            let api = api.clone();
            let name = name.clone();
            async move { api.get(&name).await }
        },
        RetryConfig::default(),
    )
    .await
}

/// Builds the job label selector from the checker's own pod.
///
/// The pod is expected to carry the configured label key (by default `app`,
/// set by the chart on the test pod and its init jobs alike).
pub fn selector_for_pod(pod: &Pod, label_key: &str) -> Result<String, Box<dyn std::error::Error>> {
    let pod_name = pod.metadata.name.as_deref().unwrap_or("<unnamed>");
    let value = pod
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(label_key))
        .ok_or_else(|| format!("Pod {} has no {:?} label", pod_name, label_key))?;

    Ok(format!("{}={}", label_key, value))
}

/// Lists the jobs in a namespace matching a label selector.
pub async fn list_jobs(
    client: &K8sClient,
    namespace: &str,
    selector: &str,
) -> Result<Vec<Job>, Box<dyn std::error::Error>> {
    let api: Api<Job> = Api::namespaced(client.clone(), namespace);
    let lp = ListParams::default().labels(selector);
    let jobs = with_retries(
        move || {
            let api = api.clone();
            let lp = lp.clone();
            async move { api.list(&lp).await }
        },
        RetryConfig::default(),
    )
    .await?;

    Ok(jobs.items)
}

/// Fetches the current state of a single job.
pub async fn get_job(
    client: &K8sClient,
    namespace: &str,
    name: &str,
) -> Result<Job, Box<dyn std::error::Error>> {
    let api: Api<Job> = Api::namespaced(client.clone(), namespace);
    let name = name.to_string();
    with_retries(
        move || {
            let api = api.clone();
            let name = name.clone();
            async move { api.get(&name).await }
        },
        RetryConfig::default(),
    )
    .await
}
