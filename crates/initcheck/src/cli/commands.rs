/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # CLI Commands Module
//!
//! Implements the command-line interface for the initcheck binary.
//!
//! ## Startup Sequence
//!
//! Both commands share the same setup:
//! 1. Load configuration
//! 2. Initialize logging
//! 3. Create the Kubernetes client and verify connectivity
//! 4. Resolve the namespace and job label selector from the pod's identity
//!
//! `check` then polls the matched jobs until they settle, while `status`
//! prints a one-shot snapshot of their phases.
//!
//! ## Exit Behavior
//!
//! `check` returns an error (nonzero exit) when any job failed or timed out,
//! which is exactly what Helm's test harness keys off. A selector matching no
//! jobs is a success. `status` is an inspection command and always succeeds
//! once the jobs have been listed.

use crate::checker::{self, Checker};
use crate::cli::OutputFormat;
use crate::k8s;
use initcheck_utils::config::Settings;
use initcheck_utils::logging::prelude::*;
use kube::Client;
use std::time::Duration;

/// Runs the full check: poll every matched job until it settles, then fail
/// the process if any job did not complete successfully.
pub async fn check(config_file: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let (config, client, namespace, selector) = setup(config_file).await?;

    let jobs = k8s::api::list_jobs(&client, &namespace, &selector).await?;
    info!("Found {} jobs matching {:?}", jobs.len(), selector);

    let checker = Checker::new(
        client,
        &namespace,
        config.check.retries,
        Duration::from_secs_f64(config.check.retry_delay),
    );
    let report = checker.run(jobs, &selector).await?;

    if report.ok() {
        info!("All jobs completed successfully.");
        return Ok(());
    }

    error!("Failed jobs:");
    for failure in &report.failed {
        error!("  {}/{}: {}", report.namespace, failure.name, failure.reason);
    }
    Err(format!(
        "{} of {} jobs did not complete successfully",
        report.failed.len(),
        report.failed.len() + report.succeeded.len()
    )
    .into())
}

/// Prints a one-shot snapshot of the matched jobs without waiting.
pub async fn status(
    config_file: Option<String>,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let (_config, client, namespace, selector) = setup(config_file).await?;

    let jobs = k8s::api::list_jobs(&client, &namespace, &selector).await?;
    let summaries = checker::snapshot(&jobs);

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&summaries)?),
        OutputFormat::Text => {
            if summaries.is_empty() {
                println!(
                    "No jobs matched selector {:?} in namespace {}",
                    selector, namespace
                );
            }
            for summary in &summaries {
                match &summary.reason {
                    Some(reason) => {
                        println!("{}\t{}\t{}", summary.name, summary.phase, reason)
                    }
                    None => println!("{}\t{}", summary.name, summary.phase),
                }
            }
        }
    }

    Ok(())
}

/// Shared startup: configuration, logging, client, and job selector.
async fn setup(
    config_file: Option<String>,
) -> Result<(Settings, Client, String, String), Box<dyn std::error::Error>> {
    let config = Settings::new(config_file)?;
    initcheck_utils::logging::init_with_format(&config.log.level, &config.log.format)?;
    info!("Starting init job check");

    let client = k8s::api::create_k8s_client(
        config.check.kubeconfig_path.as_deref(),
        Duration::from_secs_f64(config.check.request_timeout),
    )
    .await?;

    let namespace = k8s::api::current_namespace(config.check.namespace.as_deref())?;

    let selector = match &config.check.selector {
        Some(selector) => selector.clone(),
        None => {
            let pod_name = k8s::api::current_pod_name(config.check.pod_name.as_deref())?;
            debug!("Resolving job selector from pod {}/{}", namespace, pod_name);
            let pod = k8s::api::get_pod(&client, &namespace, &pod_name).await?;
            k8s::api::selector_for_pod(&pod, &config.check.label_key)?
        }
    };

    info!(
        "Checking jobs in namespace {} matching {:?}",
        namespace, selector
    );

    Ok((config, client, namespace, selector))
}
