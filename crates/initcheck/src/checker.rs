/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Job Completion Checker Module
//!
//! Assesses the status of Kubernetes init jobs and polls until every job has
//! either completed successfully or exhausted its retry budget. A job counts
//! as succeeded when it carries a `Complete` condition with status `True` and
//! at least one succeeded pod; a `Failed` condition (or completion without
//! successes) is terminal and consumes the whole budget at once.

use crate::k8s;
use chrono::{DateTime, Utc};
use initcheck_utils::logging::prelude::*;
use k8s_openapi::api::batch::v1::Job;
use kube::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

/// Phase of a job as derived from its status conditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPhase {
    /// `Complete` condition is `True` and at least one pod succeeded
    Succeeded,
    /// `Failed` condition is `True`, or the job completed without successes
    Failed,
    /// No terminal condition yet
    Running,
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match self {
            JobPhase::Succeeded => "succeeded",
            JobPhase::Failed => "failed",
            JobPhase::Running => "running",
        };
        write!(f, "{}", phase)
    }
}

/// A job that did not complete successfully
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobFailure {
    /// Name of the job
    pub name: String,
    /// Human-readable failure reason
    pub reason: String,
}

/// Outcome of a full check run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    /// Namespace the jobs were checked in
    pub namespace: String,
    /// Label selector used to discover the jobs
    pub selector: String,
    /// Names of jobs that completed successfully
    pub succeeded: Vec<String>,
    /// Jobs that failed or timed out
    pub failed: Vec<JobFailure>,
    /// Number of polling rounds performed
    pub rounds: u32,
    /// When the run finished
    pub checked_at: DateTime<Utc>,
}

impl CheckReport {
    fn new(namespace: &str, selector: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            selector: selector.to_string(),
            succeeded: Vec::new(),
            failed: Vec::new(),
            rounds: 0,
            checked_at: Utc::now(),
        }
    }

    /// Whether every checked job completed successfully
    pub fn ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Point-in-time status of a single job, for the `status` command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    /// Name of the job
    pub name: String,
    /// Current phase
    pub phase: JobPhase,
    /// Number of succeeded pods
    pub succeeded: i32,
    /// Failure reason, when the phase is failed
    pub reason: Option<String>,
}

/// Classifies a job from its status conditions.
pub fn assess(job: &Job) -> JobPhase {
    if has_condition(job, "Failed") {
        return JobPhase::Failed;
    }
    if has_condition(job, "Complete") {
        if succeeded_count(job) > 0 {
            return JobPhase::Succeeded;
        }
        // Complete without successes should not happen, but treat it as a
        // failure rather than waiting on a job that will never progress
        return JobPhase::Failed;
    }
    JobPhase::Running
}

/// Extracts a failure reason from a job's `Failed` condition.
pub fn failure_message(job: &Job) -> Option<String> {
    let conditions = job.status.as_ref()?.conditions.as_ref()?;
    conditions
        .iter()
        .find(|c| c.type_ == "Failed" && c.status == "True")
        .map(|c| match (&c.reason, &c.message) {
            (Some(reason), Some(message)) => format!("{}: {}", reason, message),
            (Some(reason), None) => reason.clone(),
            (None, Some(message)) => message.clone(),
            (None, None) => "job reported a Failed condition".to_string(),
        })
}

/// Builds point-in-time summaries for a list of jobs.
pub fn snapshot(jobs: &[Job]) -> Vec<JobSummary> {
    jobs.iter()
        .filter_map(|job| {
            let name = match &job.metadata.name {
                Some(name) => name.clone(),
                None => {
                    warn!("Skipping job without a name");
                    return None;
                }
            };
            let phase = assess(job);
            let reason = match phase {
                JobPhase::Failed => {
                    Some(failure_message(job).unwrap_or_else(|| {
                        "job completed without any succeeded pods".to_string()
                    }))
                }
                _ => None,
            };
            Some(JobSummary {
                name,
                phase,
                succeeded: succeeded_count(job),
                reason,
            })
        })
        .collect()
}

fn has_condition(job: &Job, type_: &str) -> bool {
    job.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == type_ && c.status == "True")
        })
        .unwrap_or(false)
}

fn succeeded_count(job: &Job) -> i32 {
    job.status.as_ref().and_then(|s| s.succeeded).unwrap_or(0)
}

/// Polls jobs until every one has succeeded or exhausted its retry budget
pub struct Checker {
    client: Client,
    namespace: String,
    retries: u32,
    retry_delay: Duration,
}

impl Checker {
    /// Creates a new Checker instance
    pub fn new(client: Client, namespace: &str, retries: u32, retry_delay: Duration) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
            retries,
            retry_delay,
        }
    }

    /// Runs the check loop over an initial list of jobs.
    ///
    /// Each job carries an independent retry budget. Jobs still running after
    /// a round lose one retry, are refreshed from the API after the delay,
    /// and are re-assessed; terminal jobs are settled immediately.
    pub async fn run(
        &self,
        jobs: Vec<Job>,
        selector: &str,
    ) -> Result<CheckReport, Box<dyn std::error::Error>> {
        let mut report = CheckReport::new(&self.namespace, selector);

        let mut pending: Vec<(Job, u32)> = jobs
            .into_iter()
            .filter_map(|job| {
                if job.metadata.name.is_none() {
                    warn!("Skipping job without a name");
                    return None;
                }
                Some((job, self.retries))
            })
            .collect();

        if pending.is_empty() {
            warn!(
                "No jobs matched selector {:?} in namespace {}",
                selector, self.namespace
            );
            report.checked_at = Utc::now();
            return Ok(report);
        }

        loop {
            info!("Checking {} jobs...", pending.len());
            report.rounds += 1;

            let remaining = settle_round(pending, &self.namespace, self.retries, &mut report);
            if remaining.is_empty() {
                break;
            }

            info!("Still waiting on {} jobs to finish...", remaining.len());
            sleep(self.retry_delay).await;

            let mut refreshed = Vec::with_capacity(remaining.len());
            for (job, retries_left) in remaining {
                let name = job.metadata.name.as_deref().unwrap_or_default().to_string();
                let job = k8s::api::get_job(&self.client, &self.namespace, &name)
                    .await
                    .map_err(|e| {
                        format!("Failed to refresh job {}/{}: {}", self.namespace, name, e)
                    })?;
                refreshed.push((job, retries_left));
            }
            pending = refreshed;
        }

        report.checked_at = Utc::now();
        Ok(report)
    }
}

/// Assesses every pending job once, settling terminal and exhausted jobs
/// into the report and returning the jobs still worth waiting on.
fn settle_round(
    pending: Vec<(Job, u32)>,
    namespace: &str,
    budget: u32,
    report: &mut CheckReport,
) -> Vec<(Job, u32)> {
    let mut remaining = Vec::new();

    for (job, retries_left) in pending {
        let name = job.metadata.name.clone().unwrap_or_default();
        match assess(&job) {
            JobPhase::Succeeded => {
                info!("Job {} succeeded", name);
                report.succeeded.push(name);
            }
            JobPhase::Failed => {
                let reason = failure_message(&job).unwrap_or_else(|| {
                    "job completed without any succeeded pods".to_string()
                });
                error!("Job {} failed: {}", name, reason);
                report.failed.push(JobFailure { name, reason });
            }
            JobPhase::Running => {
                if retries_left == 0 {
                    error!("Job {}/{} did not finish in time", namespace, name);
                    report.failed.push(JobFailure {
                        name,
                        reason: format!("still running after {} checks", budget + 1),
                    });
                } else {
                    debug!(
                        "Job {}/{} is not complete yet ({} attempts remaining)",
                        namespace, name, retries_left
                    );
                    remaining.push((job, retries_left - 1));
                }
            }
        }
    }

    remaining
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::batch::v1::{JobCondition, JobStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn job(name: &str, conditions: Vec<JobCondition>, succeeded: Option<i32>) -> Job {
        Job {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            status: Some(JobStatus {
                conditions: Some(conditions),
                succeeded,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn condition(type_: &str, status: &str) -> JobCondition {
        JobCondition {
            type_: type_.to_string(),
            status: status.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_assess_complete_job_succeeds() {
        let job = job("mysql-init", vec![condition("Complete", "True")], Some(1));
        assert_eq!(assess(&job), JobPhase::Succeeded);
    }

    #[test]
    fn test_assess_failed_condition_is_terminal() {
        let job = job("mysql-init", vec![condition("Failed", "True")], None);
        assert_eq!(assess(&job), JobPhase::Failed);
    }

    #[test]
    fn test_assess_complete_without_successes_fails() {
        let job = job("mysql-init", vec![condition("Complete", "True")], Some(0));
        assert_eq!(assess(&job), JobPhase::Failed);

        let job_no_succeeded = self::job("mysql-init", vec![condition("Complete", "True")], None);
        assert_eq!(assess(&job_no_succeeded), JobPhase::Failed);
    }

    #[test]
    fn test_assess_no_conditions_is_running() {
        let job = job("mysql-init", vec![], None);
        assert_eq!(assess(&job), JobPhase::Running);

        // A job with no status block at all is also still running
        let bare = Job {
            metadata: ObjectMeta {
                name: Some("mysql-init".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(assess(&bare), JobPhase::Running);
    }

    #[test]
    fn test_assess_false_conditions_do_not_count() {
        let job = job(
            "mysql-init",
            vec![condition("Complete", "False"), condition("Failed", "Unknown")],
            None,
        );
        assert_eq!(assess(&job), JobPhase::Running);
    }

    #[test]
    fn test_failure_message_prefers_reason_and_message() {
        let mut cond = condition("Failed", "True");
        cond.reason = Some("BackoffLimitExceeded".to_string());
        cond.message = Some("Job has reached the specified backoff limit".to_string());
        let job = job("mysql-init", vec![cond], None);

        assert_eq!(
            failure_message(&job).unwrap(),
            "BackoffLimitExceeded: Job has reached the specified backoff limit"
        );
    }

    #[test]
    fn test_failure_message_absent_for_healthy_job() {
        let job = job("mysql-init", vec![condition("Complete", "True")], Some(1));
        assert!(failure_message(&job).is_none());
    }

    #[test]
    fn test_settle_round_settles_terminal_jobs() {
        let mut report = CheckReport::new("monitoring", "app=monasca");
        let pending = vec![
            (job("ok-init", vec![condition("Complete", "True")], Some(1)), 5),
            (job("bad-init", vec![condition("Failed", "True")], None), 5),
            (job("slow-init", vec![], None), 5),
        ];

        let remaining = settle_round(pending, "monitoring", 5, &mut report);

        assert_eq!(report.succeeded, vec!["ok-init".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "bad-init");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].0.metadata.name.as_deref(), Some("slow-init"));
        assert_eq!(remaining[0].1, 4);
    }

    #[test]
    fn test_settle_round_exhausted_budget_is_a_failure() {
        let mut report = CheckReport::new("monitoring", "app=monasca");
        let pending = vec![(job("slow-init", vec![], None), 0)];

        let remaining = settle_round(pending, "monitoring", 24, &mut report);

        assert!(remaining.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "slow-init");
        assert!(report.failed[0].reason.contains("still running"));
        assert!(!report.ok());
    }

    #[test]
    fn test_report_ok_with_no_failures() {
        let mut report = CheckReport::new("monitoring", "app=monasca");
        assert!(report.ok());

        report.succeeded.push("ok-init".to_string());
        assert!(report.ok());

        report.failed.push(JobFailure {
            name: "bad-init".to_string(),
            reason: "boom".to_string(),
        });
        assert!(!report.ok());
    }

    #[test]
    fn test_snapshot_reports_phases() {
        let jobs = vec![
            job("ok-init", vec![condition("Complete", "True")], Some(1)),
            job("bad-init", vec![condition("Failed", "True")], None),
            job("slow-init", vec![], None),
        ];

        let summaries = snapshot(&jobs);

        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].phase, JobPhase::Succeeded);
        assert_eq!(summaries[0].succeeded, 1);
        assert_eq!(summaries[1].phase, JobPhase::Failed);
        assert!(summaries[1].reason.is_some());
        assert_eq!(summaries[2].phase, JobPhase::Running);
        assert!(summaries[2].reason.is_none());
    }

    #[test]
    fn test_snapshot_skips_unnamed_jobs() {
        let unnamed = Job {
            status: Some(JobStatus {
                conditions: Some(vec![condition("Complete", "True")]),
                succeeded: Some(1),
                ..Default::default()
            }),
            ..Default::default()
        };

        let summaries = snapshot(&[unnamed]);
        assert!(summaries.is_empty());
    }

    #[test]
    fn test_report_serialization() {
        let report = CheckReport::new("monitoring", "app=monasca");
        let json = serde_json::to_string(&report).unwrap();
        let deserialized: CheckReport = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.namespace, "monitoring");
        assert_eq!(deserialized.selector, "app=monasca");
        assert!(deserialized.succeeded.is_empty());
        assert_eq!(deserialized.rounds, 0);
    }
}
