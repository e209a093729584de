//! # Initcheck
//!
//! Initcheck is a short-lived validation binary run as a Helm test against a
//! deployed release. It verifies that every Kubernetes init Job belonging to
//! the release ran to completion before the release is considered healthy.
//!
//! ## Architecture
//!
//! ### Kubernetes Module
//! ```ignore
//! pub mod k8s;
//! ```
//! Manages all Kubernetes interactions:
//! - Client creation (in-cluster or kubeconfig)
//! - Namespace and pod identity discovery
//! - Read-only Job listing and refreshing
//!
//! ### Checker Module
//! ```ignore
//! pub mod checker;
//! ```
//! The core polling loop:
//! - Job phase assessment from status conditions
//! - Per-job retry budgets
//! - Serializable check reports
//!
//! ### CLI Module
//! ```ignore
//! pub mod cli;
//! ```
//! Provides command-line interface functionality:
//! - Command parsing
//! - The `check` and `status` commands
//!
//! ## Operation Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Initcheck
//!     participant K8s
//!
//!     Initcheck->>K8s: Get own Pod
//!     K8s-->>Initcheck: Pod labels
//!
//!     Initcheck->>K8s: List Jobs (label selector)
//!     K8s-->>Initcheck: Jobs
//!
//!     loop Until all jobs settle
//!         Initcheck->>Initcheck: Assess job conditions
//!         Initcheck->>K8s: Refresh pending Jobs
//!         K8s-->>Initcheck: Updated Jobs
//!     end
//!
//!     Initcheck-->>Initcheck: Exit 0 / 1
//! ```
//!
//! ## Configuration
//!
//! The checker is configured through environment variables or a configuration file:
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [check]
//! label_key = "app"
//! retries = 24
//! retry_delay = 5.0
//! request_timeout = 10.0
//! ```

pub mod checker;
pub mod cli;
pub mod k8s;
