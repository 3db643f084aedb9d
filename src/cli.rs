//! # Command-line interface
//!
//! Run parameters for a testsuite launch. These mirror the knobs a test
//! run actually varies - image, target cluster, project, test type, and
//! Dynaconf-style setting overrides - with deployment conventions as
//! defaults for everything else.
//!
//! ## Usage
//!
//! ```bash
//! # Run the default test type against a cluster
//! testsuite-runner --kube-api https://api.cluster.example.com:6443
//!
//! # Pick a different make target and override nested testsuite settings
//! testsuite-runner --kube-api https://api.cluster.example.com:6443 \
//!     --make-target authorino \
//!     --set 'control_plane.spokes={local-cluster={}}'
//!
//! # Inspect the pod manifest without touching the cluster
//! testsuite-runner --kube-api https://api.cluster.example.com:6443 --dry-run
//! ```

use clap::Parser;

use crate::constants::{
    DEFAULT_MAKE_TARGET, DEFAULT_POD_TIMEOUT_SECS, DEFAULT_PROJECT, DEFAULT_TESTSUITE_IMAGE,
};

/// Version string including the build metadata stamped by build.rs
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BUILD_GIT_HASH"),
    ", built ",
    env!("BUILD_DATETIME"),
    ")"
);

/// Runs the Kuadrant testsuite container as a pod on a target OpenShift cluster
#[derive(Debug, Parser)]
#[command(
    name = "testsuite-runner",
    version,
    long_version = LONG_VERSION,
    about = "Runs the Kuadrant testsuite container as a pod on a target OpenShift cluster",
    after_help = "\
Examples:
  testsuite-runner --kube-api https://api.cluster.example.com:6443
  testsuite-runner --kube-api https://api.cluster.example.com:6443 \\
      --make-target authorino --set 'control_plane.spokes={local-cluster={}}'
"
)]
pub struct RunArgs {
    /// Testsuite image to use
    #[arg(long, default_value = DEFAULT_TESTSUITE_IMAGE)]
    pub image: String,

    /// API URL of the target OpenShift cluster
    #[arg(long)]
    pub kube_api: String,

    /// OpenShift project to use for testing
    #[arg(long, default_value = DEFAULT_PROJECT)]
    pub project: String,

    /// Testsuite make target to invoke - corresponds to test type
    #[arg(long, default_value = DEFAULT_MAKE_TARGET)]
    pub make_target: String,

    /// Additional dynaconf setting, repeatable, in the format key.subkey=value
    #[arg(long = "set", value_name = "KEY.SUBKEY=VALUE")]
    pub dynaconf_settings: Vec<String>,

    /// ReportPortal launch name; generated from the current time when omitted
    #[arg(long)]
    pub run_id: Option<String>,

    /// Namespace to create the testsuite pod in
    /// (defaults to $POD_NAMESPACE, then "default")
    #[arg(long)]
    pub namespace: Option<String>,

    /// How long to wait for the testsuite pod to finish, in seconds
    #[arg(long, default_value_t = DEFAULT_POD_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Print the rendered pod manifest instead of contacting the cluster
    #[arg(long)]
    pub dry_run: bool,
}
