//! # Testsuite Runner
//!
//! Launches the Kuadrant testsuite container as a pod on a target
//! OpenShift cluster and reports the result.
//!
//! ## Overview
//!
//! A single run:
//!
//! 1. **Assembles the environment** - flattens Dynaconf-style
//!    `key.subkey=value` overrides into `KUADRANT_*` environment
//!    variables and merges in the fixed run parameters
//! 2. **Launches the pod** - the testsuite image with the assembled
//!    environment, injected credential secrets, and fixed resource limits
//! 3. **Follows the run** - streams the container's log output and waits
//!    for a terminal phase
//! 4. **Cleans up and reports** - deletes the pod and exits non-zero when
//!    the testsuite did not succeed
//!
//! Inside the container, `oc login` authenticates against the target
//! cluster with the injected credentials, then the selected make target
//! runs, falling back to the reporting target on failure.
//!
//! ## Usage
//!
//! See `testsuite-runner --help` for all run parameters.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use testsuite_runner::cli::RunArgs;
use testsuite_runner::runner;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "testsuite_runner=info".into()),
        )
        .init();

    let args = RunArgs::parse();

    info!("Starting testsuite runner");

    runner::run(&args).await
}
