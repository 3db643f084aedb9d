//! # Runner
//!
//! Orchestrates a single testsuite run:
//!
//! 1. Assemble the environment mappings from the run parameters
//! 2. Build one pod manifest per mapping (currently always one)
//! 3. Launch each pod and wait for it to finish
//! 4. Report the outcome
//!
//! Everything here is straight-line; scheduling, retries and credential
//! management belong to the cluster and to whoever invokes the runner.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use kube::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::RunArgs;
use crate::constants::{DEFAULT_NAMESPACE, DYNACONF_ENV_PREFIX};
use crate::pod::{self, PodOutcome};
use crate::settings::{self, SettingsError};

/// Machine-readable summary of one finished pod, emitted as a JSON log
/// line so downstream tooling can scrape results out of the run log
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub pod_name: String,
    pub outcome: String,
    pub duration_secs: u64,
}

/// Assemble the environment mappings for a run.
///
/// Returns one mapping per pod to launch - currently always exactly one.
/// The fixed keys are written after the user-supplied overrides, so the
/// project passed on the command line wins over a conflicting
/// `--set cluster.project=...`.
pub fn prepare_environments(
    args: &RunArgs,
    run_id: &str,
) -> Result<Vec<BTreeMap<String, String>>, SettingsError> {
    let mut env = settings::dot_to_env(DYNACONF_ENV_PREFIX, &args.dynaconf_settings)?;

    env.insert("TARGET_KUBE_API".to_string(), args.kube_api.clone());
    env.insert(
        format!("{DYNACONF_ENV_PREFIX}_cluster__project"),
        args.project.clone(),
    );
    env.insert(
        format!("{DYNACONF_ENV_PREFIX}_control_plane__hub__project"),
        args.project.clone(),
    );
    env.insert("MAKE_TARGET".to_string(), args.make_target.clone());
    // the testsuite emits a junit report file when this is set
    env.insert("junit".to_string(), "true".to_string());
    env.insert("RP_LAUNCH_NAME".to_string(), run_id.to_string());

    Ok(vec![env])
}

/// Run identifier used when none is given on the command line
pub fn default_run_id() -> String {
    format!("run-{}", chrono::Utc::now().format("%Y%m%d-%H%M%S"))
}

/// Namespace the testsuite pod lands in: flag, then `POD_NAMESPACE`,
/// then the default
fn resolve_namespace(args: &RunArgs) -> String {
    args.namespace
        .clone()
        .or_else(|| std::env::var("POD_NAMESPACE").ok())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
}

/// Execute a full testsuite run.
///
/// Fails if any launched pod ends in a phase other than `Succeeded`, if
/// the run times out, or if the cluster cannot be reached. A `--dry-run`
/// prints the rendered manifests and never contacts the cluster.
pub async fn run(args: &RunArgs) -> Result<()> {
    let run_id = args.run_id.clone().unwrap_or_else(default_run_id);
    let namespace = resolve_namespace(args);

    let environments = prepare_environments(args, &run_id)
        .context("failed to assemble the testsuite environment")?;

    if args.dry_run {
        for env in &environments {
            let pod = pod::build_pod(&pod::pod_name(), &namespace, args, env);
            let manifest =
                serde_yaml::to_string(&pod).context("failed to render the pod manifest")?;
            println!("---\n{manifest}");
        }
        return Ok(());
    }

    let client = Client::try_default()
        .await
        .context("failed to create Kubernetes client")?;
    let timeout = Duration::from_secs(args.timeout_secs);

    let mut failed = 0_usize;
    for env in &environments {
        let name = pod::pod_name();
        let pod = pod::build_pod(&name, &namespace, args, env);

        info!("launching testsuite pod {name} in namespace {namespace} (run id {run_id})");
        debug!(
            "assembled environment: {}",
            serde_json::to_string(env).context("failed to serialize the environment")?
        );

        let started = Instant::now();
        let outcome = pod::launch(client.clone(), &namespace, &pod, timeout).await?;

        let report = RunReport {
            run_id: run_id.clone(),
            pod_name: name,
            outcome: outcome.to_string(),
            duration_secs: started.elapsed().as_secs(),
        };
        info!(
            "testsuite run finished: {}",
            serde_json::to_string(&report).context("failed to serialize the run report")?
        );

        if outcome != PodOutcome::Succeeded {
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{failed} testsuite pod(s) did not succeed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_args() -> RunArgs {
        RunArgs {
            image: "quay.io/kuadrant/testsuite:unstable".to_string(),
            kube_api: "https://api.test.example.com:6443".to_string(),
            project: "multi-cluster-gateways".to_string(),
            make_target: "mgc".to_string(),
            dynaconf_settings: Vec::new(),
            run_id: None,
            namespace: None,
            timeout_secs: 60,
            dry_run: false,
        }
    }

    #[test]
    fn test_prepare_environments_single_mapping() {
        let environments = prepare_environments(&test_args(), "run-1").unwrap();

        assert_eq!(environments.len(), 1);
    }

    #[test]
    fn test_prepare_environments_fixed_keys() {
        let env = prepare_environments(&test_args(), "run-1")
            .unwrap()
            .remove(0);

        assert_eq!(
            env.get("TARGET_KUBE_API").map(String::as_str),
            Some("https://api.test.example.com:6443")
        );
        assert_eq!(env.get("MAKE_TARGET").map(String::as_str), Some("mgc"));
        assert_eq!(env.get("junit").map(String::as_str), Some("true"));
        assert_eq!(env.get("RP_LAUNCH_NAME").map(String::as_str), Some("run-1"));
        assert_eq!(
            env.get("KUADRANT_cluster__project").map(String::as_str),
            Some("multi-cluster-gateways")
        );
        assert_eq!(
            env.get("KUADRANT_control_plane__hub__project")
                .map(String::as_str),
            Some("multi-cluster-gateways")
        );
    }

    #[test]
    fn test_prepare_environments_merges_overrides() {
        let mut args = test_args();
        args.dynaconf_settings =
            vec!["control_plane.spokes={local-cluster={}}".to_string()];

        let env = prepare_environments(&args, "run-1").unwrap().remove(0);

        assert_eq!(
            env.get("KUADRANT_control_plane__spokes").map(String::as_str),
            Some("{local-cluster={}}")
        );
    }

    #[test]
    fn test_prepare_environments_project_wins_over_override() {
        let mut args = test_args();
        args.dynaconf_settings = vec!["cluster.project=sneaky-other-project".to_string()];

        let env = prepare_environments(&args, "run-1").unwrap().remove(0);

        assert_eq!(
            env.get("KUADRANT_cluster__project").map(String::as_str),
            Some("multi-cluster-gateways")
        );
    }

    #[test]
    fn test_prepare_environments_propagates_parse_errors() {
        let mut args = test_args();
        args.dynaconf_settings = vec!["not-a-setting".to_string()];

        assert!(prepare_environments(&args, "run-1").is_err());
    }

    #[test]
    fn test_default_run_id_shape() {
        let run_id = default_run_id();

        assert!(run_id.starts_with("run-"));
        assert!(run_id[4..]
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-'));
    }
}
