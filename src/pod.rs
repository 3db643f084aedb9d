//! # Pod launcher
//!
//! Builds the testsuite pod spec and drives it to completion on the
//! cluster this runner is pointed at:
//!
//! 1. Create the pod with the assembled environment and injected
//!    credential secrets
//! 2. Wait for it to start and stream its log output
//! 3. Wait for a terminal phase, bounded by the run timeout
//! 4. Delete the pod, however the run ended
//!
//! The container command logs into the target cluster with the injected
//! credentials and invokes the requested make target, falling back to the
//! reporting target when the tests fail. Everything that happens inside
//! the container (authentication, test execution, report upload) is the
//! container's business; only the terminal pod phase and the log output
//! surface here.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use futures::{AsyncBufReadExt, TryStreamExt};
use k8s_openapi::api::core::v1::{
    Container, EnvFromSource, Pod, PodSpec, ResourceRequirements, SecretEnvSource,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, LogParams, PostParams};
use kube::Client;
use kube_runtime::wait::await_condition;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::cli::RunArgs;
use crate::constants::{
    KUBEAPI_CREDS_SECRET, POD_CPU_LIMIT, POD_MEMORY_LIMIT, REPORTPORTAL_CREDS_SECRET,
    TESTSUITE_NAME,
};
use crate::settings::env_var_list;

/// Shell command run inside the testsuite container.
///
/// Credentials come from the injected secrets. The reporting target runs
/// when the test target fails so partial results still reach ReportPortal.
const TESTSUITE_COMMAND: &str = "oc login \"${TARGET_KUBE_API}\" --username \"${KUBE_USER}\" \
     --password \"${KUBE_PASSWORD}\" --insecure-skip-tls-verify=true \
     && make ${MAKE_TARGET} || make reportportal";

/// Terminal result of a testsuite pod
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodOutcome {
    /// The container exited zero - the make target (or the reporting
    /// fallback) completed
    Succeeded,
    /// The container exited non-zero
    Failed,
}

impl std::fmt::Display for PodOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Generate a unique pod name with the testsuite prefix
pub fn pod_name() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{TESTSUITE_NAME}-{}", &suffix[..8])
}

/// Build the testsuite pod manifest.
///
/// The assembled environment rides in as plain name/value pairs; the two
/// credential secrets are injected wholesale via `envFrom` so their
/// contents stay opaque to this runner. Resource limits and the image
/// pull policy are fixed deployment conventions.
pub fn build_pod(
    name: &str,
    namespace: &str,
    args: &RunArgs,
    env: &BTreeMap<String, String>,
) -> Pod {
    let mut limits = BTreeMap::new();
    limits.insert("cpu".to_string(), Quantity(POD_CPU_LIMIT.to_string()));
    limits.insert("memory".to_string(), Quantity(POD_MEMORY_LIMIT.to_string()));

    let env_from = [KUBEAPI_CREDS_SECRET, REPORTPORTAL_CREDS_SECRET]
        .into_iter()
        .map(|secret| EnvFromSource {
            secret_ref: Some(SecretEnvSource {
                name: secret.to_string(),
                optional: None,
            }),
            ..Default::default()
        })
        .collect();

    let container = Container {
        name: TESTSUITE_NAME.to_string(),
        image: Some(args.image.clone()),
        command: Some(vec!["/bin/bash".to_string(), "-c".to_string()]),
        args: Some(vec![TESTSUITE_COMMAND.to_string()]),
        env: Some(env_var_list(env)),
        env_from: Some(env_from),
        resources: Some(ResourceRequirements {
            limits: Some(limits),
            ..Default::default()
        }),
        image_pull_policy: Some("Always".to_string()),
        ..Default::default()
    };

    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), TESTSUITE_NAME.to_string());

    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![container],
            restart_policy: Some("Never".to_string()),
            host_network: Some(false),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Launch a pod and drive it to completion.
///
/// The pod is deleted on the way out regardless of how the run ended -
/// this is the only cleanup policy; retries are left to whoever invoked
/// the runner.
pub async fn launch(
    client: Client,
    namespace: &str,
    pod: &Pod,
    timeout: Duration,
) -> Result<PodOutcome> {
    let pods: Api<Pod> = Api::namespaced(client, namespace);
    let name = pod
        .metadata
        .name
        .clone()
        .ok_or_else(|| anyhow!("pod manifest has no name"))?;

    pods.create(&PostParams::default(), pod)
        .await
        .with_context(|| format!("failed to create pod {name} in namespace {namespace}"))?;

    let outcome = wait_for_completion(&pods, &name, timeout).await;

    delete_pod(&pods, &name).await;

    outcome
}

async fn wait_for_completion(
    pods: &Api<Pod>,
    name: &str,
    timeout: Duration,
) -> Result<PodOutcome> {
    let deadline = Instant::now() + timeout;

    // Logs are only available once the pod leaves Pending
    timeout_at(deadline, await_condition(pods.clone(), name, pod_started))
        .await
        .map_err(|_| {
            anyhow!(
                "timed out after {}s waiting for pod {name} to start",
                timeout.as_secs()
            )
        })?
        .with_context(|| format!("watch failed while waiting for pod {name} to start"))?;

    // Log output is part of the run report, but losing it is not fatal;
    // the outcome comes from the terminal phase below
    match timeout_at(deadline, stream_logs(pods, name)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("failed to stream logs from pod {name}: {e:#}"),
        Err(_) => warn!("log stream from pod {name} cut off by the run timeout"),
    }

    let pod = timeout_at(deadline, await_condition(pods.clone(), name, pod_finished))
        .await
        .map_err(|_| {
            anyhow!(
                "timed out after {}s waiting for pod {name} to finish",
                timeout.as_secs()
            )
        })?
        .with_context(|| format!("watch failed while waiting for pod {name} to finish"))?;

    let phase = pod
        .as_ref()
        .and_then(|p| p.status.as_ref())
        .and_then(|s| s.phase.clone())
        .unwrap_or_else(|| "Unknown".to_string());

    match phase.as_str() {
        "Succeeded" => Ok(PodOutcome::Succeeded),
        "Failed" => {
            if let Some(code) = container_exit_code(pod.as_ref()) {
                info!("testsuite container in pod {name} exited with code {code}");
            }
            Ok(PodOutcome::Failed)
        }
        other => bail!("pod {name} ended in unexpected phase {other}"),
    }
}

/// Follow the testsuite container's log output until it terminates,
/// forwarding each line to the runner's log
async fn stream_logs(pods: &Api<Pod>, name: &str) -> Result<()> {
    let params = LogParams {
        container: Some(TESTSUITE_NAME.to_string()),
        follow: true,
        ..Default::default()
    };

    let mut lines = pods.log_stream(name, &params).await?.lines();
    while let Some(line) = lines.try_next().await? {
        info!("{line}");
    }

    Ok(())
}

/// Delete the pod, tolerating one that is already gone
async fn delete_pod(pods: &Api<Pod>, name: &str) {
    match pods.delete(name, &DeleteParams::default()).await {
        Ok(_) => debug!("deleted pod {name}"),
        Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
            debug!("pod {name} already deleted");
        }
        Err(e) => warn!("failed to delete pod {name}: {e}"),
    }
}

fn pod_phase(pod: Option<&Pod>) -> Option<&str> {
    pod.and_then(|p| p.status.as_ref()).and_then(|s| s.phase.as_deref())
}

fn pod_started(pod: Option<&Pod>) -> bool {
    matches!(pod_phase(pod), Some("Running" | "Succeeded" | "Failed"))
}

fn pod_finished(pod: Option<&Pod>) -> bool {
    matches!(pod_phase(pod), Some("Succeeded" | "Failed"))
}

fn container_exit_code(pod: Option<&Pod>) -> Option<i32> {
    pod?.status
        .as_ref()?
        .container_statuses
        .as_ref()?
        .iter()
        .find(|cs| cs.name == TESTSUITE_NAME)?
        .state
        .as_ref()?
        .terminated
        .as_ref()
        .map(|t| t.exit_code)
}
