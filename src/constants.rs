//! # Constants
//!
//! Shared defaults used throughout the runner.
//!
//! These values mirror the testsuite's deployment conventions; the ones a
//! run commonly varies can be overridden on the command line.

/// Default testsuite image
pub const DEFAULT_TESTSUITE_IMAGE: &str = "quay.io/kuadrant/testsuite:unstable";

/// Default OpenShift project used for testing
pub const DEFAULT_PROJECT: &str = "multi-cluster-gateways";

/// Default testsuite make target to invoke (corresponds to test type)
pub const DEFAULT_MAKE_TARGET: &str = "mgc";

/// Environment-variable prefix understood by the testsuite's settings loader
pub const DYNACONF_ENV_PREFIX: &str = "KUADRANT";

/// Namespace the testsuite pod is created in when neither `--namespace`
/// nor the `POD_NAMESPACE` environment variable is set
pub const DEFAULT_NAMESPACE: &str = "default";

/// Name of the secret holding the target cluster login credentials
/// (`KUBE_USER` / `KUBE_PASSWORD`)
pub const KUBEAPI_CREDS_SECRET: &str = "airflow-kubeapi-creds";

/// Name of the secret holding the ReportPortal credentials
pub const REPORTPORTAL_CREDS_SECRET: &str = "reportportal-creds";

/// Name used for the testsuite container and as the pod name prefix
pub const TESTSUITE_NAME: &str = "kuadrant-testsuite";

/// CPU limit for the testsuite pod
pub const POD_CPU_LIMIT: &str = "200m";

/// Memory limit for the testsuite pod
pub const POD_MEMORY_LIMIT: &str = "256Mi";

/// Default time to wait for the testsuite pod to finish (seconds)
pub const DEFAULT_POD_TIMEOUT_SECS: u64 = 7200;
