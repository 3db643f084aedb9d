//! # Settings
//!
//! Reshapes Dynaconf-style `key.subkey=value` override lines into the
//! environment-variable form the testsuite's settings loader understands,
//! and adapts the resulting mapping into the shape the pod spec's `env`
//! field expects.
//!
//! The testsuite reads nested settings from environment variables named
//! `<PREFIX>_<key>` with `__` standing in for each level of nesting, so
//! `control_plane.spokes` becomes `<PREFIX>_control_plane__spokes`.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::EnvVar;
use thiserror::Error;

/// Errors raised while parsing override lines
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An override line did not contain a `=` separator
    #[error("override line '{line}' has no '=' separator")]
    MissingSeparator { line: String },
}

/// Convert Dynaconf-style `key.subkey=value` lines into environment variables.
///
/// Each line is split on the first `=` only, so values may themselves
/// contain `=`. Dots in the key are flattened to `__` and the result is
/// prefixed with `<prefix>_`. When two lines flatten to the same name,
/// the last one wins.
///
/// A line without a separator fails the whole conversion up front; no
/// partial mapping is returned.
///
/// # Example
///
/// ```
/// use testsuite_runner::settings::dot_to_env;
///
/// let lines = vec!["control_plane.spokes={local-cluster={}}".to_string()];
/// let env = dot_to_env("KUADRANT", &lines).unwrap();
/// assert_eq!(
///     env.get("KUADRANT_control_plane__spokes").map(String::as_str),
///     Some("{local-cluster={}}")
/// );
/// ```
pub fn dot_to_env(
    prefix: &str,
    lines: &[String],
) -> Result<BTreeMap<String, String>, SettingsError> {
    let mut env = BTreeMap::new();

    for line in lines {
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| SettingsError::MissingSeparator { line: line.clone() })?;
        env.insert(
            format!("{prefix}_{}", key.replace('.', "__")),
            value.to_string(),
        );
    }

    Ok(env)
}

/// Adapt an environment mapping into the pod spec's env list.
///
/// Produces exactly one [`EnvVar`] per mapping entry, preserving the
/// mapping's iteration order. Names are passed through untouched; their
/// legality is the API server's business.
pub fn env_var_list(env: &BTreeMap<String, String>) -> Vec<EnvVar> {
    env.iter()
        .map(|(name, value)| EnvVar {
            name: name.clone(),
            value: Some(value.clone()),
            ..Default::default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_dot_to_env_flattens_and_prefixes() {
        let env = dot_to_env("KUADRANT", &lines(&["cluster.project=testing"])).unwrap();

        assert_eq!(env.len(), 1);
        assert_eq!(
            env.get("KUADRANT_cluster__project").map(String::as_str),
            Some("testing")
        );
    }

    #[test]
    fn test_dot_to_env_splits_on_first_separator_only() {
        let env = dot_to_env("KUADRANT", &lines(&["a.b.c=1=2"])).unwrap();

        assert_eq!(env.get("KUADRANT_a__b__c").map(String::as_str), Some("1=2"));
    }

    #[test]
    fn test_dot_to_env_keeps_structured_values_verbatim() {
        let env = dot_to_env(
            "KUADRANT",
            &lines(&["control_plane.spokes={local-cluster={}}"]),
        )
        .unwrap();

        assert_eq!(
            env.get("KUADRANT_control_plane__spokes").map(String::as_str),
            Some("{local-cluster={}}")
        );
    }

    #[test]
    fn test_dot_to_env_one_entry_per_line() {
        let env = dot_to_env("P", &lines(&["a=1", "b.c=2", "d.e.f=3"])).unwrap();

        assert_eq!(env.len(), 3);
        assert_eq!(env.get("P_a").map(String::as_str), Some("1"));
        assert_eq!(env.get("P_b__c").map(String::as_str), Some("2"));
        assert_eq!(env.get("P_d__e__f").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_dot_to_env_last_duplicate_wins() {
        let env = dot_to_env("P", &lines(&["a.b=first", "a.b=second"])).unwrap();

        assert_eq!(env.len(), 1);
        assert_eq!(env.get("P_a__b").map(String::as_str), Some("second"));
    }

    #[test]
    fn test_dot_to_env_missing_separator_is_fatal() {
        let result = dot_to_env("P", &lines(&["a.b=1", "no-separator-here"]));

        let err = result.unwrap_err();
        assert!(err.to_string().contains("no-separator-here"));
    }

    #[test]
    fn test_dot_to_env_empty_input() {
        let env = dot_to_env("P", &[]).unwrap();

        assert!(env.is_empty());
    }

    #[test]
    fn test_env_var_list_one_record_per_entry() {
        let mut env = BTreeMap::new();
        env.insert("A".to_string(), "1".to_string());
        env.insert("B".to_string(), "2".to_string());

        let vars = env_var_list(&env);

        assert_eq!(vars.len(), 2);
        assert!(vars.iter().all(|v| v.value_from.is_none()));
    }

    #[test]
    fn test_env_var_list_preserves_iteration_order() {
        let mut env = BTreeMap::new();
        env.insert("B".to_string(), "2".to_string());
        env.insert("A".to_string(), "1".to_string());
        env.insert("C".to_string(), "3".to_string());

        let names: Vec<_> = env_var_list(&env).into_iter().map(|v| v.name).collect();
        let expected: Vec<_> = env.keys().cloned().collect();

        assert_eq!(names, expected);
    }

    #[test]
    fn test_env_var_list_empty_mapping() {
        assert!(env_var_list(&BTreeMap::new()).is_empty());
    }
}
