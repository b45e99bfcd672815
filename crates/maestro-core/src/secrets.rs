//! Bitwarden Secrets Manager integration.
//!
//! Fetches secrets with the `bws` CLI and holds them in an immutable
//! [`SecretStore`] that is passed by reference to every component needing
//! credentials. Secrets are injected into subprocesses through the env
//! overlay; the ambient process environment is never mutated. Secret values
//! are never logged.

use crate::error::{CoreError, Result};
use crate::process;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Access token expected in the ambient environment by the `bws` CLI.
pub const BWS_ACCESS_TOKEN: &str = "BWS_ACCESS_TOKEN";

/// Immutable key/value store of fetched secrets.
#[derive(Debug, Default, Clone)]
pub struct SecretStore {
    values: BTreeMap<String, String>,
}

impl SecretStore {
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Require that a secret exists and is non-empty.
    pub fn require(&self, name: &str) -> Result<&str> {
        match self.get(name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(CoreError::MissingSecret(name.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries as an env overlay for subprocess invocations.
    pub fn env_overlay(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Fetch secrets from Bitwarden Secrets Manager.
///
/// Runs `bws secret list -o env [project_id]` and parses the env-format
/// output. Requires `BWS_ACCESS_TOKEN` in the ambient environment; works with
/// project-scoped access tokens.
pub async fn fetch_bws_secrets(project_id: Option<&str>) -> Result<SecretStore> {
    match std::env::var(BWS_ACCESS_TOKEN) {
        Ok(token) if !token.is_empty() => {}
        _ => return Err(CoreError::BwsTokenMissing),
    }

    let mut args = vec!["secret", "list", "-o", "env"];
    if let Some(id) = project_id {
        args.push(id);
    }

    let output = process::run_captured("bws", &args, &[]).await?;
    if !output.status.success() {
        let stderr = output.stderr.trim();
        return Err(CoreError::SecretsFetch(if stderr.is_empty() {
            "unknown error".to_string()
        } else {
            stderr.to_string()
        }));
    }

    let values = parse_env_lines(&output.stdout);
    info!(count = values.len(), "Fetched secrets from Bitwarden");
    Ok(SecretStore { values })
}

/// Parse `KEY=value` lines as emitted by `bws secret list -o env`.
///
/// Blank lines and `#` comments are skipped; surrounding quotes are stripped
/// and common escape sequences are expanded.
fn parse_env_lines(stdout: &str) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();

    for line in stdout.lines() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, raw_value)) = line.split_once('=') else {
            debug!("Skipping line without '=' in bws output");
            continue;
        };

        let mut value = raw_value;
        if (value.starts_with('"') && value.ends_with('"') && value.len() >= 2)
            || (value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2)
        {
            value = &value[1..value.len() - 1];
        }

        let value = value
            .replace("\\n", "\n")
            .replace("\\t", "\t")
            .replace("\\r", "\r")
            .replace("\\\\", "\\")
            .replace("\\\"", "\"");

        values.insert(key.to_string(), value);
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_lines() {
        let stdout = "\
# comment
GHCR_TOKEN=\"abc123\"
VPS_SSH_KEY=\"-----BEGIN KEY-----\\nbody\\n-----END KEY-----\"

PLAIN=value
SINGLE='quoted'
";
        let values = parse_env_lines(stdout);
        assert_eq!(values["GHCR_TOKEN"], "abc123");
        assert_eq!(
            values["VPS_SSH_KEY"],
            "-----BEGIN KEY-----\nbody\n-----END KEY-----"
        );
        assert_eq!(values["PLAIN"], "value");
        assert_eq!(values["SINGLE"], "quoted");
        assert_eq!(values.len(), 4);
    }

    #[test]
    fn test_parse_env_lines_expands_escapes() {
        let values = parse_env_lines("K=\"a\\tb\\\"c\\\"\"");
        assert_eq!(values["K"], "a\tb\"c\"");
    }

    #[test]
    fn test_require_missing_secret() {
        let store = SecretStore::from_entries([("PRESENT", "1"), ("EMPTY", "")]);
        assert_eq!(store.require("PRESENT").unwrap(), "1");
        let err = store.require("ABSENT").unwrap_err();
        assert!(matches!(err, CoreError::MissingSecret(name) if name == "ABSENT"));
        assert!(store.require("EMPTY").is_err());
    }

    #[test]
    fn test_env_overlay_round_trip() {
        let store = SecretStore::from_entries([("A", "1"), ("B", "2")]);
        let overlay = store.env_overlay();
        assert_eq!(overlay.len(), 2);
        assert!(overlay.contains(&("A".to_string(), "1".to_string())));
    }
}
