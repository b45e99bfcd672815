//! Ansible wrapper for Maestro.
//!
//! Builds the full environment/argument surface of the configuration-
//! management run script and invokes it once with the verified host
//! aggregate. Role-based provisioning: playbooks for a role no server
//! declares are skipped via `--skip-web` / `--skip-backend`.

pub mod error;

pub use error::{AnsibleError, Result};

use maestro_config::{LoadedConfig, Role};
use maestro_core::{HostList, SecretStore, process};
use std::path::PathBuf;
use tracing::info;

/// Ansible run-script wrapper. Constructed once and passed where needed.
pub struct AnsibleCli {
    script: PathBuf,
}

impl AnsibleCli {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }

    /// Invoke configuration management for the whole host aggregate.
    ///
    /// Runs with inherited stdio so the operator interacts with the tool
    /// directly. A non-zero exit is fatal.
    pub async fn run(
        &self,
        hosts: &HostList,
        config: &LoadedConfig,
        secrets: &SecretStore,
    ) -> Result<()> {
        let args = build_args(hosts, config)?;
        let env = build_env(config, secrets)?;

        info!(hosts = hosts.len(), "Invoking Ansible");
        let status = process::run_inherited(&self.script, &args, &env).await?;

        if !status.success() {
            return Err(AnsibleError::CommandFailed {
                code: status.code().unwrap_or(-1),
            });
        }
        Ok(())
    }
}

/// Argument list: serialized host aggregate plus role-derived skip flags.
fn build_args(hosts: &HostList, config: &LoadedConfig) -> Result<Vec<String>> {
    let mut args = vec![
        "--ssh-hosts".to_string(),
        serde_json::to_string(hosts)?,
        "--skip-bws".to_string(),
    ];

    if !config.has_role(Role::Web) {
        args.push("--skip-web".to_string());
    }
    if !config.has_role(Role::Backend) {
        args.push("--skip-backend".to_string());
    }

    Ok(args)
}

/// Environment block for the invocation, layered over the secret overlay.
fn build_env(config: &LoadedConfig, secrets: &SecretStore) -> Result<Vec<(String, String)>> {
    let ansible = &config.ansible;
    let static_site = ansible.web.static_site.as_ref();
    let docker = ansible.web.docker.as_ref();

    let web_mode = if docker.is_some() {
        "docker"
    } else if static_site.is_some() {
        "static"
    } else {
        ""
    };

    let mut env = secrets.env_overlay();
    let mut push = |key: &str, value: String| env.push((key.to_string(), value));

    push("DOMAIN", config.domain.clone());
    push("BACKEND_PORT", ansible.backend.port.to_string());
    push("BACKEND_IMAGE", ansible.backend.image.clone());
    push("BACKEND_IMAGE_TAG", ansible.backend.tag.clone());
    push("WEB_MODE", web_mode.to_string());
    push(
        "WEB_STATIC_SOURCE",
        static_site.map(|s| s.source.to_string()).unwrap_or_default(),
    );
    push(
        "WEB_STATIC_DIR",
        static_site.map(|s| s.dir.clone()).unwrap_or_default(),
    );
    push(
        "WEB_STATIC_BUILD",
        static_site.map(|s| s.build.clone()).unwrap_or_default(),
    );
    push(
        "WEB_STATIC_DIST",
        static_site.map(|s| s.dist.clone()).unwrap_or_default(),
    );
    push(
        "WEB_STATIC_IMAGE",
        static_site.map(|s| s.image.clone()).unwrap_or_default(),
    );
    push(
        "WEB_STATIC_TAG",
        static_site.map(|s| s.tag.clone()).unwrap_or_default(),
    );
    push(
        "WEB_STATIC_PATH",
        static_site.map(|s| s.path.clone()).unwrap_or_default(),
    );
    push(
        "WEB_DOCKER_IMAGE",
        docker.map(|d| d.image.clone()).unwrap_or_default(),
    );
    push(
        "WEB_DOCKER_TAG",
        docker.map(|d| d.tag.clone()).unwrap_or_default(),
    );
    push(
        "WEB_DOCKER_PORT",
        docker.map(|d| d.port.to_string()).unwrap_or_default(),
    );
    push("MANAGED_GROUPS", serde_json::to_string(&ansible.groups)?);
    push(
        "SECRETS_REQUIRED_VARS_JSON",
        serde_json::to_string(&config.secrets.required_vars)?,
    );

    // Custom container environment, injected with per-key prefixes.
    for (key, value) in &ansible.backend.env {
        push(&format!("BACKEND_ENV_{key}"), value.clone());
    }
    // Auto-inject PORT into the backend container from backend.port; wins
    // over a user-declared PORT entry.
    push("BACKEND_ENV_PORT", ansible.backend.port.to_string());

    if let Some(docker) = docker {
        for (key, value) in &docker.env {
            push(&format!("WEB_DOCKER_ENV_{key}"), value.clone());
        }
    }

    Ok(env)
}
