//! Pulumi wrapper for Maestro.
//!
//! Invokes the infrastructure-provisioning run script once per stack, in
//! declaration order, with the per-stack environment block, and extracts the
//! provisioned host list from the sentinel-delimited payload in its stdout.
//!
//! Two invocation styles match the two pipeline modes: interactive
//! provisioning streams output live to the operator, while output-only
//! fetches (existing state for configuration management) run silently and
//! only reach the logs.

pub mod error;
pub mod outputs;

pub use error::{PulumiError, Result};
pub use outputs::{OUTPUTS_BEGIN, OUTPUTS_END, parse_host_outputs};

use maestro_config::{LoadedConfig, PulumiCommand, ServerConfig, StackName};
use maestro_core::{HostList, SecretStore, process};
use std::path::PathBuf;
use tracing::{debug, info};

/// Pulumi run-script wrapper. Constructed once and passed where needed.
pub struct PulumiCli {
    script: PathBuf,
}

impl PulumiCli {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }

    /// Invoke the provisioning tool for one stack and parse its host output.
    ///
    /// With `stream_logs`, stdout is tee'd to the console for live progress;
    /// without, the run is captured and surfaced only in the logs. A non-zero
    /// exit is fatal.
    pub async fn provision_stack(
        &self,
        stack: StackName,
        command: PulumiCommand,
        servers: &[ServerConfig],
        config: &LoadedConfig,
        secrets: &SecretStore,
        stream_logs: bool,
    ) -> Result<HostList> {
        let env = build_stack_env(stack, servers, config, secrets)?;
        let args = ["--command", command.as_str(), "--skip-bws"];

        info!(stack = %stack, command = %command, "Invoking Pulumi");
        let output = if stream_logs {
            process::run_streamed(&self.script, &args, &env).await?
        } else {
            process::run_captured(&self.script, &args, &env).await?
        };

        if !output.status.success() {
            return Err(PulumiError::CommandFailed {
                code: output.code(),
            });
        }

        if !stream_logs {
            debug!(stack = %stack, stdout = %output.stdout, "Pulumi output-mode stdout");
        }

        parse_host_outputs(&output.stdout)
    }
}

/// Environment block for one stack invocation, layered over the secret
/// overlay.
fn build_stack_env(
    stack: StackName,
    servers: &[ServerConfig],
    config: &LoadedConfig,
    secrets: &SecretStore,
) -> Result<Vec<(String, String)>> {
    let servers_json = serde_json::to_string(servers).map_err(PulumiError::ServerList)?;

    let mut env = secrets.env_overlay();
    env.push(("DOMAIN".to_string(), config.domain.clone()));
    env.push((
        "CLOUDFLARE_ACCOUNT_ID".to_string(),
        config.pulumi.cloudflare_account_id.clone(),
    ));
    env.push(("SSH_PORT".to_string(), config.pulumi.ssh_port.to_string()));
    env.push((
        "BACKEND_PORT".to_string(),
        config.ansible.backend.port.to_string(),
    ));
    env.push(("PULUMI_STACK".to_string(), stack.as_str().to_string()));
    env.push(("PULUMI_SERVERS_JSON".to_string(), servers_json));
    Ok(env)
}
