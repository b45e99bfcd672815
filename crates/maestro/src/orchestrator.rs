//! The provisioning pipeline.
//!
//! Sequences: per-stack Pulumi invocations → host aggregation → tunnel
//! readiness gate → Ansible invocation. Stacks provision in declaration
//! order, hosts merge in that same order, and probes run in host-list order;
//! nothing runs concurrently. Subprocess failures are never retried — the
//! only retry loop in the pipeline is tunnel readiness.

use crate::paths;
use crate::status;
use maestro_ansible::AnsibleCli;
use maestro_config::{LoadedConfig, PulumiCommand};
use maestro_core::{HostList, SecretStore, SshKeyFile, TunnelProber};
use maestro_pulumi::PulumiCli;

pub struct Orchestrator<'a> {
    config: &'a LoadedConfig,
    secrets: &'a SecretStore,
    ssh_key: &'a SshKeyFile,
    pulumi: PulumiCli,
    ansible: AnsibleCli,
    prober: TunnelProber,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a LoadedConfig,
        secrets: &'a SecretStore,
        ssh_key: &'a SshKeyFile,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            config,
            secrets,
            ssh_key,
            pulumi: PulumiCli::new(paths::pulumi_script()?),
            ansible: AnsibleCli::new(paths::ansible_script()?),
            prober: TunnelProber::new(),
        })
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let config = self.config;
        let mut all_hosts = HostList::default();

        if config.pulumi.enabled {
            status(format!(
                "Provisioning {} stack(s)...",
                config.pulumi.stacks.len()
            ));
            for (name, stack) in &config.pulumi.stacks {
                status(format!("Provisioning stack: {name}"));
                let hosts = self
                    .pulumi
                    .provision_stack(
                        *name,
                        config.pulumi.command,
                        &stack.servers,
                        config,
                        self.secrets,
                        true,
                    )
                    .await?;
                all_hosts.merge(hosts);
            }
        } else if config.ansible.enabled {
            // No mutation: only read back existing state for Ansible.
            status("Fetching existing Pulumi outputs for Ansible...");
            for (name, stack) in &config.pulumi.stacks {
                let hosts = self
                    .pulumi
                    .provision_stack(
                        *name,
                        PulumiCommand::Output,
                        &stack.servers,
                        config,
                        self.secrets,
                        false,
                    )
                    .await?;
                all_hosts.merge(hosts);
            }
        } else {
            status("Skipping Pulumi provisioning");
        }

        if config.ansible.enabled && !all_hosts.is_empty() {
            status("Checking tunnel readiness before running Ansible...");
            self.prober
                .wait_for_all(&all_hosts, self.ssh_key.path())
                .await?;

            status("Provisioning Ansible...");
            self.ansible.run(&all_hosts, config, self.secrets).await?;
        } else {
            status("Skipping Ansible provisioning");
        }

        status("Done.");
        Ok(())
    }
}

/// The credential names a run requires, in check order: two unconditional,
/// stage-gated extras, then user-declared variables.
pub fn required_secret_names(config: &LoadedConfig) -> Vec<&str> {
    let mut names = vec!["GHCR_TOKEN", "VPS_SSH_KEY"];

    if config.pulumi.enabled || config.ansible.enabled {
        names.push("PULUMI_ACCESS_TOKEN");
    }
    if config.pulumi.enabled {
        names.push("CLOUDFLARE_API_TOKEN");
        names.push("DIGITALOCEAN_TOKEN");
    }
    if config.ansible.enabled {
        names.push("GHCR_USERNAME");
    }

    names.extend(config.secrets.required_vars.iter().map(String::as_str));
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_secrets_minimal() {
        let config = maestro_config::load_str("domain: example.com").unwrap();
        assert_eq!(
            required_secret_names(&config),
            vec!["GHCR_TOKEN", "VPS_SSH_KEY"]
        );
    }

    #[test]
    fn test_required_secrets_with_pulumi_enabled() {
        let config = maestro_config::load_str(
            r#"
domain: example.com
pulumi:
  enabled: true
  cloudflareAccountId: abc
  stacks:
    dev:
      servers:
        - roles: [backend]
"#,
        )
        .unwrap();
        assert_eq!(
            required_secret_names(&config),
            vec![
                "GHCR_TOKEN",
                "VPS_SSH_KEY",
                "PULUMI_ACCESS_TOKEN",
                "CLOUDFLARE_API_TOKEN",
                "DIGITALOCEAN_TOKEN",
            ]
        );
    }

    #[test]
    fn test_required_secrets_with_ansible_and_user_vars() {
        let config = maestro_config::load_str(
            r#"
domain: example.com
ansible:
  enabled: true
secrets:
  requiredVars: [API_KEY, DB_PASSWORD]
"#,
        )
        .unwrap();
        assert_eq!(
            required_secret_names(&config),
            vec![
                "GHCR_TOKEN",
                "VPS_SSH_KEY",
                "PULUMI_ACCESS_TOKEN",
                "GHCR_USERNAME",
                "API_KEY",
                "DB_PASSWORD",
            ]
        );
    }

    #[test]
    fn test_required_secrets_are_checkable_without_global_state() {
        let config = maestro_config::load_str("domain: example.com").unwrap();
        let secrets = maestro_core::SecretStore::from_entries([
            ("GHCR_TOKEN", "t"),
            ("VPS_SSH_KEY", "k"),
        ]);
        for name in required_secret_names(&config) {
            secrets.require(name).unwrap();
        }
    }
}
