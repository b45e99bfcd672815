//! Config loading pipeline: parse, schema walk, role derivation, semantic
//! checks, defaults.

use crate::error::{ConfigError, Result};
use crate::model::*;
use crate::schema;
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// Load and fully resolve the configuration from a file.
pub fn load(path: &Path) -> Result<LoadedConfig> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    load_str(&content)
}

/// Load and fully resolve the configuration from a YAML string.
pub fn load_str(content: &str) -> Result<LoadedConfig> {
    let doc: Value = serde_yaml::from_str(content)?;
    let raw = schema::validate(&doc)?;

    let roles = collect_roles(&raw);
    debug!(?roles, "Derived active role set");

    check_semantics(&raw, &roles)?;

    Ok(apply_defaults(raw, roles))
}

/// Union of every server's roles across every declared stack, independent of
/// stack or stage enablement.
fn collect_roles(raw: &RawConfig) -> BTreeSet<Role> {
    raw.pulumi
        .iter()
        .flat_map(|p| p.stacks.iter())
        .flat_map(|(_, stack)| stack.servers.iter())
        .flat_map(|server| server.roles.iter().copied())
        .collect()
}

/// Cross-field business rules the schema walk cannot express, gated by the
/// `enabled` flags and the derived role set.
fn check_semantics(raw: &RawConfig, roles: &BTreeSet<Role>) -> Result<()> {
    let ansible_enabled = raw
        .ansible
        .as_ref()
        .and_then(|a| a.enabled)
        .unwrap_or(false);

    if let Some(pulumi) = raw.pulumi.as_ref().filter(|p| p.enabled.unwrap_or(false)) {
        if pulumi
            .cloudflare_account_id
            .as_deref()
            .unwrap_or("")
            .is_empty()
        {
            return Err(ConfigError::Semantic(
                "pulumi.cloudflareAccountId is required when pulumi is enabled".to_string(),
            ));
        }
        if pulumi.stacks.is_empty() {
            return Err(ConfigError::Semantic(
                "pulumi.stacks must declare at least one stack when pulumi is enabled"
                    .to_string(),
            ));
        }
        for (name, stack) in &pulumi.stacks {
            if stack.servers.is_empty() {
                return Err(ConfigError::Semantic(format!(
                    "pulumi.stacks.{name}.servers must not be empty when pulumi is enabled"
                )));
            }
        }
    }

    if ansible_enabled && roles.contains(&Role::Web) {
        let web = raw.ansible.as_ref().and_then(|a| a.web.as_ref());
        let has_static = web.is_some_and(|w| w.static_site.is_some());
        let has_docker = web.is_some_and(|w| w.docker.is_some());
        match (has_static, has_docker) {
            (false, false) => {
                return Err(ConfigError::Semantic(
                    "ansible.web.static or ansible.web.docker must be configured when \
                     servers have the 'web' role"
                        .to_string(),
                ));
            }
            (true, true) => {
                return Err(ConfigError::Semantic(
                    "ansible.web.static and ansible.web.docker are mutually exclusive"
                        .to_string(),
                ));
            }
            _ => {}
        }

        if let Some(static_site) = web.and_then(|w| w.static_site.as_ref())
            && static_site.source == StaticSource::Local
            && let Some(dir) = static_site.dir.as_deref()
            && !Path::new(dir).exists()
        {
            return Err(ConfigError::Semantic(format!(
                "ansible.web.static.dir does not exist at {dir}"
            )));
        }
    }

    if ansible_enabled
        && roles.contains(&Role::Backend)
        && raw.ansible.as_ref().is_some_and(|a| a.backend.is_none())
    {
        return Err(ConfigError::Semantic(
            "ansible.backend.image and ansible.backend.tag are required when servers \
             have the 'backend' role"
                .to_string(),
        ));
    }

    Ok(())
}

/// Merge defaults for every optional field and attach the derived role set.
fn apply_defaults(raw: RawConfig, roles: BTreeSet<Role>) -> LoadedConfig {
    let pulumi = raw.pulumi.unwrap_or_default();
    let ansible = raw.ansible.unwrap_or_default();
    let secrets = raw.secrets.unwrap_or_default();

    let web = ansible.web.unwrap_or_default();
    let static_site = web.static_site.map(|s| WebStaticSettings {
        source: s.source,
        dir: s.dir.unwrap_or_default(),
        build: s.build.unwrap_or_default(),
        dist: s.dist.unwrap_or_else(|| "dist".to_string()),
        image: s.image.unwrap_or_default(),
        tag: s.tag.unwrap_or_else(|| "latest".to_string()),
        path: s.path.unwrap_or_else(|| "/app/dist".to_string()),
    });
    let docker = web.docker.map(|d| WebDockerSettings {
        image: d.image,
        tag: d.tag,
        port: d.port.unwrap_or(3000),
        env: d.env,
    });
    let backend = match ansible.backend {
        Some(b) => BackendSettings {
            image: b.image,
            tag: b.tag,
            port: b.port.unwrap_or(3000),
            env: b.env,
        },
        None => BackendSettings {
            image: String::new(),
            tag: String::new(),
            port: 3000,
            env: Default::default(),
        },
    };

    LoadedConfig {
        domain: raw.domain,
        pulumi: PulumiSettings {
            enabled: pulumi.enabled.unwrap_or(false),
            command: pulumi.command.unwrap_or(PulumiCommand::Up),
            cloudflare_account_id: pulumi.cloudflare_account_id.unwrap_or_default(),
            ssh_port: pulumi.ssh_port.unwrap_or(22),
            stacks: pulumi.stacks,
        },
        ansible: AnsibleSettings {
            enabled: ansible.enabled.unwrap_or(false),
            groups: ansible
                .groups
                .unwrap_or_else(|| vec!["devops".to_string()]),
            web: WebSettings {
                static_site,
                docker,
            },
            backend,
        },
        secrets: SecretsSettings {
            provider: secrets.provider.unwrap_or(SecretsProvider::Bws),
            project_id: secrets.project_id.unwrap_or_default(),
            required_vars: secrets.required_vars,
        },
        roles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_documented_defaults() {
        let config = load_str("domain: example.com").unwrap();
        assert_eq!(config.domain, "example.com");
        assert!(!config.pulumi.enabled);
        assert_eq!(config.pulumi.command, PulumiCommand::Up);
        assert_eq!(config.pulumi.cloudflare_account_id, "");
        assert_eq!(config.pulumi.ssh_port, 22);
        assert!(config.pulumi.stacks.is_empty());
        assert!(!config.ansible.enabled);
        assert_eq!(config.ansible.groups, vec!["devops"]);
        assert!(config.ansible.web.static_site.is_none());
        assert!(config.ansible.web.docker.is_none());
        assert_eq!(config.ansible.backend.port, 3000);
        assert_eq!(config.secrets.provider, SecretsProvider::Bws);
        assert_eq!(config.secrets.project_id, "");
        assert!(config.secrets.required_vars.is_empty());
        assert!(config.roles.is_empty());
    }

    #[test]
    fn test_role_set_is_union_across_all_stacks() {
        // Roles are collected regardless of which stages are enabled.
        let yaml = r#"
domain: example.com
pulumi:
  enabled: false
  stacks:
    dev:
      servers:
        - roles: [backend]
    prod:
      servers:
        - roles: [backend]
        - roles: [web]
"#;
        let config = load_str(yaml).unwrap();
        assert_eq!(
            config.roles,
            BTreeSet::from([Role::Backend, Role::Web])
        );
    }

    #[test]
    fn test_pulumi_enabled_requires_account_id() {
        let yaml = r#"
domain: example.com
pulumi:
  enabled: true
  stacks:
    dev:
      servers:
        - roles: [backend]
"#;
        let err = load_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Semantic(_)));
        assert!(err.to_string().contains("cloudflareAccountId"));
    }

    #[test]
    fn test_pulumi_enabled_requires_stacks() {
        let yaml = r#"
domain: example.com
pulumi:
  enabled: true
  cloudflareAccountId: abc123
"#;
        let err = load_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Semantic(_)));
        assert!(err.to_string().contains("at least one stack"));
    }

    #[test]
    fn test_empty_servers_rejected_in_provisioning_mode() {
        let yaml = r#"
domain: example.com
pulumi:
  enabled: true
  cloudflareAccountId: abc123
  stacks:
    staging:
      servers: []
"#;
        let err = load_str(yaml).unwrap_err();
        assert!(err.to_string().contains("pulumi.stacks.staging.servers"));
    }

    #[test]
    fn test_empty_servers_allowed_in_output_only_mode() {
        let yaml = r#"
domain: example.com
pulumi:
  enabled: false
  stacks:
    staging:
      servers: []
"#;
        assert!(load_str(yaml).is_ok());
    }

    #[test]
    fn test_web_role_requires_a_web_mode() {
        let yaml = r#"
domain: example.com
pulumi:
  stacks:
    dev:
      servers:
        - roles: [web]
ansible:
  enabled: true
"#;
        let err = load_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Semantic(_)));
        assert!(err.to_string().contains("ansible.web.static or ansible.web.docker"));
    }

    #[test]
    fn test_web_modes_are_mutually_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = format!(
            r#"
domain: example.com
pulumi:
  stacks:
    dev:
      servers:
        - roles: [web]
ansible:
  enabled: true
  web:
    static:
      source: local
      dir: {}
    docker:
      image: nginx
      tag: latest
"#,
            dir.path().display()
        );
        let err = load_str(&yaml).unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_local_static_dir_must_exist() {
        let yaml = r#"
domain: example.com
pulumi:
  stacks:
    dev:
      servers:
        - roles: [web]
ansible:
  enabled: true
  web:
    static:
      source: local
      dir: /nonexistent/maestro-static-dir
"#;
        let err = load_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Semantic(_)));
        assert!(err.to_string().contains("/nonexistent/maestro-static-dir"));
    }

    #[test]
    fn test_local_static_existing_dir_passes() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = format!(
            r#"
domain: example.com
pulumi:
  stacks:
    dev:
      servers:
        - roles: [web]
ansible:
  enabled: true
  web:
    static:
      source: local
      dir: {}
"#,
            dir.path().display()
        );
        let config = load_str(&yaml).unwrap();
        let static_site = config.ansible.web.static_site.unwrap();
        assert_eq!(static_site.source, StaticSource::Local);
        assert_eq!(static_site.dist, "dist");
        assert_eq!(static_site.tag, "latest");
        assert_eq!(static_site.path, "/app/dist");
    }

    #[test]
    fn test_backend_role_requires_backend_config() {
        let yaml = r#"
domain: example.com
pulumi:
  stacks:
    dev:
      servers:
        - roles: [backend]
ansible:
  enabled: true
"#;
        let err = load_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Semantic(_)));
        assert!(err.to_string().contains("ansible.backend.image"));
    }

    #[test]
    fn test_backend_role_checks_skipped_when_ansible_disabled() {
        let yaml = r#"
domain: example.com
pulumi:
  stacks:
    dev:
      servers:
        - roles: [backend, web]
"#;
        assert!(load_str(yaml).is_ok());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = load(Path::new("/nonexistent/maestro.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maestro.yaml");
        std::fs::write(&path, "domain: example.com\n").unwrap();
        let config = load(&path).unwrap();
        assert_eq!(config.domain, "example.com");
    }

    #[test]
    fn test_docker_mode_defaults() {
        let yaml = r#"
domain: example.com
ansible:
  web:
    docker:
      image: nginx
      tag: stable
"#;
        let config = load_str(yaml).unwrap();
        let docker = config.ansible.web.docker.unwrap();
        assert_eq!(docker.port, 3000);
        assert!(docker.env.is_empty());
    }
}
