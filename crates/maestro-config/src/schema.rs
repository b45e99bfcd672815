//! Closed schema validation for the maestro.yaml document.
//!
//! This is the single canonical validator: a walk over the parsed YAML tree
//! against a fixed rule table. The walk is exact — unknown keys at any level
//! are rejected with the offending field path, enum fields name the allowed
//! values, and the top-level sections are checked in a fixed order
//! (domain → pulumi → ansible → secrets) so error messages are deterministic.

use crate::error::{ConfigError, Result};
use crate::model::*;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Validate the parsed document and build the raw config tree.
pub(crate) fn validate(doc: &Value) -> Result<RawConfig> {
    let root = as_mapping(doc, "(root)")?;

    let mut domain = None;
    let mut pulumi = None;
    let mut ansible = None;
    let mut secrets = None;

    for (key, value) in root {
        match key_str(key, "(root)")? {
            "domain" => domain = Some(value),
            "pulumi" => pulumi = Some(value),
            "ansible" => ansible = Some(value),
            "secrets" => secrets = Some(value),
            other => return Err(unknown_key("(root)", other)),
        }
    }

    // Fixed check order: domain, then pulumi, then ansible, then secrets.
    let domain = match domain {
        Some(value) => as_str(value, "domain")?.to_string(),
        None => {
            return Err(ConfigError::schema(
                "domain",
                "missing required field",
            ));
        }
    };

    let pulumi = pulumi.map(parse_pulumi).transpose()?;
    let ansible = ansible.map(parse_ansible).transpose()?;
    let secrets = secrets.map(parse_secrets).transpose()?;

    Ok(RawConfig {
        domain,
        pulumi,
        ansible,
        secrets,
    })
}

// ============================================
// Section parsers
// ============================================

fn parse_pulumi(value: &Value) -> Result<RawPulumi> {
    let path = "pulumi";
    let mapping = as_mapping(value, path)?;
    let mut out = RawPulumi::default();

    for (key, value) in mapping {
        let key = key_str(key, path)?;
        let field = join(path, key);
        match key {
            "enabled" => out.enabled = Some(as_bool(value, &field)?),
            "command" => {
                out.command = Some(parse_enum(value, &field, PulumiCommand::parse, &[
                    "up", "refresh", "cancel", "output",
                ])?)
            }
            "cloudflareAccountId" => {
                out.cloudflare_account_id = Some(as_str(value, &field)?.to_string())
            }
            "sshPort" => out.ssh_port = Some(as_port(value, &field)?),
            "stacks" => out.stacks = parse_stacks(value, &field)?,
            other => return Err(unknown_key(path, other)),
        }
    }

    Ok(out)
}

fn parse_stacks(value: &Value, path: &str) -> Result<Vec<(StackName, StackConfig)>> {
    let mapping = as_mapping(value, path)?;
    let mut stacks = Vec::new();

    for (key, value) in mapping {
        let key = key_str(key, path)?;
        let Some(name) = StackName::parse(key) else {
            return Err(ConfigError::schema(
                path,
                format!("invalid stack name '{key}', must be one of dev, staging, prod"),
            ));
        };
        stacks.push((name, parse_stack(value, &join(path, key))?));
    }

    Ok(stacks)
}

fn parse_stack(value: &Value, path: &str) -> Result<StackConfig> {
    let mapping = as_mapping(value, path)?;
    let mut servers = None;

    for (key, value) in mapping {
        let key = key_str(key, path)?;
        let field = join(path, key);
        match key {
            "servers" => {
                let seq = as_sequence(value, &field)?;
                let mut parsed = Vec::with_capacity(seq.len());
                for (i, server) in seq.iter().enumerate() {
                    parsed.push(parse_server(server, &format!("{field}[{i}]"))?);
                }
                servers = Some(parsed);
            }
            other => return Err(unknown_key(path, other)),
        }
    }

    let servers = servers.ok_or_else(|| {
        ConfigError::schema(join(path, "servers"), "missing required field")
    })?;
    Ok(StackConfig { servers })
}

fn parse_server(value: &Value, path: &str) -> Result<ServerConfig> {
    let mapping = as_mapping(value, path)?;
    let mut roles = None;
    let mut groups = None;
    let mut tags = None;
    let mut image = None;
    let mut size = None;
    let mut region = None;

    for (key, value) in mapping {
        let key = key_str(key, path)?;
        let field = join(path, key);
        match key {
            "roles" => {
                let seq = as_sequence(value, &field)?;
                if seq.is_empty() {
                    return Err(ConfigError::schema(
                        field.as_str(),
                        "must have at least 1 item",
                    ));
                }
                let mut parsed = Vec::with_capacity(seq.len());
                for role in seq {
                    parsed.push(parse_enum(role, &field, Role::parse, &["backend", "web"])?);
                }
                roles = Some(parsed);
            }
            "groups" => groups = Some(as_str_seq(value, &field)?),
            "tags" => tags = Some(as_str_seq(value, &field)?),
            "image" => image = Some(as_str(value, &field)?.to_string()),
            "size" => size = Some(as_str(value, &field)?.to_string()),
            "region" => region = Some(as_str(value, &field)?.to_string()),
            other => return Err(unknown_key(path, other)),
        }
    }

    let roles = roles.ok_or_else(|| {
        ConfigError::schema(join(path, "roles"), "missing required field")
    })?;
    Ok(ServerConfig {
        roles,
        groups,
        tags,
        image,
        size,
        region,
    })
}

fn parse_ansible(value: &Value) -> Result<RawAnsible> {
    let path = "ansible";
    let mapping = as_mapping(value, path)?;
    let mut out = RawAnsible::default();

    for (key, value) in mapping {
        let key = key_str(key, path)?;
        let field = join(path, key);
        match key {
            "enabled" => out.enabled = Some(as_bool(value, &field)?),
            "groups" => out.groups = Some(as_str_seq(value, &field)?),
            "web" => out.web = Some(parse_web(value, &field)?),
            "backend" => out.backend = Some(parse_backend(value, &field)?),
            other => return Err(unknown_key(path, other)),
        }
    }

    Ok(out)
}

fn parse_web(value: &Value, path: &str) -> Result<RawWeb> {
    let mapping = as_mapping(value, path)?;
    let mut out = RawWeb::default();

    for (key, value) in mapping {
        let key = key_str(key, path)?;
        let field = join(path, key);
        match key {
            "static" => out.static_site = Some(parse_web_static(value, &field)?),
            "docker" => out.docker = Some(parse_web_docker(value, &field)?),
            other => return Err(unknown_key(path, other)),
        }
    }

    Ok(out)
}

fn parse_web_static(value: &Value, path: &str) -> Result<RawWebStatic> {
    let mapping = as_mapping(value, path)?;
    let mut source = None;
    let mut dir = None;
    let mut build = None;
    let mut dist = None;
    let mut image = None;
    let mut tag = None;
    let mut site_path = None;

    for (key, value) in mapping {
        let key = key_str(key, path)?;
        let field = join(path, key);
        match key {
            "source" => {
                source = Some(parse_enum(value, &field, StaticSource::parse, &[
                    "local", "image",
                ])?)
            }
            "dir" => dir = Some(as_str(value, &field)?.to_string()),
            "build" => build = Some(as_str(value, &field)?.to_string()),
            "dist" => dist = Some(as_str(value, &field)?.to_string()),
            "image" => image = Some(as_str(value, &field)?.to_string()),
            "tag" => tag = Some(as_str(value, &field)?.to_string()),
            "path" => site_path = Some(as_str(value, &field)?.to_string()),
            other => return Err(unknown_key(path, other)),
        }
    }

    let source = source.ok_or_else(|| {
        ConfigError::schema(join(path, "source"), "missing required field")
    })?;

    // Source-dependent required fields.
    match source {
        StaticSource::Local if dir.is_none() => {
            return Err(ConfigError::schema(
                join(path, "dir"),
                "required when source is 'local'",
            ));
        }
        StaticSource::Image if image.is_none() || tag.is_none() => {
            return Err(ConfigError::schema(
                path,
                "'image' and 'tag' are required when source is 'image'",
            ));
        }
        _ => {}
    }

    Ok(RawWebStatic {
        source,
        dir,
        build,
        dist,
        image,
        tag,
        path: site_path,
    })
}

fn parse_web_docker(value: &Value, path: &str) -> Result<RawWebDocker> {
    let mapping = as_mapping(value, path)?;
    let mut image = None;
    let mut tag = None;
    let mut port = None;
    let mut env = BTreeMap::new();

    for (key, value) in mapping {
        let key = key_str(key, path)?;
        let field = join(path, key);
        match key {
            "image" => image = Some(as_str(value, &field)?.to_string()),
            "tag" => tag = Some(as_str(value, &field)?.to_string()),
            "port" => port = Some(as_port(value, &field)?),
            "env" => env = as_str_map(value, &field)?,
            other => return Err(unknown_key(path, other)),
        }
    }

    let image = image.ok_or_else(|| {
        ConfigError::schema(join(path, "image"), "missing required field")
    })?;
    let tag = tag.ok_or_else(|| {
        ConfigError::schema(join(path, "tag"), "missing required field")
    })?;
    Ok(RawWebDocker {
        image,
        tag,
        port,
        env,
    })
}

fn parse_backend(value: &Value, path: &str) -> Result<RawBackend> {
    let mapping = as_mapping(value, path)?;
    let mut image = None;
    let mut tag = None;
    let mut port = None;
    let mut env = BTreeMap::new();

    for (key, value) in mapping {
        let key = key_str(key, path)?;
        let field = join(path, key);
        match key {
            "image" => image = Some(as_str(value, &field)?.to_string()),
            "tag" => tag = Some(as_str(value, &field)?.to_string()),
            "port" => port = Some(as_port(value, &field)?),
            "env" => env = as_str_map(value, &field)?,
            other => return Err(unknown_key(path, other)),
        }
    }

    let image = image.ok_or_else(|| {
        ConfigError::schema(join(path, "image"), "missing required field")
    })?;
    let tag = tag.ok_or_else(|| {
        ConfigError::schema(join(path, "tag"), "missing required field")
    })?;
    Ok(RawBackend {
        image,
        tag,
        port,
        env,
    })
}

fn parse_secrets(value: &Value) -> Result<RawSecrets> {
    let path = "secrets";
    let mapping = as_mapping(value, path)?;
    let mut out = RawSecrets::default();

    for (key, value) in mapping {
        let key = key_str(key, path)?;
        let field = join(path, key);
        match key {
            "provider" => {
                let s = as_str(value, &field)?;
                if s != "bws" {
                    return Err(ConfigError::schema(field.as_str(), "must be one of bws"));
                }
                out.provider = Some(SecretsProvider::Bws);
            }
            "projectId" => out.project_id = Some(as_str(value, &field)?.to_string()),
            "requiredVars" => {
                let vars = as_str_seq(value, &field)?;
                if vars.iter().any(|v| v.is_empty()) {
                    return Err(ConfigError::schema(
                        field.as_str(),
                        "entries must not be empty",
                    ));
                }
                out.required_vars = vars;
            }
            other => return Err(unknown_key(path, other)),
        }
    }

    Ok(out)
}

// ============================================
// Tree access helpers
// ============================================

fn join(parent: &str, key: &str) -> String {
    if parent == "(root)" {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn unknown_key(path: &str, key: &str) -> ConfigError {
    ConfigError::schema(path, format!("unknown field '{key}'"))
}

fn as_mapping<'a>(value: &'a Value, path: &str) -> Result<&'a Mapping> {
    value
        .as_mapping()
        .ok_or_else(|| ConfigError::schema(path, "must be a mapping"))
}

fn key_str<'a>(key: &'a Value, path: &str) -> Result<&'a str> {
    key.as_str()
        .ok_or_else(|| ConfigError::schema(path, "keys must be strings"))
}

fn as_str<'a>(value: &'a Value, path: &str) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| ConfigError::schema(path, "must be a string"))
}

fn as_bool(value: &Value, path: &str) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| ConfigError::schema(path, "must be a boolean"))
}

fn as_port(value: &Value, path: &str) -> Result<u16> {
    value
        .as_u64()
        .and_then(|n| u16::try_from(n).ok())
        .ok_or_else(|| ConfigError::schema(path, "must be an integer port number"))
}

fn as_sequence<'a>(value: &'a Value, path: &str) -> Result<&'a Vec<Value>> {
    value
        .as_sequence()
        .ok_or_else(|| ConfigError::schema(path, "must be a sequence"))
}

fn as_str_seq(value: &Value, path: &str) -> Result<Vec<String>> {
    let seq = as_sequence(value, path)?;
    seq.iter()
        .map(|v| as_str(v, path).map(str::to_string))
        .collect()
}

fn as_str_map(value: &Value, path: &str) -> Result<BTreeMap<String, String>> {
    let mapping = as_mapping(value, path)?;
    let mut out = BTreeMap::new();
    for (key, value) in mapping {
        let key = key_str(key, path)?;
        out.insert(key.to_string(), as_str(value, &join(path, key))?.to_string());
    }
    Ok(out)
}

fn parse_enum<T: Copy>(
    value: &Value,
    path: &str,
    parse: fn(&str) -> Option<T>,
    allowed: &[&str],
) -> Result<T> {
    let s = as_str(value, path)?;
    parse(s).ok_or_else(|| {
        ConfigError::schema(path, format!("must be one of {}", allowed.join(", ")))
    })
}
