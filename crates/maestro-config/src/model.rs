//! Configuration model types.
//!
//! `RawConfig` mirrors the maestro.yaml document as validated by the schema
//! walk; `LoadedConfig` is the fully-resolved form with every optional field
//! defaulted and the active role set computed. `LoadedConfig` is built once
//! per run and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Deployment environment a stack provisions into.
///
/// Also the key space of `pulumi.stacks`; any other key is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackName {
    Dev,
    Staging,
    Prod,
}

impl StackName {
    pub const ALL: [StackName; 3] = [StackName::Dev, StackName::Staging, StackName::Prod];

    pub fn as_str(&self) -> &'static str {
        match self {
            StackName::Dev => "dev",
            StackName::Staging => "staging",
            StackName::Prod => "prod",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|n| n.as_str() == s)
    }
}

impl fmt::Display for StackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability tag on a server; gates which configuration-management work runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Backend,
    Web,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Backend, Role::Web];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Backend => "backend",
            Role::Web => "web",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.as_str() == s)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-command forwarded to the infrastructure-provisioning tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PulumiCommand {
    Up,
    Refresh,
    Cancel,
    Output,
}

impl PulumiCommand {
    pub const ALL: [PulumiCommand; 4] = [
        PulumiCommand::Up,
        PulumiCommand::Refresh,
        PulumiCommand::Cancel,
        PulumiCommand::Output,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PulumiCommand::Up => "up",
            PulumiCommand::Refresh => "refresh",
            PulumiCommand::Cancel => "cancel",
            PulumiCommand::Output => "output",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for PulumiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a static web site comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaticSource {
    Local,
    Image,
}

impl StaticSource {
    pub const ALL: [StaticSource; 2] = [StaticSource::Local, StaticSource::Image];

    pub fn as_str(&self) -> &'static str {
        match self {
            StaticSource::Local => "local",
            StaticSource::Image => "image",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s2| s2.as_str() == s)
    }
}

impl fmt::Display for StaticSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secrets-manager backend. `bws` is the only supported provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretsProvider {
    Bws,
}

impl SecretsProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretsProvider::Bws => "bws",
        }
    }
}

impl fmt::Display for SecretsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// Raw config (as validated from YAML)
// ============================================

/// A single server declaration inside a stack.
///
/// Serialized as-is into `PULUMI_SERVERS_JSON` for the provisioning tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub roles: Vec<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackConfig {
    pub servers: Vec<ServerConfig>,
}

#[derive(Debug, Clone, Default)]
pub struct RawPulumi {
    pub enabled: Option<bool>,
    pub command: Option<PulumiCommand>,
    pub cloudflare_account_id: Option<String>,
    pub ssh_port: Option<u16>,
    /// Declaration order is preserved; provisioning and host merging follow it.
    pub stacks: Vec<(StackName, StackConfig)>,
}

#[derive(Debug, Clone)]
pub struct RawWebStatic {
    pub source: StaticSource,
    pub dir: Option<String>,
    pub build: Option<String>,
    pub dist: Option<String>,
    pub image: Option<String>,
    pub tag: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RawWebDocker {
    pub image: String,
    pub tag: String,
    pub port: Option<u16>,
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawWeb {
    pub static_site: Option<RawWebStatic>,
    pub docker: Option<RawWebDocker>,
}

#[derive(Debug, Clone)]
pub struct RawBackend {
    pub image: String,
    pub tag: String,
    pub port: Option<u16>,
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawAnsible {
    pub enabled: Option<bool>,
    pub groups: Option<Vec<String>>,
    pub web: Option<RawWeb>,
    pub backend: Option<RawBackend>,
}

#[derive(Debug, Clone, Default)]
pub struct RawSecrets {
    pub provider: Option<SecretsProvider>,
    pub project_id: Option<String>,
    pub required_vars: Vec<String>,
}

/// The as-validated configuration tree, before defaults.
#[derive(Debug, Clone)]
pub struct RawConfig {
    pub domain: String,
    pub pulumi: Option<RawPulumi>,
    pub ansible: Option<RawAnsible>,
    pub secrets: Option<RawSecrets>,
}

// ============================================
// Loaded config (defaults applied)
// ============================================

#[derive(Debug, Clone, Serialize)]
pub struct PulumiSettings {
    pub enabled: bool,
    pub command: PulumiCommand,
    #[serde(rename = "cloudflareAccountId")]
    pub cloudflare_account_id: String,
    #[serde(rename = "sshPort")]
    pub ssh_port: u16,
    pub stacks: Vec<(StackName, StackConfig)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebStaticSettings {
    pub source: StaticSource,
    pub dir: String,
    pub build: String,
    pub dist: String,
    pub image: String,
    pub tag: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebDockerSettings {
    pub image: String,
    pub tag: String,
    pub port: u16,
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WebSettings {
    #[serde(rename = "static", skip_serializing_if = "Option::is_none")]
    pub static_site: Option<WebStaticSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker: Option<WebDockerSettings>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackendSettings {
    pub image: String,
    pub tag: String,
    pub port: u16,
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnsibleSettings {
    pub enabled: bool,
    pub groups: Vec<String>,
    pub web: WebSettings,
    pub backend: BackendSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecretsSettings {
    pub provider: SecretsProvider,
    #[serde(rename = "projectId")]
    pub project_id: String,
    #[serde(rename = "requiredVars")]
    pub required_vars: Vec<String>,
}

/// The fully-resolved configuration: every optional field defaulted and the
/// active role set computed as the union over every server in every stack.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedConfig {
    pub domain: String,
    pub pulumi: PulumiSettings,
    pub ansible: AnsibleSettings,
    pub secrets: SecretsSettings,
    pub roles: BTreeSet<Role>,
}

impl LoadedConfig {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}
