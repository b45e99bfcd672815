use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Config file not found at {path}\nCreate a maestro.yaml file. See example.maestro.yaml for a template."
    )]
    NotFound { path: PathBuf },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {path}: {message}")]
    Schema { path: String, message: String },

    #[error("Invalid configuration: {0}")]
    Semantic(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Schema {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
