use maestro_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulumiError {
    #[error("Pulumi command failed with exit code {code}")]
    CommandFailed { code: i32 },

    #[error("Could not find Pulumi output markers in stdout")]
    OutputMarkersMissing,

    #[error("Failed to parse Pulumi hosts JSON: {0}")]
    HostPayload(serde_json::Error),

    #[error("Failed to serialize server list: {0}")]
    ServerList(serde_json::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, PulumiError>;
