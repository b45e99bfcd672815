use maestro_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnsibleError {
    #[error("Ansible command failed with exit code {code}")]
    CommandFailed { code: i32 },

    #[error("Failed to serialize Ansible inputs: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, AnsibleError>;
