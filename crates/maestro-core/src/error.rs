use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("required command '{0}' not found in PATH")]
    CommandNotFound(String),

    #[error("BWS_ACCESS_TOKEN environment variable is required for Bitwarden Secrets Manager")]
    BwsTokenMissing,

    #[error("bws secret list failed: {0}")]
    SecretsFetch(String),

    #[error("Missing {0} from the bws response.")]
    MissingSecret(String),

    #[error("Tunnel {hostname} not reachable after {attempts} attempts.")]
    TunnelUnreachable { hostname: String, attempts: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
