//! Core plumbing for Maestro.
//!
//! Subprocess invocation, Bitwarden secret fetching, the SSH key temp-file
//! guard, the host registry, and tunnel readiness probing. Everything here is
//! sequential by design: provisioning must happen in a deterministic,
//! auditable order, so there is no parallel fan-out anywhere.

pub mod error;
pub mod hosts;
pub mod keyfile;
pub mod process;
pub mod secrets;
pub mod tunnel;

pub use error::{CoreError, Result};
pub use hosts::{Host, HostList};
pub use keyfile::SshKeyFile;
pub use process::CapturedOutput;
pub use secrets::{SecretStore, fetch_bws_secrets};
pub use tunnel::TunnelProber;
