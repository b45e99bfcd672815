//! Configuration validation for Maestro.
//!
//! Loads the maestro.yaml document, validates it against a closed schema
//! (unknown keys are rejected, enums are exact), derives the active role set,
//! runs cross-field semantic checks, and resolves every optional field to its
//! documented default.
//!
//! ```ignore
//! let path = maestro_config::find_config_file()?;
//! let config = maestro_config::load(&path)?;
//! if config.pulumi.enabled {
//!     // ...
//! }
//! ```

pub mod error;
mod loader;
mod model;
mod schema;

pub use error::{ConfigError, Result};
pub use loader::{load, load_str};
pub use model::*;

use std::path::PathBuf;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "MAESTRO_CONFIG";

/// Default config file name, resolved next to the executable.
pub const CONFIG_FILE_NAME: &str = "maestro.yaml";

/// Locate the maestro.yaml file.
///
/// Resolution order:
/// 1. `MAESTRO_CONFIG` environment variable (direct path)
/// 2. `maestro.yaml` next to the executable
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    let exe = std::env::current_exe()?;
    let dir = exe.parent().unwrap_or_else(|| std::path::Path::new("."));
    Ok(dir.join(CONFIG_FILE_NAME))
}
