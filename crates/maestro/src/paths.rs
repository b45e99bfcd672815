//! Fixed locations for the external run scripts, resolved relative to the
//! executable.

use anyhow::Context;
use std::path::{Path, PathBuf};

pub fn script_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("could not determine the executable path")?;
    Ok(exe
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf())
}

pub fn pulumi_script() -> anyhow::Result<PathBuf> {
    Ok(script_dir()?.join("pulumi").join("run.sh"))
}

pub fn ansible_script() -> anyhow::Result<PathBuf> {
    Ok(script_dir()?.join("ansible").join("run.sh"))
}
