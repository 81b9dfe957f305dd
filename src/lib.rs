pub mod contact;
pub mod server;
pub mod store;

use std::env::var_os;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub fn data_path_from_env() -> Result<PathBuf> {
    var_os("DATA_PATH")
        .map(Into::into)
        .context("Environment variable DATA_PATH not set")
}
