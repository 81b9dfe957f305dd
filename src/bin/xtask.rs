use std::env::args;
use std::fs::create_dir_all;
use std::process::Command;

use anyhow::{anyhow, ensure, Result};

const DATA_PATH: &str = "data";

const CHECKS: &[(&str, &[&str])] = &[
    ("Rustfmt", &["fmt"]),
    ("Clippy", &["clippy", "--all-targets"]),
    ("Tests", &["test"]),
];

fn main() -> Result<()> {
    match args().nth(1).as_deref() {
        None => checks(),
        Some("server") => server(),
        Some(name) => Err(anyhow!("Unknown task {}", name)),
    }
}

fn checks() -> Result<()> {
    for (name, args) in CHECKS {
        cargo(name, args, &[])?;
    }

    Ok(())
}

fn server() -> Result<()> {
    create_dir_all(DATA_PATH)?;

    cargo("Server", &["run", "--bin", "server"], &server_envs())
}

fn server_envs() -> [(&'static str, &'static str); 4] {
    [
        ("DATA_PATH", DATA_PATH),
        ("BIND_ADDR", "127.0.0.1:8081"),
        ("REQUEST_LIMIT", "32"),
        ("RUST_LOG", "info,contact_book=debug,server=debug"),
    ]
}

fn cargo(name: &str, args: &[&str], envs: &[(&str, &str)]) -> Result<()> {
    let status = Command::new("cargo")
        .args(args)
        .envs(envs.iter().copied())
        .status()?;

    ensure!(status.success(), "{} failed with status {:?}", name, status);

    Ok(())
}
