mod cache;
mod calc;
mod config;
mod ipc;
mod model;
mod rank;
mod subjects;

use anyhow::{bail, Context};
use serde_json::json;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "RESULTD_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries the JSON protocol; logs go to stderr only.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn rules_path_from_args() -> anyhow::Result<Option<PathBuf>> {
    let mut args = std::env::args().skip(1);
    let mut path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--rules" => {
                let Some(p) = args.next() else {
                    bail!("--rules requires a path");
                };
                path = Some(PathBuf::from(p));
            }
            other => bail!("unknown argument: {}", other),
        }
    }
    Ok(path)
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli_rules = rules_path_from_args()?;
    let (rules, source) =
        config::RulesConfig::load(cli_rules).context("failed to load result rules")?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        rules = %source.describe(),
        "resultd ready"
    );

    let mut state = ipc::AppState::new(rules, source);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!(error = %e, "malformed request line");
                let _ = writeln!(
                    stdout,
                    "{}",
                    json!({
                        "ok": false,
                        "error": { "code": "bad_json", "message": e.to_string() }
                    })
                );
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    Ok(())
}
