//!
//! fatecraft shell
//! ---------------
//! Interactive front-end over the identity core: sign in as a citizen,
//! industry or government user and move between the role-gated views.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use fatecraft::cli::{Outcome, Shell, HELP};
use fatecraft::config::{Config, StorageKind};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--state-dir <path>] [--memory]\n\nFlags:\n  --state-dir <path>   Directory for the persisted session (env FATECRAFT_STATE_DIR, default .fatecraft)\n  --memory             Keep the session in memory only\n  -h, --help           Show this help\n\nEnvironment:\n  FATECRAFT_SIGNIN_DELAY_MS, FATECRAFT_SIGNOUT_DELAY_MS   simulated provider latency\n  FATECRAFT_AUTH_TIMEOUT_MS                               provider timeout (0 = none)\n  FATECRAFT_STORAGE                                       file | memory (default file)\n  RUST_LOG                                                log filter (default info)\n\n{HELP}"
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let argv: Vec<String> = std::env::args().collect();
    let program = argv.first().cloned().unwrap_or_else(|| "fatecraft".into());
    let args = argv.get(1..).unwrap_or_default();
    let mut state_dir: Option<PathBuf> = None;
    let mut memory = false;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--state-dir" => {
                let Some(v) = args.get(i + 1) else {
                    print_usage(&program);
                    bail!("--state-dir requires a value");
                };
                state_dir = Some(PathBuf::from(v));
                i += 2;
            }
            "--memory" => { memory = true; i += 1; }
            "-h" | "--help" => { print_usage(&program); return Ok(()); }
            other => {
                print_usage(&program);
                bail!("unknown argument '{}'", other);
            }
        }
    }

    // --state-dir wins over FATECRAFT_STATE_DIR; everything else still comes from the environment
    let mut cfg = Config::from_vars(|k| match (k, &state_dir) {
        ("FATECRAFT_STATE_DIR", Some(dir)) => Some(dir.to_string_lossy().into_owned()),
        _ => std::env::var(k).ok(),
    })?;
    if memory { cfg.storage = StorageKind::Memory; }
    info!(
        target: "fatecraft",
        "FateCraft starting: state_dir='{}', storage={:?}, sign_in_delay_ms={}, auth_timeout_ms={:?}",
        cfg.state_dir.display(), cfg.storage, cfg.sign_in_delay_ms, cfg.auth_timeout_ms
    );

    let store = Arc::new(cfg.build_store()?);
    let _events = store.subscribe(|event, session| match session {
        Some(s) => println!("[{}] {} <{}> as {}", event, s.user().display_name(), s.user().email(), s.role()),
        None => println!("[{}]", event),
    });
    let shell = Shell::new(store);

    let mut rl = DefaultEditor::new()?;
    println!("FateCraft shell. Type 'help' for commands.");
    loop {
        match rl.readline("fatecraft> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() { continue; }
                let _ = rl.add_history_entry(line);
                match shell.execute(line).await {
                    Ok(Outcome::Continue(out)) => println!("{}", out),
                    Ok(Outcome::Quit) => break,
                    Err(e) => eprintln!("error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
