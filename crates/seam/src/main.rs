//! seam: a terminal multiplexer.
//!
//! One binary, two roles. Invoked normally it is the thin client: it
//! connects to (or starts) the server and relays the protocol. With the
//! internal `--server` flag it becomes the daemon that owns the sessions.

mod cli;
mod client;

use std::process::ExitCode;

use anyhow::{Context, Result};

use cli::Cli;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match Cli::parse(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("seam: {e}");
            return ExitCode::from(1);
        }
    };

    if cli.version {
        println!("seam {VERSION}");
        return ExitCode::SUCCESS;
    }

    let result = if cli.server_mode {
        run_server(&cli).map(|()| 0)
    } else {
        client::run(&cli)
    };

    match result {
        Ok(code) => ExitCode::from(code.clamp(0, 255) as u8),
        Err(e) => {
            eprintln!("seam: {e:#}");
            ExitCode::from(1)
        }
    }
}

/// The daemon role: set up logging, bind the socket, run the loop.
fn run_server(cli: &Cli) -> Result<()> {
    let socket_path = cli.resolve_socket();

    // The server logs beside its socket, never to a terminal.
    let log_path = socket_path.with_extension("log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("opening {}", log_path.display()))?;
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Arc::new(log_file))
        .with_ansi(false)
        .init();

    // Detach from the invoking terminal's session.
    let _ = rustix::process::setsid();

    tracing::info!(socket = %socket_path.display(), version = VERSION, "server starting");
    let mut server = seam_server::Server::new(socket_path.clone());
    let mut event_loop = seam_server::EventLoop::bind(&socket_path)
        .with_context(|| format!("binding {}", socket_path.display()))?;
    event_loop
        .run(&mut server)
        .context("event loop failed")?;
    tracing::info!("server exiting");
    Ok(())
}
