//! Console shell for Make It Meme, backed by the in-process store.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use makeitmeme_client::commands::{UiCommand, HELP};
use makeitmeme_client::{App, ClientConfig};
use makeitmeme_shared::constants::APP_NAME;
use makeitmeme_store::MemoryBackend;

/// How long writes in progress get to finish on quit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("makeitmeme_client=debug,makeitmeme_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting {APP_NAME} v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    let backend = MemoryBackend::new();
    let mut app = App::new(
        config,
        backend.auth.clone(),
        backend.store.clone(),
        backend.files.clone(),
    );
    app.start();
    app.settle();
    println!("{}", app.render());
    println!("Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match line.parse::<UiCommand>() {
                    Ok(UiCommand::Quit) => break,
                    Ok(UiCommand::Help) => {
                        println!("{HELP}");
                        continue;
                    }
                    Ok(command) => {
                        // The failure is part of the rendered frame. Writes
                        // report back through `next_event`.
                        let _ = app.handle(command).await;
                    }
                    Err(e) => {
                        println!("! {e}");
                        continue;
                    }
                }
                println!("{}", app.render());
            }
            Some(event) = app.next_event() => {
                app.apply(event);
                app.settle();
                println!("{}", app.render());
            }
        }
    }

    if app.pending_writes() > 0 {
        info!(pending = app.pending_writes(), "Waiting for outstanding writes");
        if tokio::time::timeout(SHUTDOWN_GRACE, app.drain_writes())
            .await
            .is_err()
        {
            warn!(pending = app.pending_writes(), "Writes still pending at exit");
        }
    }
    app.shutdown();
    info!("Bye");
    Ok(())
}
