use std::io::{self, BufRead, Write};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use hostwatch::host::{HostError, LabelResolver};
use hostwatch::kernel::event::RawEvent;
use hostwatch::kernel::session::SessionReconstructor;

/// Offline replays have no package manager; the package id doubles as label.
struct PackageIdLabels;

impl LabelResolver for PackageIdLabels {
    fn display_name(&self, package: &str) -> Result<String, HostError> {
        Ok(package.to_string())
    }
}

/// Reads JSON-lines RawEvents from stdin and prints completed sessions as
/// JSON lines, in emission order.
fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut reconstructor = SessionReconstructor::new();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut emitted = 0usize;

    for (n, line) in io::stdin().lock().lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: RawEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Skipping line {}: {}", n + 1, e);
                continue;
            }
        };
        if let Some(record) = reconstructor.ingest(&event, &PackageIdLabels) {
            writeln!(out, "{}", serde_json::to_string(&record)?)?;
            emitted += 1;
        }
    }

    tracing::info!(
        "Replay finished: {} session(s), {} left open and discarded",
        emitted,
        reconstructor.flush()
    );
    Ok(())
}
