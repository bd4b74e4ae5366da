use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use hostwatch::agent::Agent;
use hostwatch::config::AgentConfig;
use hostwatch::host::{HostServices, SimulatedHost};
use hostwatch::kernel::event::{CallState, LockState, RawEvent};
use hostwatch::kernel::lifecycle::BootTrigger;
use hostwatch::kernel::time::{Clock, SystemClock};

// Entry point the simulated host recognises.
const CONSOLE_TOKEN: i64 = 1;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    tracing::info!("Hostwatch agent booting...");

    let config = AgentConfig::from_env()?;

    // Console-driven host: every domain granted, wall clock time.
    let host = Arc::new(SimulatedHost::new());
    host.grant_all();
    host.register_entry_point(CONSOLE_TOKEN);
    host.set_now(SystemClock.now().as_i64());

    let Agent { gateway, coordinator, mut reactor } = Agent::build(&config, HostServices::simulated(host.clone()))?;

    if !coordinator.on_boot(BootTrigger::HostBoot) {
        gateway.start_service(CONSOLE_TOKEN);
    }

    let shutdown = CancellationToken::new();
    let reactor_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { reactor.run(shutdown).await })
    };

    let mut push = gateway.subscribe();
    tokio::spawn(async move {
        loop {
            match push.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!("Unprintable push event: {}", e),
                },
                Err(RecvError::Lagged(n)) => tracing::warn!("Push printer lagged by {} event(s)", n),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let console_host = host.clone();
    tokio::spawn(async move {
        let clock = SystemClock;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("Commands: enter <pkg> | exit <pkg> | call <number> | sms <sender> <text> | lock | unlock");

        while let Ok(Some(line)) = lines.next_line().await {
            let now = clock.now().as_i64();
            console_host.set_now(now);
            let mut parts = line.trim().splitn(3, ' ');
            let delivered = match (parts.next(), parts.next(), parts.next()) {
                (Some("enter"), Some(pkg), _) => {
                    console_host.install(pkg, pkg);
                    console_host.usage_event(RawEvent::enter(pkg, now))
                }
                (Some("exit"), Some(pkg), _) => console_host.usage_event(RawEvent::exit(pkg, now)),
                (Some("call"), Some(number), _) => console_host.call_state(CallState::Ringing, number, now),
                (Some("sms"), Some(sender), body) => console_host.message_arrived(sender, body.unwrap_or(""), now),
                (Some("lock"), _, _) => console_host.lock_state(LockState::Locked, now),
                (Some("unlock"), _, _) => console_host.lock_state(LockState::Unlocked, now),
                (Some(""), _, _) | (None, _, _) => continue,
                _ => {
                    tracing::warn!("Unknown console command: '{}'", line);
                    continue;
                }
            };
            tracing::debug!("Console event delivered: {}", delivered);
        }
    });

    tracing::info!("Hostwatch active. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    gateway.stop_service();
    shutdown.cancel();
    reactor_task.await?;
    tracing::info!("Hostwatch stopped.");
    Ok(())
}
