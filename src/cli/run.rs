//! The long-running bot: connect, listen, post, shut down cleanly.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use banterbot::bus::MessageBus;
use banterbot::channels::{Channel, TelegramChannel};
use banterbot::providers::OpenAIProvider;
use banterbot::runtime::AgentContext;

use super::common::load_config_and_logging;

/// How long shutdown waits for the message in hand.
const LOOP_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) async fn cmd_run(path: &Path) -> Result<()> {
    let config = load_config_and_logging(path)?;
    config.validate().context("Invalid configuration")?;

    let provider =
        OpenAIProvider::from_config(&config.provider).context("Failed to create backend")?;
    info!(model = provider.model(), "Completion backend ready");

    let bus = Arc::new(MessageBus::new());
    let telegram = Arc::new(TelegramChannel::new(
        config.telegram.clone(),
        Arc::clone(&bus),
    ));
    telegram
        .start()
        .await
        .context("Failed to start Telegram channel")?;
    let identity = telegram
        .identity()
        .await
        .context("Failed to read bot identity")?;
    info!(
        id = identity.id.as_str(),
        handle = identity.handle().unwrap_or("<none>"),
        chat_id = config.monitor.chat_id.as_str(),
        "Connected"
    );

    let channel: Arc<dyn Channel> = telegram;
    let ctx = AgentContext::new(
        &config,
        identity,
        Arc::clone(&bus),
        Arc::new(provider),
        Arc::clone(&channel),
    );

    ctx.schedule.start();

    let inbound = Arc::new(ctx.inbound_loop());
    let runner = Arc::clone(&inbound);
    let mut loop_handle = tokio::spawn(async move { runner.run().await });

    tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
        result = &mut loop_handle => {
            // The loop only ends on its own if the bus closes or it panics
            match result {
                Ok(Ok(())) => warn!("Inbound loop exited unexpectedly"),
                Ok(Err(e)) => error!(error = %e, "Inbound loop failed"),
                Err(e) => error!(error = %e, "Inbound loop task failed"),
            }
        }
    }

    // No new scheduled posts, then no new inbound messages, then transport
    ctx.schedule.stop().await;
    inbound.stop();
    if !loop_handle.is_finished()
        && tokio::time::timeout(LOOP_DRAIN_TIMEOUT, &mut loop_handle)
            .await
            .is_err()
    {
        warn!("Inbound loop did not stop in time, aborting");
        loop_handle.abort();
    }
    if let Err(e) = channel.stop().await {
        warn!(error = %e, "Failed to stop Telegram channel");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
