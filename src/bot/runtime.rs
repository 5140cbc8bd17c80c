//! Event runtime - stdin and webhook runners.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::dispatcher::AppState;
use super::webhook::{WebhookState, start_webhook};
use crate::config::{Config, EventSource};
use crate::events::{EventReport, GatewayEvent, handle_event};

/// Run with the configured event source until the input ends or Ctrl+C.
pub async fn run(config: &Config, state: AppState) -> anyhow::Result<()> {
    match config.event_source {
        EventSource::Stdin => {
            info!("Reading events from stdin...");
            let reader = BufReader::new(tokio::io::stdin());
            run_lines(reader, state, |report| match serde_json::to_string(&report) {
                Ok(line) => println!("{}", line),
                Err(e) => error!("Failed to serialize report: {}", e),
            })
            .await
        }
        EventSource::Webhook => {
            info!("Starting webhook on port {}...", config.webhook_port);
            start_webhook(config.webhook_port, WebhookState::new(state, config.webhook_secret.clone())).await
        }
    }
}

/// Handle newline-delimited JSON events, one task per event.
///
/// Malformed lines are logged and skipped. In-flight events finish before
/// returning.
async fn run_lines<R, F>(reader: R, state: AppState, emit: F) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    F: Fn(EventReport) + Clone + Send + 'static,
{
    let mut lines = reader.lines();
    let mut tasks = JoinSet::new();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut shutdown => break,
        };

        let Some(line) = line else {
            debug!("Event input closed");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let event: GatewayEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!("Skipping malformed event: {}", e);
                continue;
            }
        };

        let state = state.clone();
        let emit = emit.clone();
        tasks.spawn(async move {
            match handle_event(&state, event).await {
                Ok(report) => emit(report),
                Err(e) => error!("Event handling failed: {:#}", e),
            }
        });

        // Reap finished tasks so the set does not grow unbounded.
        while tasks.try_join_next().is_some() {}
    }

    while tasks.join_next().await.is_some() {}
    info!("Event loop stopped");
    Ok(())
}

/// Resolves on Ctrl+C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;
    use crate::cache::MemoryCounterStore;
    use crate::database::models::{CensorPolicy, GuildPolicy};
    use crate::permissions::Owners;
    use crate::test_helpers::{MemoryStrikeStore, RecordingGateway, StaticPolicies};

    #[tokio::test]
    async fn test_run_lines_handles_every_event() {
        let mut policy = GuildPolicy::new("g");
        policy.censor_levels.insert(
            0,
            CensorPolicy {
                filter_invites: true,
                invite_blacklist: Some(vec!["discord.gg/x".to_string()]),
                ..Default::default()
            },
        );
        let strikes = Arc::new(MemoryStrikeStore::new());
        let state = AppState::new(
            Arc::new(StaticPolicies::new([policy])),
            strikes.clone(),
            Arc::new(MemoryCounterStore::new()),
            Arc::new(RecordingGateway::new()),
            Owners::new(Vec::new()),
            2,
            Duration::from_secs(1),
        );

        let input = [
            r#"{"type":"message_create","id":"1","guild_id":"g","channel_id":"c","author":{"id":"a"},"content":"discord.gg/x"}"#,
            "",
            "garbage",
            r#"{"type":"message_create","id":"2","guild_id":"g","channel_id":"c","author":{"id":"b"},"content":"hello"}"#,
            r#"{"type":"member_remove","guild_id":"g","actor_id":"m","target_id":"v","action":"kick"}"#,
        ]
        .join("\n");

        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();
        run_lines(input.as_bytes(), state, move |report| sink.lock().push(report))
            .await
            .unwrap();

        assert_eq!(reports.lock().len(), 3);
        assert_eq!(strikes.records().len(), 1);
    }
}
