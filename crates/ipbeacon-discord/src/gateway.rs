// Gateway half of the Discord channel: the persistent websocket session
// that `open` starts and `close` tears down.

use ipbeacon_core::{Error, Result};
use serenity::async_trait;
use serenity::client::{Client, Context, EventHandler};
use serenity::gateway::ShardManager;
use serenity::model::gateway::{GatewayIntents, Ready};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How long `open` waits for the gateway READY event
pub(crate) const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// How long `close` waits for the shard runner to exit
pub(crate) const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// The bot only writes through REST; no privileged intents needed.
fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
}

/// Signals the first READY back to `connect`
struct ReadyHandler {
    ready_tx: Mutex<Option<oneshot::Sender<String>>>,
}

#[async_trait]
impl EventHandler for ReadyHandler {
    async fn ready(&self, _: Context, ready: Ready) {
        debug!("Gateway ready as {}", ready.user.name);
        let sender = match self.ready_tx.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(tx) = sender {
            let _ = tx.send(ready.user.name.clone());
        }
    }
}

/// A running gateway client
pub(crate) struct GatewaySession {
    shard_manager: Arc<ShardManager>,
    runner: JoinHandle<serenity::Result<()>>,
}

impl GatewaySession {
    /// Start the gateway and wait for READY
    pub(crate) async fn connect(token: &str) -> Result<Self> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let handler = ReadyHandler {
            ready_tx: Mutex::new(Some(ready_tx)),
        };

        let mut client = Client::builder(token, intents())
            .event_handler(handler)
            .await
            .map_err(|e| Error::connection(format!("Failed to build Discord client: {}", e)))?;

        let shard_manager = client.shard_manager.clone();
        let runner = tokio::spawn(async move { client.start().await });

        match tokio::time::timeout(READY_TIMEOUT, ready_rx).await {
            Ok(Ok(_)) => Ok(Self {
                shard_manager,
                runner,
            }),
            // The handler was dropped: the client stopped before READY
            Ok(Err(_)) => {
                let reason = match wait_for_exit(runner, SHUTDOWN_TIMEOUT).await {
                    Ok(()) => "gateway closed before READY".to_string(),
                    Err(e) => e.to_string(),
                };
                Err(Error::connection(format!(
                    "Discord gateway failed to connect: {}",
                    reason
                )))
            }
            Err(_) => {
                shard_manager.shutdown_all().await;
                runner.abort();
                Err(Error::connection(format!(
                    "Timed out after {:?} waiting for Discord gateway",
                    READY_TIMEOUT
                )))
            }
        }
    }

    /// Shut all shards down and wait for the runner to report
    pub(crate) async fn shutdown(self) -> Result<()> {
        self.shard_manager.shutdown_all().await;
        wait_for_exit(self.runner, SHUTDOWN_TIMEOUT).await
    }
}

/// Wait for a gateway runner task and map how it ended
pub(crate) async fn wait_for_exit(
    runner: JoinHandle<serenity::Result<()>>,
    limit: Duration,
) -> Result<()> {
    let abort = runner.abort_handle();
    match tokio::time::timeout(limit, runner).await {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(e))) => Err(Error::connection(format!("Discord gateway error: {}", e))),
        Ok(Err(e)) => Err(Error::connection(format!("Discord gateway task failed: {}", e))),
        Err(_) => {
            warn!("Discord gateway did not stop within {:?}, aborting", limit);
            abort.abort();
            Err(Error::connection(format!(
                "Discord gateway did not stop within {:?}",
                limit
            )))
        }
    }
}
