//! Fixed-interval external IP poller
//!
//! The Poller is responsible for:
//! - Fetching the external IP once per interval via IpSource
//! - Comparing it to the last observed IP held in memory
//! - Driving the Reconciler when the IP changed
//! - Recording the new IP only after reconciliation succeeded
//!
//! ## Cycle
//!
//! ```text
//! ┌─────────────┐   IpAddr   ┌──────────────┐  changed   ┌──────────────┐
//! │  IpSource   │──────────►│    Poller     │──────────►│  Reconciler  │
//! └─────────────┘            │ (observed_ip) │◄──────────│              │
//!                            └──────────────┘   Ok/Err   └──────────────┘
//!                                   │
//!                                   ▼
//!                             sleep(interval)
//! ```
//!
//! A failed fetch or a failed reconciliation leaves the observed IP as it was,
//! so the next cycle tries again with whatever the source reports then.
//! There is no backoff and no jitter.

use crate::config::PollerConfig;
use crate::error::Result;
use crate::reconciler::{ReconcileReport, Reconciler};
use crate::traits::{ChatChannel, IpSource};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Events emitted by the Poller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerEvent {
    /// Poller loop started
    Started {
        channel_id: String,
        interval: Duration,
    },

    /// External IP could not be fetched this cycle
    FetchFailed { error: String },

    /// Fetched IP equals the observed IP
    Unchanged { ip: IpAddr },

    /// Fetched IP differs from the observed IP (or none was observed yet)
    ChangeDetected {
        previous_ip: Option<IpAddr>,
        new_ip: IpAddr,
    },

    /// Channel reconciled and observed IP updated
    Reconciled {
        new_ip: IpAddr,
        report: ReconcileReport,
    },

    /// Reconciliation failed, observed IP kept
    ReconcileFailed { new_ip: IpAddr, error: String },

    /// Poller loop stopped
    Stopped { reason: String },
}

/// Outcome of a single poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Fetch failed, nothing else was attempted
    FetchFailed { error: String },
    /// IP unchanged, nothing else was attempted
    Unchanged { ip: IpAddr },
    /// IP changed and the channel now reflects it
    Reconciled {
        previous_ip: Option<IpAddr>,
        new_ip: IpAddr,
        report: ReconcileReport,
    },
    /// IP changed but the channel could not be brought in line
    ReconcileFailed { new_ip: IpAddr, error: String },
}

/// Fixed-interval poller
///
/// ## Lifecycle
///
/// 1. Create with [`Poller::new()`]
/// 2. Spawn [`Poller::run()`] on a background task
/// 3. The loop runs until the process exits; it is never joined
///
/// ## State
///
/// The observed IP lives in the Poller itself and is only written from the
/// task that runs it, so no synchronization is involved.
pub struct Poller {
    /// Source of the external IP
    ip_source: Box<dyn IpSource>,

    /// Reconciler for the target channel
    reconciler: Reconciler,

    /// Target channel
    channel_id: String,

    /// Delay between cycles
    interval: Duration,

    /// Last IP the channel was successfully reconciled to
    observed_ip: Option<IpAddr>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<PollerEvent>,
}

impl Poller {
    /// Create a new poller
    ///
    /// # Returns
    ///
    /// A tuple of (poller, event_receiver) where event_receiver yields poller events.
    /// The receiver may be dropped if nobody is interested.
    pub fn new(
        ip_source: Box<dyn IpSource>,
        channel: Arc<dyn ChatChannel>,
        config: PollerConfig,
    ) -> Result<(Self, mpsc::Receiver<PollerEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let poller = Self {
            ip_source,
            reconciler: Reconciler::new(channel),
            channel_id: config.channel_id,
            interval: config.interval,
            observed_ip: None,
            event_tx: tx,
        };

        Ok((poller, rx))
    }

    /// Last IP the channel was successfully reconciled to
    pub fn observed_ip(&self) -> Option<IpAddr> {
        self.observed_ip
    }

    /// Run the poll loop forever
    ///
    /// Every failure is handled inside the cycle, so this never returns.
    pub async fn run(mut self) {
        self.run_internal(None).await
    }

    /// Run the poll loop until `shutdown_rx` fires or its sender is dropped
    ///
    /// The shutdown signal is only observed between cycles; a cycle that has
    /// started always runs to completion.
    pub async fn run_with_shutdown(&mut self, shutdown_rx: oneshot::Receiver<()>) {
        self.run_internal(Some(shutdown_rx)).await
    }

    async fn run_internal(&mut self, shutdown_rx: Option<oneshot::Receiver<()>>) {
        info!(
            "Polling {} every {:?} for channel {}",
            self.ip_source.source_name(),
            self.interval,
            self.channel_id
        );
        self.emit_event(PollerEvent::Started {
            channel_id: self.channel_id.clone(),
            interval: self.interval,
        });

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(shutdown);

        loop {
            self.poll_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = &mut shutdown => {
                    info!("Poller shutdown signal received");
                    self.emit_event(PollerEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }
    }

    /// Run exactly one fetch/compare/reconcile cycle
    pub async fn poll_once(&mut self) -> CycleOutcome {
        let new_ip = match self.ip_source.fetch().await {
            Ok(ip) => ip,
            Err(e) => {
                warn!(
                    "Error fetching external IP from {}: {}",
                    self.ip_source.source_name(),
                    e
                );
                let error = e.to_string();
                self.emit_event(PollerEvent::FetchFailed {
                    error: error.clone(),
                });
                return CycleOutcome::FetchFailed { error };
            }
        };

        if self.observed_ip == Some(new_ip) {
            debug!("External IP unchanged: {}", new_ip);
            self.emit_event(PollerEvent::Unchanged { ip: new_ip });
            return CycleOutcome::Unchanged { ip: new_ip };
        }

        let previous_ip = self.observed_ip;
        info!(
            "IP changed from {} to {}",
            previous_ip
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| "<none>".to_string()),
            new_ip
        );
        self.emit_event(PollerEvent::ChangeDetected {
            previous_ip,
            new_ip,
        });

        match self.reconciler.reconcile(&self.channel_id, new_ip).await {
            Ok(report) => {
                self.observed_ip = Some(new_ip);
                self.emit_event(PollerEvent::Reconciled {
                    new_ip,
                    report: report.clone(),
                });
                CycleOutcome::Reconciled {
                    previous_ip,
                    new_ip,
                    report,
                }
            }
            Err(e) => {
                error!(
                    "Error updating channel {} to {}: {} (will retry next interval)",
                    self.channel_id, new_ip, e
                );
                let error = e.to_string();
                self.emit_event(PollerEvent::ReconcileFailed {
                    new_ip,
                    error: error.clone(),
                });
                CycleOutcome::ReconcileFailed { new_ip, error }
            }
        }
    }

    /// Emit a poller event
    fn emit_event(&self, event: PollerEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
