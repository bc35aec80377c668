//! Completion Poller
//!
//! Samples a surface at a fixed interval until it reports itself closed,
//! bounded by a timeout and an explicit cancellation token.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::model::config::Config;

use super::error::IntegrationError;
use super::surface::SurfaceHandle;

#[derive(Debug, Clone, Copy)]
pub struct CompletionPoller {
    interval: Duration,
    timeout: Duration,
}

impl CompletionPoller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.poll_interval(), config.handshake_timeout())
    }

    /// Resolve once `surface` is closed
    ///
    /// The ticker is owned by this call and dropped on every exit path, so the
    /// recurring timer is released exactly once.
    pub async fn await_closure(
        &self,
        surface: &SurfaceHandle,
        cancel: &CancellationToken,
    ) -> Result<(), IntegrationError> {
        // `sleep` clamps deadlines past the timer's range instead of overflowing
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks: u64 = 0;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    tracing::info!(ticks, "Authorization wait cancelled");
                    return Err(IntegrationError::HandshakeCancelled);
                }
                _ = &mut deadline => {
                    tracing::warn!(ticks, timeout_secs = self.timeout.as_secs(), "Authorization window not closed in time");
                    return Err(IntegrationError::HandshakeTimeout {
                        secs: self.timeout.as_secs(),
                    });
                }
                _ = ticker.tick() => {
                    ticks += 1;
                    if surface.is_closed() {
                        tracing::debug!(ticks, "Authorization window closed");
                        return Ok(());
                    }
                }
            }
        }
    }
}
