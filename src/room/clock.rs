//! Room timer service.
//!
//! Timers never touch room state directly: a sleeper task posts a message
//! back onto the room's command channel and the room task handles it like
//! any other command. Cancellation is a `CancellationToken`; cancelling an
//! already-fired or already-cancelled timer is a no-op.
//!
//! Fires can race cancellation (the message may already be in the channel
//! when `cancel` runs), so every timer message carries a generation number
//! and the room task ignores stale generations.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Monotonic now, on tokio's clock so tests can pause and advance it.
pub fn now() -> tokio::time::Instant {
    tokio::time::Instant::now()
}

/// Cancel handle for a scheduled timer.
///
/// Dropping the handle does NOT cancel the timer; cancellation is always
/// explicit so a handle can be forgotten for fire-and-forget schedules.
#[derive(Debug)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    /// Idempotent: safe to call any number of times, before or after fire.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

/// Schedules `message` to be sent on `tx` after `delay`.
///
/// If the channel is closed by fire time the message is discarded -- the
/// room is gone and nobody is listening.
pub fn schedule<T: Send + 'static>(
    tx: mpsc::Sender<T>,
    delay: Duration,
    message: T,
) -> TimerHandle {
    let token = CancellationToken::new();
    let fired = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = fired.cancelled() => {}
            () = tokio::time::sleep(delay) => {
                let _ = tx.send(message).await;
            }
        }
    });
    TimerHandle { token }
}

/// Sends `make_message()` on `tx` every `period` until cancelled.
///
/// The first send happens one full period after scheduling. Missed ticks
/// are skipped rather than bursted, so a stalled room never receives a
/// backlog of countdown messages.
pub fn schedule_repeating<T, F>(tx: mpsc::Sender<T>, period: Duration, make_message: F) -> TimerHandle
where
    T: Send + 'static,
    F: Fn() -> T + Send + 'static,
{
    let token = CancellationToken::new();
    let ticking = token.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // interval's first tick completes immediately
        interval.tick().await;
        loop {
            tokio::select! {
                () = ticking.cancelled() => break,
                _ = interval.tick() => {
                    if tx.send(make_message()).await.is_err() {
                        break;
                    }
                }
            }
        }
    });
    TimerHandle { token }
}
