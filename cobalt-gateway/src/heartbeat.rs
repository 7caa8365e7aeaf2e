//! Heartbeat bookkeeping.
//!
//! The shard's event loop owns the timer; this handler tracks acknowledgment
//! state and round-trip latency. The gateway considers a connection zombied
//! when two consecutive heartbeats go unacknowledged.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Consecutive unacknowledged heartbeats tolerated before closing the socket.
pub const MAX_MISSED_ACKS: u32 = 2;

/// Tracks heartbeat acknowledgment and latency for one shard.
#[derive(Debug)]
pub struct HeartbeatHandler {
    interval_ms: AtomicU64,
    last_heartbeat: RwLock<Instant>,
    last_rtt_ms: AtomicU64, // u64::MAX = None
    ack_received: AtomicBool,
    missed_acks: AtomicU32,
}

impl HeartbeatHandler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: AtomicU64::new(interval.as_millis() as u64),
            last_heartbeat: RwLock::new(Instant::now()),
            last_rtt_ms: AtomicU64::new(u64::MAX),
            ack_received: AtomicBool::new(true),
            missed_acks: AtomicU32::new(0),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Acquire))
    }

    pub fn set_interval(&self, interval: Duration) {
        self.interval_ms
            .store(interval.as_millis() as u64, Ordering::Release);
    }

    /// Reset state for a fresh connection.
    pub fn reset(&self) {
        self.ack_received.store(true, Ordering::SeqCst);
        self.missed_acks.store(0, Ordering::SeqCst);
        *self.last_heartbeat.write() = Instant::now();
    }

    /// Record that a heartbeat was just sent.
    pub fn mark_sent(&self) {
        self.ack_received.store(false, Ordering::SeqCst);
        *self.last_heartbeat.write() = Instant::now();
    }

    /// Record an acknowledgment from the server.
    pub fn mark_acked(&self) {
        let now = Instant::now();
        let last = *self.last_heartbeat.read();
        let rtt = now.duration_since(last);

        self.ack_received.store(true, Ordering::SeqCst);
        self.missed_acks.store(0, Ordering::SeqCst);
        self.last_rtt_ms
            .store(rtt.as_millis() as u64, Ordering::Release);
    }

    pub fn is_acked(&self) -> bool {
        self.ack_received.load(Ordering::SeqCst)
    }

    /// Called at each timer tick when the previous beat is still unacked.
    /// Returns the updated consecutive-miss count.
    pub fn record_miss(&self) -> u32 {
        self.missed_acks.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether the connection should be treated as a zombie.
    pub fn is_zombied(&self) -> bool {
        self.missed_acks.load(Ordering::SeqCst) >= MAX_MISSED_ACKS
    }

    /// Last measured heartbeat round-trip time.
    pub fn latency(&self) -> Option<Duration> {
        let ms = self.last_rtt_ms.load(Ordering::Acquire);
        if ms == u64::MAX {
            None
        } else {
            Some(Duration::from_millis(ms))
        }
    }
}

impl Default for HeartbeatHandler {
    fn default() -> Self {
        Self::new(Duration::from_millis(45000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_miss_is_tolerated_second_is_not() {
        let handler = HeartbeatHandler::default();
        handler.mark_sent();

        assert!(!handler.is_acked());
        assert_eq!(handler.record_miss(), 1);
        assert!(!handler.is_zombied());

        handler.mark_sent();
        assert_eq!(handler.record_miss(), 2);
        assert!(handler.is_zombied());
    }

    #[test]
    fn ack_clears_miss_count() {
        let handler = HeartbeatHandler::default();
        handler.mark_sent();
        handler.record_miss();

        handler.mark_acked();
        assert!(handler.is_acked());
        assert!(!handler.is_zombied());
        assert!(handler.latency().is_some());
    }

    #[test]
    fn reset_restores_fresh_state() {
        let handler = HeartbeatHandler::default();
        handler.mark_sent();
        handler.record_miss();
        handler.record_miss();
        assert!(handler.is_zombied());

        handler.reset();
        assert!(handler.is_acked());
        assert!(!handler.is_zombied());
    }
}
