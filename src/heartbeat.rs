//! Heartbeat timer
//!
//! Actor bracketing the background lifetime: `background.start` spawns one
//! emitting task per heartbeat topic, `background.end` stops them. Payloads
//! carry the milliseconds elapsed since the start.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::bus::{Actor, HandlerError, Mailbox};
use crate::message::Payload;
use crate::topics;

/// Error raised for non-positive heartbeat periods
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPeriod;

impl std::fmt::Display for InvalidPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Heartbeat periods must be positive")
    }
}

impl std::error::Error for InvalidPeriod {}

/// The three heartbeat periods. Configurable so tests run in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Periods {
    minute: Duration,
    quarter_of_hour: Duration,
    hour: Duration,
}

impl Periods {
    pub fn new(
        minute: Duration,
        quarter_of_hour: Duration,
        hour: Duration,
    ) -> Result<Self, InvalidPeriod> {
        if minute.is_zero() || quarter_of_hour.is_zero() || hour.is_zero() {
            return Err(InvalidPeriod);
        }
        Ok(Self {
            minute,
            quarter_of_hour,
            hour,
        })
    }
}

impl Default for Periods {
    fn default() -> Self {
        Self {
            minute: Duration::from_secs(60),
            quarter_of_hour: Duration::from_secs(15 * 60),
            hour: Duration::from_secs(60 * 60),
        }
    }
}

/// Actor emitting `heartbeat.*` topics while the background is running.
pub struct Timer {
    mailbox: Mailbox,
    periods: Periods,
    tasks: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl Timer {
    pub fn new(periods: Periods) -> Self {
        Self {
            mailbox: Mailbox::new(),
            periods,
            tasks: Mutex::new(Vec::new()),
        }
    }

    fn start(&self) -> Result<(), HandlerError> {
        let mut tasks = self.tasks.lock().unwrap();
        if !tasks.is_empty() {
            tracing::warn!("Heartbeat already running");
            return Ok(());
        }

        let bus = self.mailbox.bus().ok_or(crate::bus::BusError::NotBound)?;
        let started = Instant::now();
        let beats = [
            (self.periods.minute, topics::HEARTBEAT_MINUTE),
            (self.periods.quarter_of_hour, topics::HEARTBEAT_QUARTER_OF_HOUR),
            (self.periods.hour, topics::HEARTBEAT_HOUR),
        ];

        for (period, topic) in beats {
            let bus = bus.clone();
            tasks.push(tokio::spawn(async move {
                let first = tokio::time::Instant::now() + period;
                let mut interval = tokio::time::interval_at(first, period);
                loop {
                    interval.tick().await;
                    let elapsed = started.elapsed().as_millis() as u64;
                    if let Err(error) = bus.fire(topic, Payload::Elapsed(elapsed)) {
                        tracing::error!(topic = %topic, error = %error, "Heartbeat fire failed");
                    }
                }
            }));
        }

        tracing::info!("Heartbeat started");
        Ok(())
    }

    fn stop(&self) {
        let mut tasks = self.tasks.lock().unwrap();
        if tasks.is_empty() {
            return;
        }
        for task in tasks.drain(..) {
            task.abort();
        }
        tracing::info!("Heartbeat stopped");
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[async_trait]
impl Actor for Timer {
    fn name(&self) -> &'static str {
        "timer"
    }

    fn topics(&self) -> &'static [&'static str] {
        &[topics::BACKGROUND_START, topics::BACKGROUND_END]
    }

    fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    async fn handle(&self, topic: &str, _data: Payload) -> Result<Option<Payload>, HandlerError> {
        match topic {
            topics::BACKGROUND_START => self.start()?,
            topics::BACKGROUND_END => self.stop(),
            _ => {}
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::bus::ActorBus;

    use super::*;

    fn fast_periods() -> Periods {
        Periods::new(
            Duration::from_millis(20),
            Duration::from_millis(55),
            Duration::from_millis(200),
        )
        .unwrap()
    }

    #[test]
    fn test_zero_period_is_rejected() {
        let result = Periods::new(
            Duration::ZERO,
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        assert_eq!(result, Err(InvalidPeriod));
    }

    #[tokio::test]
    async fn test_heartbeats_carry_elapsed_time() {
        let registry = ActorBus::new();
        registry.register(Arc::new(Timer::new(fast_periods()))).unwrap();

        let minutes = Arc::new(AtomicUsize::new(0));
        let quarters = Arc::new(AtomicUsize::new(0));
        {
            let minutes = minutes.clone();
            registry
                .bus()
                .add_listener(
                    topics::HEARTBEAT_MINUTE,
                    Arc::new(move |_, data, _| {
                        assert!(matches!(data, Payload::Elapsed(_)));
                        minutes.fetch_add(1, Ordering::SeqCst);
                    }),
                )
                .unwrap();
            let quarters = quarters.clone();
            registry
                .bus()
                .add_listener(
                    topics::HEARTBEAT_QUARTER_OF_HOUR,
                    Arc::new(move |_, _, _| {
                        quarters.fetch_add(1, Ordering::SeqCst);
                    }),
                )
                .unwrap();
        }

        registry
            .bus()
            .fire(topics::BACKGROUND_START, Payload::None)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(minutes.load(Ordering::SeqCst) >= 3);
        assert!(quarters.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_end_stops_the_beats() {
        let registry = ActorBus::new();
        registry.register(Arc::new(Timer::new(fast_periods()))).unwrap();

        let minutes = Arc::new(AtomicUsize::new(0));
        {
            let minutes = minutes.clone();
            registry
                .bus()
                .add_listener(
                    topics::HEARTBEAT_MINUTE,
                    Arc::new(move |_, _, _| {
                        minutes.fetch_add(1, Ordering::SeqCst);
                    }),
                )
                .unwrap();
        }

        registry
            .bus()
            .fire(topics::BACKGROUND_START, Payload::None)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        registry
            .bus()
            .fire(topics::BACKGROUND_END, Payload::None)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let after_end = minutes.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(minutes.load(Ordering::SeqCst), after_end);
    }

    #[tokio::test]
    async fn test_double_start_spawns_once() {
        let registry = ActorBus::new();
        let timer = Arc::new(Timer::new(fast_periods()));
        registry.register(timer.clone()).unwrap();

        registry
            .bus()
            .fire(topics::BACKGROUND_START, Payload::None)
            .unwrap();
        registry
            .bus()
            .fire(topics::BACKGROUND_START, Payload::None)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(timer.tasks.lock().unwrap().len(), 3);
        registry
            .bus()
            .fire(topics::BACKGROUND_END, Payload::None)
            .unwrap();
    }
}
