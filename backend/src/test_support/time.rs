//! Controllable time for coordination loop tests.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;
use tokio::sync::watch;

use crate::domain::CoordinationSleeper;

/// Clock whose current time only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => {
                panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}")
            }
        };
        *self.lock_clock() += delta;
    }

    pub fn advance_seconds(&self, seconds: i64) {
        *self.lock_clock() += TimeDelta::seconds(seconds);
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Sleeper that returns immediately, records every requested delay and can
/// drive a [`MutableClock`] and a shutdown signal.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
    clock: Option<Arc<MutableClock>>,
    stop: Option<(usize, watch::Sender<bool>)>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance `clock` by each requested delay.
    pub fn advancing(mut self, clock: Arc<MutableClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Signal shutdown on `shutdown` once `sleeps` delays have been recorded.
    pub fn stop_after(mut self, sleeps: usize, shutdown: watch::Sender<bool>) -> Self {
        self.stop = Some((sleeps, shutdown));
        self
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.lock_delays().clone()
    }

    fn lock_delays(&self) -> MutexGuard<'_, Vec<Duration>> {
        match self.delays.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("sleeper mutex"),
        }
    }
}

#[async_trait]
impl CoordinationSleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        let recorded = {
            let mut delays = self.lock_delays();
            delays.push(duration);
            delays.len()
        };
        if let Some(clock) = &self.clock {
            clock.advance(duration);
        }
        if let Some((limit, shutdown)) = &self.stop {
            if recorded >= *limit {
                shutdown.send_replace(true);
            }
        }
    }
}
