//! Named timers for phase measurement
//!
//! One registry belongs to one rank for one run and is handed to whoever
//! needs to time something. Misuse (double start, stop without start) is
//! logged and otherwise ignored so it can never change control flow.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// State of a single named timer
#[derive(Debug, Clone)]
pub struct TimerEntry {
    name: String,
    started_at: Option<Instant>,
    last_elapsed: Option<Duration>,
}

impl TimerEntry {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            started_at: None,
            last_elapsed: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Last recorded duration, if the timer was ever stopped
    pub fn last_elapsed(&self) -> Option<Duration> {
        self.last_elapsed
    }
}

/// Registry of named timers
#[derive(Debug, Default)]
pub struct TimingRegistry {
    timers: HashMap<String, TimerEntry>,
    /// Names in order of first start, for stable reports
    order: Vec<String>,
}

impl TimingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `name`. Returns false, leaving the running timer untouched, if
    /// it is already running.
    pub fn start(&mut self, name: &str) -> bool {
        if !self.timers.contains_key(name) {
            self.order.push(name.to_string());
        }

        let entry = self
            .timers
            .entry(name.to_string())
            .or_insert_with(|| TimerEntry::new(name));

        if entry.is_running() {
            tracing::warn!("Timer '{}' is already running", name);
            return false;
        }

        entry.started_at = Some(Instant::now());
        true
    }

    /// Stop `name` and return the elapsed time
    ///
    /// Stopping a timer that is not running logs a warning and returns zero.
    pub fn stop(&mut self, name: &str) -> Duration {
        match self.timers.get_mut(name) {
            Some(entry) => match entry.started_at.take() {
                Some(started) => {
                    let elapsed = started.elapsed();
                    entry.last_elapsed = Some(elapsed);
                    tracing::debug!("Timer '{}' stopped after {:?}", name, elapsed);
                    elapsed
                }
                None => {
                    tracing::warn!("Timer '{}' is not running", name);
                    Duration::ZERO
                }
            },
            None => {
                tracing::warn!("Timer '{}' is not running", name);
                Duration::ZERO
            }
        }
    }

    /// Last recorded duration of `name`, zero if it never completed
    pub fn elapsed(&self, name: &str) -> Duration {
        self.timers
            .get(name)
            .and_then(|entry| entry.last_elapsed)
            .unwrap_or(Duration::ZERO)
    }

    /// Last recorded duration in fractional milliseconds
    pub fn elapsed_ms(&self, name: &str) -> f64 {
        self.elapsed(name).as_secs_f64() * 1000.0
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.timers.get(name).is_some_and(|entry| entry.is_running())
    }

    pub fn entry(&self, name: &str) -> Option<&TimerEntry> {
        self.timers.get(name)
    }

    /// Completed timers in order of first start
    pub fn recorded(&self) -> Vec<(String, Duration)> {
        self.order
            .iter()
            .filter_map(|name| {
                self.timers
                    .get(name)
                    .and_then(|entry| entry.last_elapsed)
                    .map(|elapsed| (name.clone(), elapsed))
            })
            .collect()
    }
}
