//! CPU usage sampler.
//!
//! CPU usage is differential: a query has to stay open and be collected
//! before each read for the value to mean anything. The sampler owns that
//! query for its whole life.
//!
//! ```text
//! Uninitialized --initialize--> Ready --shutdown--> Closed
//!       |                                             ^
//!       +------------------shutdown-------------------+
//! ```

use crate::error::{Result, TelemetryError};
use crate::metrics::traits::CounterBackend;
use serde::{Deserialize, Serialize};
use sysinfo::{CpuRefreshKind, RefreshKind, System};
use tracing::{debug, warn};

/// Counter path for total processor utilisation across all logical processors.
pub const TOTAL_PROCESSOR_TIME: &str = r"\Processor(_Total)\% Processor Time";

/// Lifecycle state of a [`Sampler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplerState {
    Uninitialized,
    Ready,
    Closed,
}

/// Owner of the open CPU usage query.
///
/// A sampler is not shared between threads by itself; wrap it in a mutex
/// when more than one caller needs it.
pub struct Sampler<B: CounterBackend> {
    backend: B,
    query: Option<B::Query>,
    state: SamplerState,
    counter_path: String,
}

impl<B: CounterBackend> Sampler<B> {
    /// Create an uninitialized sampler for total processor time.
    pub fn new(backend: B) -> Self {
        Self::with_counter_path(backend, TOTAL_PROCESSOR_TIME)
    }

    /// Create an uninitialized sampler for a specific counter path.
    pub fn with_counter_path(backend: B, counter_path: impl Into<String>) -> Self {
        Self {
            backend,
            query: None,
            state: SamplerState::Uninitialized,
            counter_path: counter_path.into(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Counter path this sampler registers.
    pub fn counter_path(&self) -> &str {
        &self.counter_path
    }

    /// Open the query, register the counter and take a priming sample.
    ///
    /// Calling this on a ready sampler keeps the existing query. On failure
    /// nothing is retained and the sampler stays uninitialized.
    pub fn initialize(&mut self) -> Result<()> {
        match self.state {
            SamplerState::Ready => {
                debug!("sampler already initialized, keeping existing query");
                return Ok(());
            }
            SamplerState::Closed => return Err(TelemetryError::SamplerClosed),
            SamplerState::Uninitialized => {}
        }

        let mut query = self.backend.open_query()?;

        if let Err(err) = self.backend.add_counter(&mut query, &self.counter_path) {
            warn!(path = %self.counter_path, error = %err, "counter registration failed");
            self.backend.close_query(query);
            return Err(err);
        }

        // priming collection so the first sample() has a baseline
        if let Err(err) = self.backend.collect(&mut query) {
            debug!(error = %err, "priming collection failed");
        }

        self.query = Some(query);
        self.state = SamplerState::Ready;
        debug!(path = %self.counter_path, "sampler ready");
        Ok(())
    }

    /// Collect a new sample and return usage as a percentage in [0, 100].
    pub fn sample(&mut self) -> Result<f64> {
        let query = match (self.state, self.query.as_mut()) {
            (SamplerState::Ready, Some(query)) => query,
            (SamplerState::Closed, _) => return Err(TelemetryError::SamplerClosed),
            _ => return Err(TelemetryError::SamplerNotInitialized),
        };

        self.backend.collect(query)?;
        let value = self.backend.formatted_value(query)?;

        if !value.is_finite() {
            return Err(TelemetryError::system_error(format!(
                "counter returned non-finite value {}",
                value
            )));
        }

        Ok(value.clamp(0.0, 100.0))
    }

    /// Release the query. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(query) = self.query.take() {
            self.backend.close_query(query);
            debug!("sampler query closed");
        }
        self.state = SamplerState::Closed;
    }

    /// Access the backend, mainly for inspection in tests.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: CounterBackend> Drop for Sampler<B> {
    fn drop(&mut self) {
        if let Some(query) = self.query.take() {
            self.backend.close_query(query);
        }
    }
}

/// [`CounterBackend`] built on sysinfo's CPU usage refresh.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoCounters;

/// Query context for [`SysinfoCounters`].
pub struct SysinfoQuery {
    system: System,
    counter: Option<String>,
}

impl CounterBackend for SysinfoCounters {
    type Query = SysinfoQuery;

    fn open_query(&mut self) -> Result<SysinfoQuery> {
        let system = System::new_with_specifics(
            RefreshKind::new().with_cpu(CpuRefreshKind::new().with_cpu_usage()),
        );

        if system.cpus().is_empty() {
            return Err(TelemetryError::QueryOpen("no CPU information available".to_string()));
        }

        Ok(SysinfoQuery {
            system,
            counter: None,
        })
    }

    fn add_counter(&mut self, query: &mut SysinfoQuery, path: &str) -> Result<()> {
        if !path.eq_ignore_ascii_case(TOTAL_PROCESSOR_TIME) {
            return Err(TelemetryError::counter_add(path, "unsupported counter path"));
        }
        if query.counter.is_some() {
            return Err(TelemetryError::counter_add(path, "query already has a counter"));
        }
        query.counter = Some(path.to_string());
        Ok(())
    }

    fn collect(&mut self, query: &mut SysinfoQuery) -> Result<()> {
        query.system.refresh_cpu_usage();
        Ok(())
    }

    fn formatted_value(&mut self, query: &SysinfoQuery) -> Result<f64> {
        if query.counter.is_none() {
            return Err(TelemetryError::system_error("no counter registered on query"));
        }
        Ok(f64::from(query.system.global_cpu_usage()))
    }

    fn close_query(&mut self, query: SysinfoQuery) {
        drop(query);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted backend that records every call.
    #[derive(Default)]
    struct FakeCounters {
        fail_open: bool,
        fail_add: bool,
        values: VecDeque<f64>,
        opened: usize,
        closed: usize,
        collects: usize,
    }

    impl CounterBackend for FakeCounters {
        type Query = u32;

        fn open_query(&mut self) -> Result<u32> {
            if self.fail_open {
                return Err(TelemetryError::QueryOpen("denied".to_string()));
            }
            self.opened += 1;
            Ok(self.opened as u32)
        }

        fn add_counter(&mut self, _query: &mut u32, path: &str) -> Result<()> {
            if self.fail_add {
                return Err(TelemetryError::counter_add(path, "rejected"));
            }
            Ok(())
        }

        fn collect(&mut self, _query: &mut u32) -> Result<()> {
            self.collects += 1;
            Ok(())
        }

        fn formatted_value(&mut self, _query: &u32) -> Result<f64> {
            self.values
                .pop_front()
                .ok_or_else(|| TelemetryError::system_error("no data"))
        }

        fn close_query(&mut self, _query: u32) {
            self.closed += 1;
        }
    }

    fn fake_with(values: &[f64]) -> FakeCounters {
        FakeCounters {
            values: values.iter().copied().collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_initialize_primes_and_becomes_ready() {
        let mut sampler = Sampler::new(fake_with(&[12.5]));
        assert_eq!(sampler.state(), SamplerState::Uninitialized);

        sampler.initialize().unwrap();
        assert_eq!(sampler.state(), SamplerState::Ready);
        assert_eq!(sampler.backend().collects, 1);

        assert_eq!(sampler.sample().unwrap(), 12.5);
        assert_eq!(sampler.backend().collects, 2);
    }

    #[test]
    fn test_counter_failure_closes_query() {
        let mut sampler = Sampler::new(FakeCounters {
            fail_add: true,
            ..Default::default()
        });

        let err = sampler.initialize().unwrap_err();
        assert!(matches!(err, TelemetryError::CounterAdd { .. }));
        assert_eq!(sampler.state(), SamplerState::Uninitialized);
        assert_eq!(sampler.backend().opened, 1);
        assert_eq!(sampler.backend().closed, 1);
    }

    #[test]
    fn test_open_failure_keeps_uninitialized() {
        let mut sampler = Sampler::new(FakeCounters {
            fail_open: true,
            ..Default::default()
        });

        assert!(matches!(sampler.initialize(), Err(TelemetryError::QueryOpen(_))));
        assert_eq!(sampler.state(), SamplerState::Uninitialized);
        assert_eq!(sampler.backend().closed, 0);
    }

    #[test]
    fn test_double_initialize_reuses_query() {
        let mut sampler = Sampler::new(fake_with(&[]));
        sampler.initialize().unwrap();
        sampler.initialize().unwrap();

        assert_eq!(sampler.backend().opened, 1);
        assert_eq!(sampler.backend().closed, 0);
    }

    #[test]
    fn test_sample_before_initialize_is_checked() {
        let mut sampler = Sampler::new(fake_with(&[50.0]));
        assert!(matches!(sampler.sample(), Err(TelemetryError::SamplerNotInitialized)));
    }

    #[test]
    fn test_shutdown_is_terminal_and_idempotent() {
        let mut sampler = Sampler::new(fake_with(&[50.0]));
        sampler.initialize().unwrap();
        sampler.shutdown();
        sampler.shutdown();

        assert_eq!(sampler.state(), SamplerState::Closed);
        assert_eq!(sampler.backend().closed, 1);
        assert!(matches!(sampler.sample(), Err(TelemetryError::SamplerClosed)));
        assert!(matches!(sampler.initialize(), Err(TelemetryError::SamplerClosed)));
    }

    #[test]
    fn test_shutdown_from_uninitialized() {
        let mut sampler = Sampler::new(fake_with(&[]));
        sampler.shutdown();
        assert_eq!(sampler.state(), SamplerState::Closed);
        assert_eq!(sampler.backend().closed, 0);
    }

    #[test]
    fn test_sample_clamps_and_rejects_nan() {
        let mut sampler = Sampler::new(fake_with(&[130.0, -4.0, f64::NAN]));
        sampler.initialize().unwrap();

        assert_eq!(sampler.sample().unwrap(), 100.0);
        assert_eq!(sampler.sample().unwrap(), 0.0);
        assert!(sampler.sample().is_err());
        // exhausted script surfaces the backend error
        assert!(sampler.sample().is_err());
    }

    #[test]
    fn test_sysinfo_rejects_unknown_counter() {
        let mut sampler = Sampler::with_counter_path(SysinfoCounters, r"\Memory\Available Bytes");
        let err = sampler.initialize().unwrap_err();
        assert!(matches!(err, TelemetryError::CounterAdd { .. }));
        assert_eq!(sampler.state(), SamplerState::Uninitialized);
    }

    #[test]
    fn test_sysinfo_sample_in_range() {
        let mut sampler = Sampler::new(SysinfoCounters);
        sampler.initialize().unwrap();
        for _ in 0..3 {
            std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            let usage = sampler.sample().unwrap();
            assert!((0.0..=100.0).contains(&usage), "usage out of range: {}", usage);
        }
    }
}
