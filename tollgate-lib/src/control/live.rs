use arc_swap::ArcSwap;
use serde::Serialize;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

use super::{AdmissionSettings, ConfigOverrides};
use crate::security::rate_limit::RateLimiter;

/// Settings and the limiter built for them, published as one unit.
#[derive(Debug)]
pub struct Snapshot {
    pub settings: AdmissionSettings,
    pub limiter: Arc<RateLimiter>,
}

/// A parameter that `/config` can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Parameter {
    Delay,
    Limit,
    Duration,
    Percentage,
}

impl Parameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::Delay => "delay",
            Parameter::Limit => "limit",
            Parameter::Duration => "duration",
            Parameter::Percentage => "percentage",
        }
    }
}

/// What a call to [`LiveConfig::apply`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub applied: Vec<Parameter>,
    pub rejected: Vec<Parameter>,
    /// Whether the limiter and its store were replaced
    pub rebuilt: bool,
    /// Effective settings after the update
    pub settings: AdmissionSettings,
}

/// Shared, live-updatable admission configuration.
#[derive(Debug)]
pub struct LiveConfig {
    current: ArcSwap<Snapshot>,
    // Serializes writers so two updates never start from the same snapshot.
    writer: Mutex<()>,
}

impl LiveConfig {
    pub fn new(settings: AdmissionSettings) -> Self {
        let limiter = Arc::new(RateLimiter::new(settings.limit, settings.window_ms));
        Self {
            current: ArcSwap::from_pointee(Snapshot { settings, limiter }),
            writer: Mutex::new(()),
        }
    }

    /// The snapshot in effect right now.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn settings(&self) -> AdmissionSettings {
        self.current.load().settings
    }

    pub fn limiter(&self) -> Arc<RateLimiter> {
        Arc::clone(&self.current.load().limiter)
    }

    /// Apply runtime overrides.
    ///
    /// Each value is parsed on its own; a malformed or out-of-range value
    /// leaves that parameter unchanged. A valid `LIMIT` or `DURATION`
    /// replaces the limiter, which discards every tracked client.
    pub fn apply(&self, overrides: &ConfigOverrides) -> ApplyReport {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.current.load_full();
        let mut next = current.settings;
        let mut applied = Vec::new();
        let mut rejected = Vec::new();
        let mut rebuild = false;

        if let Some(raw) = overrides.delay.as_deref() {
            match parse_within::<u64>(raw, |_| true) {
                Some(delay_ms) => {
                    info!(delay_ms, "Setting delay");
                    next.delay_ms = delay_ms;
                    applied.push(Parameter::Delay);
                }
                None => {
                    warn!(value = %raw, "Invalid delay value, keeping previous");
                    rejected.push(Parameter::Delay);
                }
            }
        }

        if let Some(raw) = overrides.limit.as_deref() {
            match parse_within::<u32>(raw, |limit| *limit > 0) {
                Some(limit) => {
                    info!(limit, "Setting rate limit");
                    next.limit = limit;
                    applied.push(Parameter::Limit);
                    rebuild = true;
                }
                None => {
                    warn!(value = %raw, "Invalid limit value, keeping previous");
                    rejected.push(Parameter::Limit);
                }
            }
        }

        if let Some(raw) = overrides.duration.as_deref() {
            match parse_within::<u64>(raw, |_| true) {
                Some(window_ms) => {
                    info!(window_ms, "Setting refill duration");
                    next.window_ms = window_ms;
                    applied.push(Parameter::Duration);
                    rebuild = true;
                }
                None => {
                    warn!(value = %raw, "Invalid duration value, keeping previous");
                    rejected.push(Parameter::Duration);
                }
            }
        }

        if let Some(raw) = overrides.percentage.as_deref() {
            match parse_within::<u8>(raw, |percentage| *percentage <= 100) {
                Some(percentage) => {
                    info!(percentage, "Setting percentage threshold");
                    next.percentage = percentage;
                    applied.push(Parameter::Percentage);
                }
                None => {
                    warn!(value = %raw, "Invalid percentage value, keeping previous");
                    rejected.push(Parameter::Percentage);
                }
            }
        }

        let limiter = if rebuild {
            info!(limit = next.limit, window_ms = next.window_ms, "Rebuilding rate limiter");
            Arc::new(RateLimiter::new(next.limit, next.window_ms))
        } else {
            Arc::clone(&current.limiter)
        };
        self.current.store(Arc::new(Snapshot { settings: next, limiter }));

        ApplyReport { applied, rejected, rebuilt: rebuild, settings: next }
    }
}

fn parse_within<T: FromStr>(raw: &str, valid: impl Fn(&T) -> bool) -> Option<T> {
    raw.parse::<T>().ok().filter(valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(query: &str) -> ConfigOverrides {
        ConfigOverrides::from_query(Some(query))
    }

    #[test]
    fn delay_and_percentage_keep_the_limiter() {
        let live = LiveConfig::new(AdmissionSettings::default());
        let before = live.limiter();

        let report = live.apply(&overrides("DELAY=25&PERCENT=60"));
        assert_eq!(report.applied, vec![Parameter::Delay, Parameter::Percentage]);
        assert!(!report.rebuilt);
        assert_eq!(live.settings().delay_ms, 25);
        assert_eq!(live.settings().percentage, 60);
        assert!(Arc::ptr_eq(&before, &live.limiter()));
    }

    #[test]
    fn limit_rebuilds_the_limiter() {
        let live = LiveConfig::new(AdmissionSettings::default());
        let before = live.limiter();
        before.exceeds_limit("10.0.0.1");

        let report = live.apply(&overrides("LIMIT=5"));
        assert!(report.rebuilt);
        assert_eq!(live.settings().limit, 5);
        assert_eq!(live.limiter().limit(), 5);
        assert!(!Arc::ptr_eq(&before, &live.limiter()));
        assert!(live.limiter().stats().is_empty());
    }

    #[test]
    fn malformed_values_are_retained() {
        let live = LiveConfig::new(AdmissionSettings::default());
        live.apply(&overrides("LIMIT=5"));

        let report = live.apply(&overrides("LIMIT=abc&DELAY=-1&PERCENT=101&DURATION=x"));
        assert!(report.applied.is_empty());
        assert_eq!(report.rejected.len(), 4);
        assert!(!report.rebuilt);
        assert_eq!(live.settings().limit, 5);
        assert_eq!(live.settings().delay_ms, 0);
        assert_eq!(live.settings().percentage, 0);
    }

    #[test]
    fn zero_limit_is_rejected() {
        let live = LiveConfig::new(AdmissionSettings::default());
        let report = live.apply(&overrides("LIMIT=0"));
        assert_eq!(report.rejected, vec![Parameter::Limit]);
        assert_eq!(live.settings().limit, 10);
    }

    #[test]
    fn duration_sets_refill_window() {
        let live = LiveConfig::new(AdmissionSettings::default());
        let report = live.apply(&overrides("DURATION=250"));
        assert!(report.rebuilt);
        assert_eq!(live.settings().window_ms, 250);
        assert_eq!(live.settings().limit, 10);
        assert_eq!(live.limiter().fill_interval(), std::time::Duration::from_millis(250));
    }

    #[test]
    fn encoded_values_are_applied() {
        let live = LiveConfig::new(AdmissionSettings::default());
        let report = live.apply(&overrides("PERCENT=5%30&LIMIT=%2B7"));
        assert_eq!(report.applied, vec![Parameter::Limit, Parameter::Percentage]);
        assert!(report.rejected.is_empty());
        assert_eq!(live.settings().percentage, 50);
        assert_eq!(live.settings().limit, 7);
    }

    #[tokio::test]
    async fn rebuild_releases_the_old_store() {
        let live = LiveConfig::new(AdmissionSettings::default());
        let before = live.limiter();
        before.exceeds_limit("10.0.0.1");
        let old_store = Arc::downgrade(before.store());
        let old_sweep = before.sweep_token();
        assert!(old_sweep.as_ref().is_some_and(|t| !t.is_cancelled()));

        live.apply(&overrides("LIMIT=5"));
        assert!(old_store.upgrade().is_some());

        drop(before);
        assert!(old_store.upgrade().is_none());
        assert!(old_sweep.is_some_and(|t| t.is_cancelled()));
    }

    #[test]
    fn mixed_update_applies_valid_parts_only() {
        let live = LiveConfig::new(AdmissionSettings::default());
        let report = live.apply(&overrides("DELAY=5&LIMIT=nope"));
        assert_eq!(report.applied, vec![Parameter::Delay]);
        assert_eq!(report.rejected, vec![Parameter::Limit]);
        assert_eq!(live.settings().delay_ms, 5);
        assert_eq!(live.settings().limit, 10);
    }
}
