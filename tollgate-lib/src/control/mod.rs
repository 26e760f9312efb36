//! Runtime reconfiguration of admission parameters.
//!
//! The current [`AdmissionSettings`] and the [`RateLimiter`] built for them
//! are published together as one immutable [`Snapshot`]. Requests load a
//! snapshot once and use it for their whole admission pass; `/config`
//! updates go through [`LiveConfig::apply`], which swaps in a new snapshot.
//!
//! [`RateLimiter`]: crate::security::rate_limit::RateLimiter

mod live;
mod overrides;
mod settings;

pub use live::{ApplyReport, LiveConfig, Parameter, Snapshot};
pub use overrides::ConfigOverrides;
pub use settings::AdmissionSettings;
