#![forbid(unsafe_code)]

pub mod config;
pub mod control;
pub mod error;
pub mod proxy;
pub mod security;
pub mod telemetry;

pub use config::{load_from_path, Config, StartupOverrides};
pub use control::{AdmissionSettings, ConfigOverrides, LiveConfig};
pub use error::{GatewayError, Result};
pub use proxy::{run, serve, GatewayContext, UpstreamClient};
pub use security::{AdmissionDecision, AdmissionPolicy, RateLimiter};
