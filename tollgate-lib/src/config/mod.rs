mod limits;
mod loader;
mod root;
mod startup;
mod telemetry;
mod timeout;
mod upstream;
mod validator;

pub use limits::LimitsConfig;
pub use loader::{load_from_path, load_from_str};
pub use root::Config;
pub use startup::StartupOverrides;
pub use telemetry::{LoggingConfig, TelemetryConfig};
pub use timeout::TimeoutConfig;
pub use upstream::UpstreamConfig;
pub use validator::validate;
