use std::sync::Arc;

use crate::config::Config;
use crate::control::{AdmissionSettings, LiveConfig};
use crate::error::Result;
use crate::proxy::UpstreamClient;
use crate::security::AdmissionPolicy;
use crate::telemetry::Metrics;

/// Everything a request handler needs, shared by all connections
pub struct GatewayContext {
    pub live: Arc<LiveConfig>,
    pub policy: AdmissionPolicy,
    pub client: UpstreamClient,
    pub metrics: Option<Arc<Metrics>>,
}

impl GatewayContext {
    pub fn new(
        live: Arc<LiveConfig>,
        client: UpstreamClient,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        let policy = AdmissionPolicy::new(Arc::clone(&live));
        Self { live, policy, client, metrics }
    }

    /// Build the live configuration and upstream client described by `config`
    pub fn from_config(config: &Config, metrics: Option<Arc<Metrics>>) -> Result<Self> {
        let live = Arc::new(LiveConfig::new(AdmissionSettings::from(&config.limits)));
        let client = UpstreamClient::new(&config.upstream)?;
        Ok(Self::new(live, client, metrics))
    }
}
