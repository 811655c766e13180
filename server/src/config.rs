use anyhow::{bail, Context};
use htlcgate_components::intercept::registry::HtlcRegistryConfig;
use htlcgate_components::node::NodeClientConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on how long an intercepted HTLC may be held. Well inside the
/// smallest CLTV delta (18 blocks) a node accepts on an incoming HTLC.
pub const MAX_HTLC_HOLD_TIMEOUT: Duration = Duration::from_secs(3600);

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    pub gateway_service: GatewayServiceConfig,
    pub node: NodeClientConfig,
    pub node_client_timeout_secs: f64,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    pub reconnect_backoff: BackoffConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GatewayServiceConfig {
    pub address: SocketAddr,
    pub tls: Option<TlsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistryConfig {
    pub htlc_hold_timeout_secs: f64,
    pub sweep_interval_secs: f64,
    pub subscription_buffer: usize,
    pub resolved_retention_secs: f64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            htlc_hold_timeout_secs: 30.0,
            sweep_interval_secs: 1.0,
            subscription_buffer: 64,
            resolved_retention_secs: 600.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PaymentConfig {
    pub timeout_secs: f64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self { timeout_secs: 60.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BackoffConfig {
    Stop,
    #[serde(rename_all = "kebab-case")]
    Exponential {
        initial_interval_secs: Option<f64>,
        randomization_factor: Option<f64>,
        multiplier: Option<f64>,
        max_interval_secs: Option<f64>,
        max_elapsed_time_secs: Option<f64>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl ServerConfig {
    pub fn node_client_timeout(&self) -> anyhow::Result<Duration> {
        positive_secs("node-client-timeout-secs", self.node_client_timeout_secs)
    }

    pub fn payment_timeout(&self) -> anyhow::Result<Duration> {
        positive_secs("payment.timeout-secs", self.payment.timeout_secs)
    }

    pub fn registry_config(&self) -> anyhow::Result<HtlcRegistryConfig> {
        let registry = &self.registry;
        if registry.subscription_buffer == 0 {
            bail!("registry.subscription-buffer must be at least 1");
        }

        let hold_timeout = positive_secs(
            "registry.htlc-hold-timeout-secs",
            registry.htlc_hold_timeout_secs,
        )?;
        if hold_timeout > MAX_HTLC_HOLD_TIMEOUT {
            bail!(
                "registry.htlc-hold-timeout-secs must not exceed {} seconds",
                MAX_HTLC_HOLD_TIMEOUT.as_secs()
            );
        }

        Ok(HtlcRegistryConfig {
            hold_timeout,
            sweep_interval: positive_secs(
                "registry.sweep-interval-secs",
                registry.sweep_interval_secs,
            )?,
            subscription_buffer: registry.subscription_buffer,
            resolved_retention: positive_secs(
                "registry.resolved-retention-secs",
                registry.resolved_retention_secs,
            )?,
        })
    }

    /// Checks every value the services would reject at startup.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.node_client_timeout()?;
        self.payment_timeout()?;
        self.registry_config()?;
        if let BackoffConfig::Exponential {
            initial_interval_secs,
            max_interval_secs,
            max_elapsed_time_secs,
            ..
        } = &self.reconnect_backoff
        {
            for (name, secs) in [
                ("initial-interval-secs", initial_interval_secs),
                ("max-interval-secs", max_interval_secs),
                ("max-elapsed-time-secs", max_elapsed_time_secs),
            ] {
                if let Some(secs) = secs {
                    positive_secs(&format!("reconnect-backoff.{name}"), *secs)?;
                }
            }
        }
        Ok(())
    }
}

pub fn positive_secs(name: &str, secs: f64) -> anyhow::Result<Duration> {
    let duration =
        Duration::try_from_secs_f64(secs).with_context(|| format!("{name}: {secs} is not a duration"))?;
    if duration.is_zero() {
        bail!("{name} must be greater than zero");
    }
    Ok(duration)
}
