use crate::config::BackoffConfig;
use crate::di::delegates::BackoffProviderDelegate;
use crate::di::inject::injectors::config::ServerConfigInjector;
use htlcgate_components::backoff::{ExponentialBackoffProvider, StopBackoffProvider};
use std::time::Duration;

#[derive(Clone)]
pub struct BackoffInjector {
    config: ServerConfigInjector,
}

impl BackoffInjector {
    pub fn new(config: ServerConfigInjector) -> Self {
        Self { config }
    }

    pub fn get(&self) -> BackoffProviderDelegate {
        match self.config.get().reconnect_backoff {
            BackoffConfig::Stop => BackoffProviderDelegate::Stop(StopBackoffProvider),
            BackoffConfig::Exponential {
                initial_interval_secs,
                randomization_factor,
                multiplier,
                max_interval_secs,
                max_elapsed_time_secs,
            } => {
                let mut builder = backoff::ExponentialBackoffBuilder::new();
                if let Some(interval) = initial_interval_secs {
                    builder.with_initial_interval(Duration::from_secs_f64(interval));
                }
                if let Some(factor) = randomization_factor {
                    builder.with_randomization_factor(factor);
                }
                if let Some(mult) = multiplier {
                    builder.with_multiplier(mult);
                }
                if let Some(max_interval) = max_interval_secs {
                    builder.with_max_interval(Duration::from_secs_f64(max_interval));
                }
                builder.with_max_elapsed_time(max_elapsed_time_secs.map(Duration::from_secs_f64));

                BackoffProviderDelegate::Exponential(ExponentialBackoffProvider::new(builder))
            }
        }
    }
}
