use crate::di::inject::injectors::backoff::BackoffInjector;
use crate::di::inject::injectors::config::ServerConfigInjector;
use crate::di::inject::injectors::node::NodeInjector;
use crate::di::inject::injectors::registry::RegistryInjector;
use crate::di::inject::injectors::service::gateway::GatewayServiceInjector;
use crate::di::inject::injectors::service::listener::HtlcListenerInjector;
use crate::di::inject::injectors::service::sweeper::HtlcSweeperInjector;
use crate::signals::get_signals_fut;
use anyhow::{anyhow, Context};
use log::info;
use signal_hook::low_level::signal_name;
use std::path::PathBuf;
use tokio::sync::watch;
use tokio::task::JoinError;

pub async fn execute(config_path: PathBuf) -> anyhow::Result<()> {
    info!("starting services");

    let (signals_fut, signals_handle) = get_signals_fut()?;

    let config_injector = ServerConfigInjector::new(config_path)?;
    let node_injector = NodeInjector::new(config_injector.clone());
    let registry_injector = RegistryInjector::new(config_injector.clone());
    let backoff_injector = BackoffInjector::new(config_injector.clone());

    let gateway_service_injector = GatewayServiceInjector::new(
        config_injector.clone(),
        node_injector.clone(),
        registry_injector.clone(),
    );
    let listener_injector = HtlcListenerInjector::new(
        node_injector.clone(),
        registry_injector.clone(),
        backoff_injector,
    );
    let sweeper_injector = HtlcSweeperInjector::new(registry_injector.clone());

    let gateway_service_fut = gateway_service_injector.connect().await?;

    let (background_shutdown_tx, background_shutdown_rx) = watch::channel(false);

    let listener_fut = listener_injector.start(background_shutdown_rx.clone())?;
    let mut listener_handle = tokio::spawn(listener_fut);

    let sweeper_fut = sweeper_injector.start(background_shutdown_rx)?;
    let sweeper_handle = tokio::spawn(sweeper_fut);

    let mut errors = vec![];
    let mut listener_finished = false;

    if let Err(e) = tokio::select! {
        gateway_result = gateway_service_fut => {
            gateway_result.with_context(|| "running gateway gRPC service")
        }

        // the listener only returns early once reconnecting is given up
        listener_result = &mut listener_handle => {
            listener_finished = true;
            flatten(listener_result).with_context(|| "running htlc listener")
        }

        signal = signals_fut => match signal {
            None => {
                Err(anyhow!("monitoring OS signals"))
            }
            Some(signal) => {
                let signal_str = signal_name(signal).unwrap_or("unknown");
                info!("received signal: {signal_str}, terminating");
                Ok(())
            }
        }
    } {
        errors.push(e);
    }

    info!("shutting down htlc background services");
    let _ = background_shutdown_tx.send(true);

    if !listener_finished {
        if let Err(e) =
            flatten(listener_handle.await).with_context(|| "waiting for htlc listener to terminate")
        {
            errors.push(e);
        }
    }

    if let Err(e) =
        flatten(sweeper_handle.await).with_context(|| "waiting for htlc sweeper to terminate")
    {
        errors.push(e);
    }

    info!("htlc background services shut down");

    signals_handle.close();
    info!("signal stream closed");

    if errors.is_empty() {
        info!("server terminated clean");
        Ok(())
    } else {
        Err(anyhow!("server terminated with errors:\n{:?}", errors))
    }
}

fn flatten(result: Result<anyhow::Result<()>, JoinError>) -> anyhow::Result<()> {
    result.with_context(|| "joining background task")?
}
