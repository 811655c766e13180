use crate::common::config::{unreachable_node_config, FAST_EXPONENTIAL_BACKOFF, STOP_BACKOFF};
use crate::common::context::cli::CliContext;
use crate::common::step_functions::*;

/// Feature: Service lifecycle
/// Scenario: The service stops with an error once reconnecting is given up
#[test]
fn service_terminates_when_node_unreachable_and_backoff_stops() {
    let mut ctx = CliContext::create().expect("assert");

    step_given_a_configuration_file(&mut ctx, &unreachable_node_config(STOP_BACKOFF))
        .expect("assert");
    step_when_i_run_htlcgate_service(&mut ctx).expect("assert");
    step_then_the_command_should_fail(&ctx).expect("assert");
    step_then_the_logs_should_contain(&ctx, "gateway service missing TLS").expect("assert");
    step_then_the_logs_should_contain(&ctx, "running htlc listener").expect("assert");
}

/// Feature: Service lifecycle
/// Scenario Outline: The service shuts down cleanly on a termination signal
#[tokio::test]
async fn service_lifecycle_sigterm_scenario() {
    signal_service("TERM").await;
}

/// Feature: Service lifecycle
/// Scenario Outline: The service shuts down cleanly on an interrupt
#[tokio::test]
async fn service_lifecycle_sigint_scenario() {
    signal_service("INT").await;
}

async fn signal_service(signal: &str) {
    let mut ctx = CliContext::create().expect("assert");

    step_given_a_configuration_file(&mut ctx, &unreachable_node_config(FAST_EXPONENTIAL_BACKOFF))
        .expect("assert");
    let pid = step_when_i_start_htlcgate_service(&mut ctx)
        .await
        .expect("assert");
    step_when_i_send_signal(pid, signal).expect("assert");
    step_then_the_process_exits(&mut ctx).expect("assert");
    step_then_the_command_should_succeed(&ctx).expect("assert");
    step_then_the_logs_should_contain(&ctx, "server terminated clean").expect("assert");
}
