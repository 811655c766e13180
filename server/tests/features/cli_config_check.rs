use crate::common::config::{unreachable_node_config, STOP_BACKOFF};
use crate::common::context::cli::CliContext;
use crate::common::step_functions::*;

/// Feature: Configuration check CLI
/// Scenario: A complete configuration is accepted
#[test]
fn config_check_valid_configuration() {
    let mut ctx = CliContext::create().expect("assert");

    step_given_a_configuration_file(&mut ctx, &unreachable_node_config(STOP_BACKOFF))
        .expect("assert");
    step_when_i_run_htlcgate_config_check(&mut ctx).expect("assert");
    step_then_the_command_should_succeed(&ctx).expect("assert");
    step_then_the_logs_should_contain(&ctx, "configuration valid").expect("assert");
}

/// Feature: Configuration check CLI
/// Scenario: Environment variables are expanded before parsing
#[test]
fn config_check_expands_environment_variables() {
    let mut ctx = CliContext::create().expect("assert");

    let content = unreachable_node_config(STOP_BACKOFF)
        .replace("127.0.0.1:0", "${HTLCGATE_TEST_ADDRESS}");
    step_given_a_configuration_file(&mut ctx, &content).expect("assert");
    let config_path = ctx.config_path.clone();
    step_when_i_run_htlcgate_config_check_with_env(
        &mut ctx,
        vec![(
            "HTLCGATE_TEST_ADDRESS".to_string(),
            "127.0.0.1:10123".to_string(),
        )],
        config_path,
    )
    .expect("assert");
    step_then_the_command_should_succeed(&ctx).expect("assert");
    step_then_the_logs_should_contain(&ctx, "127.0.0.1:10123").expect("assert");
}

/// Feature: Configuration check CLI
/// Scenario: A missing configuration file is rejected
#[test]
fn config_check_missing_file() {
    let mut ctx = CliContext::create().expect("assert");

    step_when_i_run_htlcgate_config_check(&mut ctx).expect("assert");
    step_then_the_command_should_fail(&ctx).expect("assert");
    step_then_the_logs_should_contain(&ctx, "reading configuration file").expect("assert");
}

/// Feature: Configuration check CLI
/// Scenario: Malformed YAML is rejected
#[test]
fn config_check_malformed_yaml() {
    let mut ctx = CliContext::create().expect("assert");

    step_given_a_configuration_file(&mut ctx, "gateway-service: [unterminated").expect("assert");
    step_when_i_run_htlcgate_config_check(&mut ctx).expect("assert");
    step_then_the_command_should_fail(&ctx).expect("assert");
    step_then_the_logs_should_contain(&ctx, "parsing YAML configuration").expect("assert");
}

/// Feature: Configuration check CLI
/// Scenario: Out of range values are rejected
#[test]
fn config_check_zero_subscription_buffer() {
    let mut ctx = CliContext::create().expect("assert");

    let content = unreachable_node_config(STOP_BACKOFF)
        .replace("subscription-buffer: 8", "subscription-buffer: 0");
    step_given_a_configuration_file(&mut ctx, &content).expect("assert");
    step_when_i_run_htlcgate_config_check(&mut ctx).expect("assert");
    step_then_the_command_should_fail(&ctx).expect("assert");
    step_then_the_logs_should_contain(&ctx, "subscription-buffer").expect("assert");
}
