use crate::bail_log;
use crate::common::context::cli::CliContext;
use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

pub fn step_given_a_configuration_file(ctx: &mut CliContext, content: &str) -> Result<()> {
    std::fs::write(&ctx.config_path, content)
        .with_context(|| format!("writing config file: {}", ctx.config_path.display()))
}

pub fn step_when_i_run_htlcgate_config_check(ctx: &mut CliContext) -> Result<()> {
    let config_path = ctx.config_path.clone();
    step_when_i_run_htlcgate_config_check_with_env(ctx, Vec::<(String, String)>::new(), config_path)
}

pub fn step_when_i_run_htlcgate_config_check_with_env(
    ctx: &mut CliContext,
    envs: Vec<(String, String)>,
    config_path: PathBuf,
) -> Result<()> {
    ctx.command(
        envs,
        [
            OsStr::new("config"),
            OsStr::new("check"),
            OsStr::new("--config"),
            config_path.as_os_str(),
        ],
    )
}

pub fn step_when_i_run_htlcgate_service(ctx: &mut CliContext) -> Result<()> {
    let config_path = ctx.config_path.clone();
    ctx.command(
        Vec::<(String, String)>::new(),
        [
            OsStr::new("service"),
            OsStr::new("--config"),
            config_path.as_os_str(),
        ],
    )
}

pub async fn step_when_i_start_htlcgate_service(ctx: &mut CliContext) -> Result<u32> {
    let config_path = ctx.config_path.clone();
    let pid = ctx.spawn([
        OsStr::new("service"),
        OsStr::new("--config"),
        config_path.as_os_str(),
    ])?;
    // signal handlers are installed before anything else, give startup a moment
    tokio::time::sleep(Duration::from_secs(1)).await;
    Ok(pid)
}

pub fn step_when_i_send_signal(pid: u32, signal: &str) -> Result<()> {
    let status = Command::new("kill")
        .arg(format!("-{signal}"))
        .arg(pid.to_string())
        .status()
        .with_context(|| format!("sending {signal} to {pid}"))?;
    if !status.success() {
        bail_log!("kill -{} {} failed: {}", signal, pid, status);
    }
    Ok(())
}

pub fn step_then_the_process_exits(ctx: &mut CliContext) -> Result<()> {
    ctx.wait()
}

pub fn step_then_the_command_should_succeed(ctx: &CliContext) -> Result<()> {
    if ctx.exit_code() != 0 {
        bail_log!("expected exit code 0, got {}", ctx.exit_code());
    }
    Ok(())
}

pub fn step_then_the_command_should_fail(ctx: &CliContext) -> Result<()> {
    if ctx.exit_code() == 0 {
        bail_log!("expected command to fail, but it exited 0");
    }
    Ok(())
}

pub fn step_then_the_logs_should_contain(ctx: &CliContext, pattern: &str) -> Result<()> {
    if !ctx.stderr_buffer().iter().any(|line| line.contains(pattern)) {
        bail_log!("expected log line containing '{}'", pattern);
    }
    Ok(())
}
