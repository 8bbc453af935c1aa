// SPDX-License-Identifier: GPL-3.0-only

use clap::Parser;
use picam_tunnel::backends;
use picam_tunnel::hal::MediaHal;
use picam_tunnel::pipeline::Sleeper;
use picam_tunnel::{CapturePipeline, PipelineConfig, PipelineError, ThreadSleeper, TimingContext};
use std::convert::Infallible;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Target of the single line printed when the pipeline gives up
const FATAL_TARGET: &str = "picam_tunnel::fatal";

/// Exit status after a fatal pipeline error
const FATAL_EXIT: u8 = 1;

/// Takes no options: the pipeline layout and capture interval are fixed.
#[derive(Parser)]
#[command(name = "picam-tunnel")]
#[command(about = "Tunnel the Raspberry Pi camera into two on-screen renderers and capture continuously")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {}

fn main() -> ExitCode {
    let timing = TimingContext::start();

    // Lines read "<relative-seconds>: <message>" on stderr
    // Set RUST_LOG to change verbosity, e.g. RUST_LOG=debug
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .with_timer(timing)
        .with_ansi(false)
        .with_target(false)
        .with_level(false)
        .init();

    let _cli = Cli::parse();

    info!("Using {} backend", backends::default_backend_type());
    let hal = backends::default_backend();
    exit_code(run(hal.as_ref(), timing, &mut ThreadSleeper))
}

/// `RUST_LOG`-style directives, defaulting to `info`.
///
/// The fatal error line is always admitted, even under `RUST_LOG=off`.
fn env_filter(directives: Option<&str>) -> EnvFilter {
    let floor = format!("{}=error", FATAL_TARGET);
    directives
        .and_then(|d| EnvFilter::try_new(format!("{},{}", d, floor)).ok())
        .unwrap_or_else(|| EnvFilter::new(format!("info,{}", floor)))
}

fn run(
    hal: &dyn MediaHal,
    timing: TimingContext,
    sleeper: &mut dyn Sleeper,
) -> Result<Infallible, PipelineError> {
    let config = PipelineConfig::default();
    if let Ok(json) = serde_json::to_string(&config) {
        debug!("pipeline config: {}", json);
    }

    let mut pipeline = CapturePipeline::initialize(hal, &config, timing)?;
    pipeline.run(hal, sleeper)
}

/// Print the failure and map it to the process exit status
fn exit_code(result: Result<Infallible, PipelineError>) -> ExitCode {
    match result {
        Ok(never) => match never {},
        Err(e) => {
            error!(target: FATAL_TARGET, "{}", e);
            ExitCode::from(FATAL_EXIT)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picam_tunnel::backends::simulated::SimulatedHal;
    use picam_tunnel::errors::{HalCall, Status};
    use std::io;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct NoSleep;

    impl Sleeper for NoSleep {
        fn sleep(&mut self, _: Duration) {}
    }

    /// Run `f` under the binary's filter and return everything it logged
    fn logged_with(directives: Option<&str>, f: impl FnOnce()) -> String {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(env_filter(directives))
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_target(false)
            .with_level(false)
            .without_time()
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = log.0.lock().unwrap().clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn test_failing_driver_call_exits_with_status_one() {
        let hal = SimulatedHal::new();
        hal.fail_on(HalCall::CreateConnection, 1, Status::ENOSPC);

        let mut code = None;
        let log = logged_with(None, || {
            code = Some(exit_code(run(&hal, TimingContext::start(), &mut NoSleep)));
        });

        assert_eq!(code, Some(ExitCode::from(1)));
        assert!(log.contains("orchestrator.rs:"), "{log}");
        assert!(log.contains("connection_create failed: 0x00000002"), "{log}");
        assert_eq!(hal.connections().len(), 1);
    }

    #[test]
    fn test_fatal_line_survives_rust_log_off() {
        let hal = SimulatedHal::new();
        hal.fail_on(HalCall::EnableComponent, 0, Status::ENOMEM);

        let mut code = None;
        let log = logged_with(Some("off"), || {
            code = Some(exit_code(run(&hal, TimingContext::start(), &mut NoSleep)));
        });

        assert_eq!(code, Some(ExitCode::from(1)));
        assert_eq!(log.lines().count(), 1, "{log}");
        assert!(log.contains("component_enable failed: 0x00000001"), "{log}");
    }

    #[test]
    fn test_default_filter_logs_callbacks() {
        let hal = SimulatedHal::new();
        hal.fail_on(HalCall::SetBoolean, 1, Status::EIO);

        let log = logged_with(None, || {
            let _ = exit_code(run(&hal, TimingContext::start(), &mut NoSleep));
        });

        assert!(log.contains("callback_control is called by vc.ril.camera:ctr:0"), "{log}");
        assert!(log.contains("port_parameter_set_boolean failed"), "{log}");
        assert!(!log.contains("pipeline config:"), "{log}");
    }

    #[test]
    fn test_invalid_directives_fall_back_to_info() {
        let log = logged_with(Some("picam_tunnel=loud"), || {
            info!("visible");
            debug!("hidden");
        });
        assert!(log.contains("visible"), "{log}");
        assert!(!log.contains("hidden"), "{log}");
    }
}
