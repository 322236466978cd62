//! Interactive tap session.
//!
//! Stdin is the event source (an empty line is a tap), a background task
//! polls the engine snapshot, and the auto-stop timer runs on the tokio
//! runtime. All three share one [`Engine`] handle.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use morsecall_core::error::Result;
use morsecall_core::{
    AlertSink, Clock, Config, Engine, MonotonicClock, PlaybackError, TokioScheduler,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Args)]
pub struct ListenArgs {
    /// Snapshot polling interval in milliseconds
    #[arg(long, default_value = "500", value_parser = clap::value_parser!(u64).range(50..=5000))]
    poll_ms: u64,
    /// Start switched off; type "on" to begin counting taps
    #[arg(long)]
    start_inactive: bool,
}

/// Rings the terminal bell.
struct TerminalBell {
    ringtone: Option<String>,
}

impl AlertSink for TerminalBell {
    fn start(&self) -> std::result::Result<(), PlaybackError> {
        let mut err = std::io::stderr();
        let label = self.ringtone.as_deref().unwrap_or("bell");
        writeln!(err, "\x07[ringing: {label}]")
            .and_then(|()| err.flush())
            .map_err(|e| PlaybackError::Unavailable(e.to_string()))
    }

    fn stop(&self) {
        eprintln!("[ringing stopped]");
    }
}

const HELP: &str =
    "Enter = tap | stop = silence alert | on/off = activate | reload = re-read config | status | quit";

pub fn run(args: ListenArgs) -> Result<()> {
    let config = Config::load()?;
    let runtime = tokio::runtime::Runtime::new()?;
    let clock = Arc::new(MonotonicClock::new());

    let engine = Engine::builder(config.cadence)
        .log_capacity(config.alert.activity_log_capacity)
        .clock(clock.clone())
        .scheduler(Arc::new(TokioScheduler::new(runtime.handle().clone())))
        .sink(Arc::new(TerminalBell {
            ringtone: config.alert.ringtone.clone(),
        }))
        .build()?;
    if !args.start_inactive {
        engine.set_active(true);
    }

    println!(
        "tap speed: {} | {}",
        config.cadence.tap_speed().label(),
        HELP
    );

    runtime.block_on(async {
        let poller = tokio::spawn(poll(engine.clone(), Duration::from_millis(args.poll_ms)));
        let result = read_commands(&engine, clock.as_ref()).await;
        poller.abort();
        engine.set_active(false);
        result
    })
}

async fn poll(engine: Engine, every: Duration) {
    let mut interval = tokio::time::interval(every);
    let mut last = None;
    loop {
        interval.tick().await;
        let snap = engine.snapshot();
        let line = format!(
            "{}{}{}",
            if snap.active { "" } else { "[off] " },
            snap.status_line(),
            if snap.is_alert_playing { " | RINGING" } else { "" }
        );
        if last.as_ref() != Some(&line) {
            println!("{line}");
            last = Some(line);
        }
    }
}

async fn read_commands(
    engine: &Engine,
    clock: &dyn Clock,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" | "t" | "tap" => {
                if engine.record_tap(clock.now_ms(), None).is_rejected() {
                    println!("ignored: inactive (type \"on\")");
                }
            }
            "stop" => {
                if !engine.manual_stop_alert() {
                    println!("no alert playing");
                }
            }
            "on" => {
                engine.set_active(true);
            }
            "off" => {
                engine.set_active(false);
            }
            "reload" => match Config::load() {
                Ok(config) => match engine.update_config(config.cadence) {
                    Ok(()) => {
                        info!(threshold = config.cadence.trigger_threshold, "config reloaded");
                        println!("config reloaded");
                    }
                    Err(e) => println!("config rejected: {e}"),
                },
                Err(e) => {
                    warn!(error = %e, "config reload failed");
                    println!("config rejected: {e}");
                }
            },
            "status" => {
                println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
            }
            "q" | "quit" | "exit" => break,
            "help" | "?" => println!("{HELP}"),
            other => println!("unknown command: {other} ({HELP})"),
        }
    }
    Ok(())
}
