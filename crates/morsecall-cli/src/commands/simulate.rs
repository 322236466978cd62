use std::sync::Arc;

use clap::Args;
use morsecall_core::error::Result;
use morsecall_core::{Clock, Config, Engine, ManualClock, ManualScheduler, SilentSink};
use serde_json::json;

#[derive(Args)]
pub struct SimulateArgs {
    /// Tap timestamps in milliseconds, comma separated
    #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
    taps: Vec<i64>,
    /// Press durations in milliseconds, matched to taps by position
    #[arg(long, value_delimiter = ',')]
    durations: Vec<i64>,
    /// Override cadence.trigger_threshold
    #[arg(long)]
    threshold: Option<u32>,
    /// Override cadence.consecutive_window_ms
    #[arg(long)]
    window: Option<i64>,
    /// Override cadence.alert_auto_stop_ms
    #[arg(long)]
    auto_stop: Option<u64>,
    /// Ignore the stored config and start from defaults
    #[arg(long)]
    defaults: bool,
    /// Leave the engine switched off (every tap is rejected)
    #[arg(long)]
    inactive: bool,
}

fn load_config(args: &SimulateArgs) -> Result<Config> {
    let mut config = if args.defaults {
        Config::default()
    } else {
        Config::load()?
    };
    if let Some(threshold) = args.threshold {
        config.cadence.trigger_threshold = threshold;
    }
    if let Some(window) = args.window {
        config.cadence.consecutive_window_ms = window;
    }
    if let Some(auto_stop) = args.auto_stop {
        config.cadence.alert_auto_stop_ms = auto_stop;
    }
    Ok(config)
}

pub fn run(args: SimulateArgs) -> Result<()> {
    let Config { cadence, alert, .. } = load_config(&args)?;
    let clock = Arc::new(ManualClock::new(args.taps.first().copied().unwrap_or(0)));
    let engine = Engine::builder(cadence)
        .log_capacity(alert.activity_log_capacity)
        .clock(clock.clone())
        .scheduler(Arc::new(ManualScheduler::new()))
        .sink(Arc::new(SilentSink))
        .build()?;
    if !args.inactive {
        engine.set_active(true);
    }

    let mut steps = Vec::with_capacity(args.taps.len());
    for (i, &ts) in args.taps.iter().enumerate() {
        // Time only moves forward for the alert deadline, even if the
        // timestamps themselves do not.
        if ts > clock.now_ms() {
            clock.set(ts);
        }
        let auto_stopped = engine.tick();
        let outcome = engine.record_tap(ts, args.durations.get(i).copied());
        steps.push(json!({
            "at_ms": ts,
            "auto_stopped_before": auto_stopped,
            "result": outcome,
        }));
    }

    let report = json!({
        "config": cadence,
        "steps": steps,
        "snapshot": engine.snapshot(),
        "status": engine.snapshot().status_line(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
