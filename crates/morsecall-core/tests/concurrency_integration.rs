//! Integration tests for concurrent producers, pollers and timers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use morsecall_core::{
    AlertOutcome, AlertSink, CadenceConfig, Engine, ManualClock, ManualScheduler, PlaybackError,
    SilentSink, TokioScheduler,
};

fn engine_with_manual_timers(threshold: u32) -> (Engine, Arc<ManualScheduler>) {
    let scheduler = Arc::new(ManualScheduler::new());
    let engine = Engine::builder(CadenceConfig {
        trigger_threshold: threshold,
        ..Default::default()
    })
    .clock(Arc::new(ManualClock::new(0)))
    .scheduler(scheduler.clone())
    .sink(Arc::new(SilentSink))
    .build()
    .unwrap();
    engine.set_active(true);
    (engine, scheduler)
}

#[test]
fn poller_never_sees_torn_tap() {
    let (engine, _scheduler) = engine_with_manual_timers(3);
    let done = Arc::new(AtomicBool::new(false));

    let poller = {
        let engine = engine.clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut reads = 0u64;
            while !done.load(Ordering::SeqCst) {
                let snap = engine.snapshot();
                assert!(snap.consecutive_taps < snap.trigger_threshold);
                if snap.total_taps > 0 {
                    // The newest log line always belongs to the newest tap.
                    assert_eq!(
                        snap.recent_log[0],
                        format!(
                            "Tap #{} (Consecutive: {})",
                            snap.total_taps, snap.consecutive_taps
                        )
                    );
                }
                if snap.is_alert_playing {
                    assert!(snap.total_taps >= u64::from(snap.trigger_threshold));
                }
                reads += 1;
            }
            reads
        })
    };

    for i in 0..2_000i64 {
        engine.record_tap(i * 10, None);
    }
    done.store(true, Ordering::SeqCst);
    let reads = poller.join().unwrap();
    assert!(reads > 0);
    assert_eq!(engine.snapshot().total_taps, 2_000);
}

#[test]
fn concurrent_producers_count_every_tap() {
    let (engine, _scheduler) = engine_with_manual_timers(2);
    let producers: Vec<_> = (0..4)
        .map(|p| {
            let engine = engine.clone();
            thread::spawn(move || {
                for i in 0..500i64 {
                    engine.record_tap(p * 1_000_000 + i, None);
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    assert_eq!(engine.snapshot().total_taps, 2_000);
}

#[test]
fn deactivation_is_never_observed_half_done() {
    let (engine, scheduler) = engine_with_manual_timers(1);
    let done = Arc::new(AtomicBool::new(false));

    let poller = {
        let engine = engine.clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::SeqCst) {
                let snap = engine.snapshot();
                if !snap.active {
                    assert!(!snap.is_alert_playing);
                    assert_eq!(snap.total_taps, 0);
                    assert_eq!(snap.consecutive_taps, 0);
                }
            }
        })
    };

    for round in 0..500i64 {
        engine.set_active(true);
        engine.record_tap(round, None);
        engine.set_active(false);
    }
    done.store(true, Ordering::SeqCst);
    poller.join().unwrap();

    // Every timer left over from the rounds is stale.
    scheduler.run_pending();
    let snap = engine.snapshot();
    assert!(!snap.active);
    assert!(!snap.is_alert_playing);
}

#[test]
fn stop_racing_auto_stop_has_one_winner() {
    for _ in 0..200 {
        let (engine, scheduler) = engine_with_manual_timers(1);
        engine.record_tap(0, None);
        assert!(engine.snapshot().is_alert_playing);

        let stopper = {
            let engine = engine.clone();
            thread::spawn(move || engine.manual_stop_alert())
        };
        scheduler.run_pending();
        stopper.join().unwrap();

        let snap = engine.snapshot();
        assert!(!snap.is_alert_playing);
        let stop_lines = snap
            .recent_log
            .iter()
            .filter(|l| l.starts_with("Ringtone stopped"))
            .count();
        assert_eq!(stop_lines, 1);
    }
}

/// Accepts the first start and refuses the rest. The first `stop` parks
/// until the test lets it go, holding the engine's playback lock.
struct FlakySink {
    starts: AtomicUsize,
    parked: AtomicBool,
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl AlertSink for FlakySink {
    fn start(&self) -> Result<(), PlaybackError> {
        if self.starts.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(())
        } else {
            Err(PlaybackError::Unavailable("device busy".into()))
        }
    }

    fn stop(&self) {
        if !self.parked.swap(true, Ordering::SeqCst) {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(5))
                .unwrap();
        }
    }
}

fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn refused_start_reaches_the_tap_that_fired() {
    for _ in 0..20 {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let sink = Arc::new(FlakySink {
            starts: AtomicUsize::new(0),
            parked: AtomicBool::new(false),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        let engine = Engine::builder(CadenceConfig {
            trigger_threshold: 1,
            ..Default::default()
        })
        .clock(Arc::new(ManualClock::new(0)))
        .scheduler(Arc::new(ManualScheduler::new()))
        .sink(sink.clone())
        .build()
        .unwrap();
        engine.set_active(true);
        assert!(engine.record_tap(0, None).triggered());

        // The stop parks inside the sink while holding the playback lock.
        let stopper = {
            let engine = engine.clone();
            thread::spawn(move || engine.manual_stop_alert())
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let activator = {
            let engine = engine.clone();
            thread::spawn(move || engine.set_active(true))
        };
        let tapper = {
            let engine = engine.clone();
            thread::spawn(move || engine.record_tap(100, None))
        };
        wait_until(|| {
            let snap = engine.snapshot();
            snap.total_taps == 2 && snap.is_alert_playing
        });

        release_tx.send(()).unwrap();
        assert!(stopper.join().unwrap());
        activator.join().unwrap();
        let outcome = tapper.join().unwrap();

        let report = outcome.report().unwrap();
        assert!(report.triggered);
        assert!(
            matches!(report.alert, AlertOutcome::PlaybackUnavailable { .. }),
            "{:?}",
            report.alert
        );
        assert!(!engine.snapshot().is_alert_playing);
        assert_eq!(sink.starts.load(Ordering::SeqCst), 2);
    }
}

#[test]
fn thread_timer_auto_stops_outside_a_runtime() {
    let engine = Engine::builder(CadenceConfig {
        trigger_threshold: 1,
        alert_auto_stop_ms: 20,
        ..Default::default()
    })
    .build()
    .unwrap();
    engine.set_active(true);
    let outcome = engine.record_tap(engine.now_ms(), None);
    assert!(matches!(
        outcome.report().unwrap().alert,
        AlertOutcome::Started { .. }
    ));
    assert!(engine.snapshot().is_alert_playing);

    wait_until(|| !engine.snapshot().is_alert_playing);
    assert_eq!(
        engine.snapshot().recent_log[0],
        "Ringtone stopped (auto-stop)"
    );
}

#[tokio::test(start_paused = true)]
async fn tokio_timer_auto_stops_after_configured_delay() {
    let engine = Engine::builder(CadenceConfig::default())
        .scheduler(Arc::new(TokioScheduler::current().unwrap()))
        .build()
        .unwrap();
    engine.set_active(true);
    engine.record_tap(0, None);
    assert!(engine.record_tap(100, None).triggered());

    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert!(engine.snapshot().is_alert_playing);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!engine.snapshot().is_alert_playing);
}

#[tokio::test(start_paused = true)]
async fn tokio_timer_after_manual_stop_is_noop() {
    let engine = Engine::builder(CadenceConfig::default())
        .scheduler(Arc::new(TokioScheduler::current().unwrap()))
        .build()
        .unwrap();
    engine.set_active(true);
    engine.record_tap(0, None);
    engine.record_tap(100, None);

    tokio::time::sleep(Duration::from_millis(2_000)).await;
    assert!(engine.manual_stop_alert());

    // A new alert fires before the first timer would have elapsed.
    engine.record_tap(2_100, None);
    assert!(engine.record_tap(2_200, None).triggered());

    // First timer elapses at 5000 and must not stop the second alert.
    tokio::time::sleep(Duration::from_millis(3_100)).await;
    assert!(engine.snapshot().is_alert_playing);

    // Second timer elapses at 7000.
    tokio::time::sleep(Duration::from_millis(2_000)).await;
    assert!(!engine.snapshot().is_alert_playing);
}
