//! Output dispatch
//!
//! The dispatcher is the crate's only asynchronous boundary. Analog
//! channels are re-sent only when they moved past the configured
//! threshold; run transitions always go out immediately, and the axis
//! values accompanying one are deferred briefly so the gait change lands
//! first on the receiving end. Sink failures are caught and retried once
//! through the named-parameter fallback, never propagated.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::math::{clamp_axis, finite_or_zero};

/// Outbound channel addresses understood by the parameter fallback.
pub mod address {
    /// Forward/backward locomotion axis.
    pub const VERTICAL: &str = "/input/Vertical";
    /// Left/right locomotion axis.
    pub const HORIZONTAL: &str = "/input/Horizontal";
    /// Turn-rate command.
    pub const LOOK_HORIZONTAL: &str = "/input/LookHorizontal";
    /// Run gait toggle.
    pub const RUN: &str = "/input/Run";
}

/// Primary locomotion sink, typically the host's player handle.
pub trait ActorHandle: Send + Sync {
    /// Drive the forward/backward axis, value in [-1, 1].
    fn move_vertical(&self, value: f32) -> Result<()>;
    /// Drive the left/right axis, value in [-1, 1].
    fn move_horizontal(&self, value: f32) -> Result<()>;
    /// Drive the turn-rate command, degrees.
    fn look_horizontal(&self, value: f32) -> Result<()>;
    /// Engage the run gait.
    fn run(&self) -> Result<()>;
    /// Release the run gait.
    fn stop_run(&self) -> Result<()>;
}

/// Fallback sink writing named parameters directly to the transport.
pub trait ParameterWriter: Send + Sync {
    /// Write a float-valued output parameter.
    fn write_float(&self, address: &str, value: f32) -> Result<()>;
    /// Write a bool-valued output parameter.
    fn write_bool(&self, address: &str, value: bool) -> Result<()>;
}

/// One resolved output frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputFrame {
    /// Forward/backward axis.
    pub vertical: f32,
    /// Left/right axis.
    pub horizontal: f32,
    /// Turn command, degrees.
    pub turn: f32,
    /// Run gait.
    pub running: bool,
    /// Whether the turn channel should be driven at all.
    pub turning_enabled: bool,
}

// ---------------------------------------------------------------------------
// Internals shared by the immediate and deferred paths
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Vertical,
    Horizontal,
    LookHorizontal,
}

impl Channel {
    fn address(self) -> &'static str {
        match self {
            Channel::Vertical => address::VERTICAL,
            Channel::Horizontal => address::HORIZONTAL,
            Channel::LookHorizontal => address::LOOK_HORIZONTAL,
        }
    }
}

/// Axis portion of a frame, deliverable immediately or deferred.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisFrame {
    vertical: f32,
    horizontal: f32,
    turn: f32,
    drive_turn: bool,
}

#[derive(Debug, Default, Clone, Copy)]
struct LastEmitted {
    vertical: Option<f32>,
    horizontal: Option<f32>,
    turn: Option<f32>,
    running: Option<bool>,
}

struct DispatchCore {
    actor: Option<Arc<dyn ActorHandle>>,
    params: Arc<dyn ParameterWriter>,
    threshold: f32,
    last: Mutex<LastEmitted>,
    emissions: AtomicU64,
    fallbacks: AtomicU64,
}

impl DispatchCore {
    fn send_axes(&self, frame: AxisFrame) {
        let mut last = self.last.lock();
        if delta_exceeds(last.vertical, frame.vertical, self.threshold) {
            self.deliver_float(Channel::Vertical, frame.vertical);
            last.vertical = Some(frame.vertical);
        }
        if delta_exceeds(last.horizontal, frame.horizontal, self.threshold) {
            self.deliver_float(Channel::Horizontal, frame.horizontal);
            last.horizontal = Some(frame.horizontal);
        }
        if frame.drive_turn && delta_exceeds(last.turn, frame.turn, self.threshold) {
            self.deliver_float(Channel::LookHorizontal, frame.turn);
            last.turn = Some(frame.turn);
        }
    }

    fn deliver_float(&self, channel: Channel, value: f32) {
        if let Some(actor) = &self.actor {
            let sent = match channel {
                Channel::Vertical => actor.move_vertical(value),
                Channel::Horizontal => actor.move_horizontal(value),
                Channel::LookHorizontal => actor.look_horizontal(value),
            };
            match sent {
                Ok(()) => {
                    self.emissions.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                Err(err) => {
                    self.fallbacks.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        channel = channel.address(),
                        error = %err,
                        "actor sink failed, falling back to parameter write"
                    );
                }
            }
        }
        match self.params.write_float(channel.address(), value) {
            Ok(()) => {
                self.emissions.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                error!(
                    channel = channel.address(),
                    error = %err,
                    "parameter fallback failed, output dropped"
                );
            }
        }
    }

    fn deliver_run(&self, running: bool) {
        if let Some(actor) = &self.actor {
            let sent = if running { actor.run() } else { actor.stop_run() };
            match sent {
                Ok(()) => {
                    self.emissions.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                Err(err) => {
                    self.fallbacks.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        channel = address::RUN,
                        error = %err,
                        "actor sink failed, falling back to parameter write"
                    );
                }
            }
        }
        match self.params.write_bool(address::RUN, running) {
            Ok(()) => {
                self.emissions.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                error!(
                    channel = address::RUN,
                    error = %err,
                    "parameter fallback failed, output dropped"
                );
            }
        }
    }
}

fn delta_exceeds(last: Option<f32>, value: f32, threshold: f32) -> bool {
    match last {
        Some(prev) => (value - prev).abs() > threshold,
        None => true,
    }
}

// ---------------------------------------------------------------------------
// Deferred emission
// ---------------------------------------------------------------------------

struct DeferShared {
    core: Arc<DispatchCore>,
    delay: Duration,
    slot: Mutex<Option<(Instant, AxisFrame)>>,
    signal: Condvar,
    shutdown: AtomicBool,
}

/// One-slot deferred axis emission with last-writer-wins semantics.
struct DeferredEmitter {
    shared: Arc<DeferShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DeferredEmitter {
    fn new(core: Arc<DispatchCore>, delay: Duration) -> Self {
        let shared = Arc::new(DeferShared {
            core,
            delay,
            slot: Mutex::new(None),
            signal: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = thread::spawn(move || defer_loop(worker_shared));
        Self {
            shared,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Replace whatever is pending with `frame`, due after the delay.
    fn schedule(&self, frame: AxisFrame) {
        let mut slot = self.shared.slot.lock();
        *slot = Some((Instant::now() + self.shared.delay, frame));
        self.shared.signal.notify_one();
    }

    /// Drop any pending frame.
    fn cancel(&self) {
        let mut slot = self.shared.slot.lock();
        *slot = None;
        self.shared.signal.notify_one();
    }

    fn stop(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.signal.notify_one();
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

fn defer_loop(shared: Arc<DeferShared>) {
    let mut slot = shared.slot.lock();
    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            return;
        }
        match *slot {
            Some((deadline, frame)) => {
                if Instant::now() >= deadline {
                    *slot = None;
                    // Fire outside the slot lock so schedule() never waits
                    // on a sink.
                    drop(slot);
                    shared.core.send_axes(frame);
                    slot = shared.slot.lock();
                } else {
                    let _ = shared.signal.wait_until(&mut slot, deadline);
                }
            }
            None => {
                shared.signal.wait(&mut slot);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Gated, fault-tolerant emitter for resolved output frames.
pub struct OutputDispatcher {
    core: Arc<DispatchCore>,
    defer: DeferredEmitter,
}

impl OutputDispatcher {
    /// Build a dispatcher over the given sinks.
    ///
    /// `threshold` gates analog re-emission; `delay` is the settle time
    /// between a gait change and its accompanying axis values.
    pub fn new(
        actor: Option<Arc<dyn ActorHandle>>,
        params: Arc<dyn ParameterWriter>,
        threshold: f32,
        delay: Duration,
    ) -> Self {
        let core = Arc::new(DispatchCore {
            actor,
            params,
            threshold,
            last: Mutex::new(LastEmitted::default()),
            emissions: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
        });
        let defer = DeferredEmitter::new(Arc::clone(&core), delay);
        Self { core, defer }
    }

    /// Emit a resolved frame through gating, fallback and deferral.
    pub fn emit(&self, frame: OutputFrame) {
        let axes = AxisFrame {
            vertical: clamp_axis(frame.vertical),
            horizontal: clamp_axis(frame.horizontal),
            turn: finite_or_zero(frame.turn),
            drive_turn: frame.turning_enabled,
        };
        let run_changed = {
            let mut last = self.core.last.lock();
            let changed = last.running != Some(frame.running);
            if changed {
                last.running = Some(frame.running);
            }
            changed
        };
        if run_changed {
            // Gait first; the axis values follow after the settle delay.
            self.core.deliver_run(frame.running);
            debug!(running = frame.running, "run transition emitted");
            self.defer.schedule(axes);
        } else {
            self.defer.cancel();
            self.core.send_axes(axes);
        }
    }

    /// Drop any pending deferred frame and force every channel neutral.
    ///
    /// Bypasses the change thresholds and clears the last-emitted cache,
    /// so the frame after a reset re-establishes every channel. Used on
    /// release, actor change and engine stop; safe to call repeatedly.
    pub fn reset(&self) {
        self.defer.cancel();
        *self.core.last.lock() = LastEmitted::default();
        self.core.deliver_float(Channel::Vertical, 0.0);
        self.core.deliver_float(Channel::Horizontal, 0.0);
        self.core.deliver_float(Channel::LookHorizontal, 0.0);
        self.core.deliver_run(false);
    }

    /// Successful channel emissions so far.
    pub fn emissions(&self) -> u64 {
        self.core.emissions.load(Ordering::Relaxed)
    }

    /// Actor sink failures recovered through the parameter fallback.
    pub fn fallbacks(&self) -> u64 {
        self.core.fallbacks.load(Ordering::Relaxed)
    }
}

impl Drop for OutputDispatcher {
    fn drop(&mut self) {
        self.defer.stop();
    }
}
