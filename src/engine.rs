//! Leash engine
//!
//! Owns the whole pipeline: the bounded queue producers push into, the
//! signal cache, the motion state, the settings snapshot, the facing
//! point and the output dispatcher. One worker thread consumes: drain a
//! batch, fold it into the state, resolve, smooth, dispatch. Resolution
//! runs on every tick while the leash is grabbed and moving, so smoothing
//! converges between transport updates.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::SignalCache;
use crate::config::{EngineConfig, MotionSettings};
use crate::dispatch::{ActorHandle, OutputDispatcher, OutputFrame, ParameterWriter};
use crate::error::{LeashError, Result};
use crate::movement;
use crate::queue::SignalQueue;
use crate::signal::{
    validate_sample, FacingPoint, LeashDirection, SignalName, SignalRole, SignalSample,
    SignalValue,
};
use crate::smoothing;
use crate::state::{Applied, MotionState, StateFlags};
use crate::turning;

/// Point-in-time engine counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Samples accepted into the queue.
    pub received: u64,
    /// Samples dropped at the full queue.
    pub dropped: u64,
    /// Samples applied to the motion state or facing point.
    pub applied: u64,
    /// Samples rejected by validation.
    pub rejected: u64,
    /// Resolved frames handed to the dispatcher.
    pub frames: u64,
    /// Successful channel emissions.
    pub emissions: u64,
    /// Actor sink failures recovered through the parameter fallback.
    pub fallbacks: u64,
    /// Cache entries evicted by cleanup sweeps.
    pub evictions: u64,
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    applied: AtomicU64,
    rejected: AtomicU64,
    frames: AtomicU64,
}

struct EngineShared {
    config: EngineConfig,
    queue: SignalQueue,
    cache: SignalCache,
    state: RwLock<MotionState>,
    settings: Mutex<MotionSettings>,
    facing: RwLock<FacingPoint>,
    dispatcher: OutputDispatcher,
    counters: Counters,
    running: AtomicBool,
}

/// Leash-driven motion resolution engine.
pub struct LeashEngine {
    shared: Arc<EngineShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LeashEngine {
    /// Build an engine over the given sinks.
    ///
    /// The settings are clamped into their valid ranges; the plumbing
    /// config must validate outright.
    pub fn new(
        config: EngineConfig,
        settings: MotionSettings,
        actor: Option<Arc<dyn ActorHandle>>,
        params: Arc<dyn ParameterWriter>,
    ) -> Result<Self> {
        config.validate()?;
        let settings = settings.sanitized();
        let facing = FacingPoint::new(settings.facing, settings.base_name.clone());
        let dispatcher = OutputDispatcher::new(
            actor,
            params,
            config.emit_threshold,
            config.run_transition_delay,
        );
        info!(
            base = %settings.base_name,
            facing = %settings.facing,
            capacity = config.queue_capacity,
            "leash engine created"
        );
        Ok(Self {
            shared: Arc::new(EngineShared {
                queue: SignalQueue::new(config.queue_capacity),
                cache: SignalCache::new(config.cache_cleanup_interval),
                state: RwLock::new(MotionState::new()),
                settings: Mutex::new(settings),
                facing: RwLock::new(facing),
                dispatcher,
                counters: Counters::default(),
                running: AtomicBool::new(false),
                config,
            }),
            worker: Mutex::new(None),
        })
    }

    /// Start the consumer loop. Errors when already running.
    pub fn start(&self) -> Result<()> {
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return Err(LeashError::Engine("already running".into()));
        }
        let shared = Arc::clone(&self.shared);
        let handle = thread::spawn(move || consumer_loop(shared));
        *self.worker.lock() = Some(handle);
        info!("leash engine started");
        Ok(())
    }

    /// Queue a sample from any producer thread.
    ///
    /// A full queue drops the sample and logs; the transport is never
    /// blocked.
    pub fn submit(&self, sample: SignalSample) {
        if self.shared.queue.push(sample) {
            self.shared.counters.received.fetch_add(1, Ordering::Relaxed);
        } else {
            let err = LeashError::QueueFull {
                capacity: self.shared.config.queue_capacity,
            };
            warn!(error = %err, "sample dropped");
        }
    }

    /// Replace the settings snapshot, clamping out-of-range values.
    ///
    /// A changed base name or configured facing also replaces the facing
    /// point.
    pub fn update_settings(&self, settings: MotionSettings) {
        let sanitized = settings.sanitized();
        if sanitized != settings {
            warn!("settings adjusted to valid ranges");
        }
        let mut facing = self.shared.facing.write();
        let mut current = self.shared.settings.lock();
        if current.facing != sanitized.facing || current.base_name != sanitized.base_name {
            *facing = FacingPoint::new(sanitized.facing, sanitized.base_name.clone());
        }
        *current = sanitized;
        debug!(base = %current.base_name, "settings updated");
    }

    /// Reset all motion state, e.g. when the controlled actor is swapped.
    pub fn on_avatar_change(&self) {
        info!("actor changed, resetting motion state");
        self.shared.state.write().reset();
        self.shared.dispatcher.reset();
    }

    /// Stop the consumer and emit a final neutral frame.
    ///
    /// Repeated calls are no-ops.
    pub fn stop(&self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
        self.shared.state.write().reset();
        self.shared.dispatcher.reset();
        self.shared.cache.clear();
        self.shared.queue.clear();
        info!("leash engine stopped");
    }

    /// True while the consumer loop is live.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Clone of the current motion state.
    pub fn state_snapshot(&self) -> MotionState {
        self.shared.state.read().clone()
    }

    /// Clone of the current settings snapshot.
    pub fn settings(&self) -> MotionSettings {
        self.shared.settings.lock().clone()
    }

    /// Current facing point.
    pub fn facing(&self) -> FacingPoint {
        self.shared.facing.read().clone()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.shared.counters.received.load(Ordering::Relaxed),
            dropped: self.shared.queue.dropped(),
            applied: self.shared.counters.applied.load(Ordering::Relaxed),
            rejected: self.shared.counters.rejected.load(Ordering::Relaxed),
            frames: self.shared.counters.frames.load(Ordering::Relaxed),
            emissions: self.shared.dispatcher.emissions(),
            fallbacks: self.shared.dispatcher.fallbacks(),
            evictions: self.shared.cache.evictions(),
        }
    }

    /// Number of entries in the signal cache.
    pub fn cache_len(&self) -> usize {
        self.shared.cache.len()
    }

    /// Latest cached value for a signal name.
    pub fn cache_value(&self, name: &str) -> Option<f32> {
        self.shared.cache.get(name)
    }
}

impl Drop for LeashEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Consumer loop
// ---------------------------------------------------------------------------

fn consumer_loop(shared: Arc<EngineShared>) {
    debug!("consumer loop entered");
    let mut batch = Vec::with_capacity(shared.config.batch_size);
    while shared.running.load(Ordering::Acquire) {
        let tick_start = Instant::now();
        let settings = { shared.settings.lock().clone() };
        shared.drain_and_apply(&mut batch, &settings);
        shared.resolve_tick(&settings, tick_start);
        let elapsed = tick_start.elapsed();
        if let Some(rest) = shared.config.tick_interval.checked_sub(elapsed) {
            thread::sleep(rest);
        }
    }
    debug!("consumer loop exited");
}

impl EngineShared {
    /// Drain one batch and fold it into the state under a single
    /// write-lock hold, so no other batch interleaves.
    fn drain_and_apply(&self, batch: &mut Vec<SignalSample>, settings: &MotionSettings) {
        batch.clear();
        if self.queue.drain_into(batch, self.config.batch_size) == 0 {
            return;
        }
        let mut state = self.state.write();
        for sample in batch.drain(..) {
            let role = match validate_sample(&sample) {
                Ok(role) => role,
                Err(err) => {
                    self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %err, "sample rejected");
                    continue;
                }
            };
            let parsed = SignalName::parse(&sample.name);
            if let SignalValue::Float(v) = sample.value {
                self.cache.update(&sample.name, v, &settings.base_name);
            }
            if parsed.direction != LeashDirection::None {
                let mut facing = self.facing.write();
                if facing.observe(parsed.direction, parsed.base) {
                    debug!(direction = %parsed.direction, base = parsed.base, "facing adopted from signal group");
                }
            }
            match role {
                SignalRole::Direction => {
                    if let SignalValue::Float(v) = sample.value {
                        if let Some(direction) = LeashDirection::from_index(v.round() as i32) {
                            self.facing.write().set(direction, parsed.base);
                            debug!(%direction, "facing updated from direction signal");
                        }
                    }
                }
                role => {
                    let outcome = state.apply(role, sample.value);
                    if settings.debug_logging {
                        debug!(name = %sample.name, ?outcome, "sample applied");
                    }
                    if outcome == Applied::Released {
                        // Outputs must go neutral before the next tick.
                        self.dispatcher.reset();
                    }
                }
            }
            self.counters.applied.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Resolve and dispatch one frame while grabbed and moving.
    fn resolve_tick(&self, settings: &MotionSettings, now: Instant) {
        let mut state = self.state.write();
        if !state.is_grabbed() || !state.is_moving() {
            return;
        }
        let (force, delta_time) = movement::resolve_force(&mut state, settings, now);
        let magnitude = force.length();

        let was_running = state.flags.contains(StateFlags::RUNNING);
        let running = smoothing::update_run_gait(was_running, magnitude, settings.run_deadzone);
        state.flags.set(StateFlags::RUNNING, running);

        let facing = self.facing.read().direction;
        let turn = turning::resolve_turn(&mut state, force, facing, settings, delta_time);

        let target = smoothing::curve(force, settings);
        let movement = smoothing::interpolate(state.current_movement, target, settings, delta_time);
        state.current_movement = movement;

        // x drives strafe, z drives forward; y only shapes the others.
        let (mut vertical, mut horizontal) = (movement.z, movement.x);
        if movement.length() < settings.walk_deadzone {
            vertical = 0.0;
            horizontal = 0.0;
        }
        drop(state);

        self.counters.frames.fetch_add(1, Ordering::Relaxed);
        self.dispatcher.emit(OutputFrame {
            vertical,
            horizontal,
            turn,
            running,
            turning_enabled: settings.turning_enabled,
        });
    }
}
