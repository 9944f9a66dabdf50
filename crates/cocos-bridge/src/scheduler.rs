//! Scheduling facade.
//!
//! Wraps the engine's "schedule by entry-point key" primitive with default
//! parameters, the repeat-forever sentinel, and node-bound scheduling that
//! derives its paused state from the node.
//!
//! The scheduler is an explicit value ([`Scheduler`]) rather than a
//! process-wide singleton; node-bound calls borrow it.

use crate::dispatch::{DeltaDispatcher, Dispatcher, EntryPointKey, NativeTarget, TargetId, Token};
use crate::error::Result;

/// Repeat count meaning "run until unscheduled".
///
/// One below `u32::MAX`, matching the native scheduler's own constant.
pub const REPEAT_FOREVER: u32 = u32::MAX - 1;

// ── Repeat ────────────────────────────────────────────────────────────────

/// How many times a callback repeats after its first run.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Repeat {
    #[default]
    Forever,
    /// Repeats `n` more times. Values are passed to the engine unchanged.
    Times(u32),
}

impl Repeat {
    /// The raw count handed to the native scheduler.
    pub const fn count(self) -> u32 {
        match self {
            Repeat::Forever => REPEAT_FOREVER,
            Repeat::Times(n) => n,
        }
    }

    pub const fn from_count(count: u32) -> Self {
        if count == REPEAT_FOREVER { Repeat::Forever } else { Repeat::Times(count) }
    }
}

// ── Timing ────────────────────────────────────────────────────────────────

/// Interval, repeat and delay of a scheduled callback.
///
/// `Timing::default()` runs every tick, forever, with no initial delay.
///
/// ```
/// use cocos_bridge::scheduler::{Repeat, Timing};
///
/// let t = Timing::new().interval(0.5).repeat(Repeat::Times(3)).delay(1.0);
/// assert_eq!(t.repeat.count(), 3);
/// ```
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Timing {
    /// Seconds between runs; `0` runs every tick.
    pub interval: f32,
    pub repeat: Repeat,
    /// Seconds before the first run.
    pub delay: f32,
}

impl Timing {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// A single run after `delay` seconds.
    #[inline]
    pub fn once(delay: f32) -> Self {
        Self::default().repeat(Repeat::Times(0)).delay(delay)
    }

    pub fn interval(mut self, seconds: f32) -> Self {
        self.interval = seconds;
        self
    }

    pub fn repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn delay(mut self, seconds: f32) -> Self {
        self.delay = seconds;
        self
    }

    /// Completes the timing with an initial paused state.
    #[inline]
    pub fn request(self, paused: bool) -> ScheduleRequest {
        ScheduleRequest {
            interval: self.interval,
            paused,
            repeat: self.repeat.count(),
            delay: self.delay,
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self { interval: 0.0, repeat: Repeat::Forever, delay: 0.0 }
    }
}

/// Parameters of one call to the native scheduling primitive.
///
/// Built per call and handed straight to the engine; the facade never keeps it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScheduleRequest {
    pub interval: f32,
    pub paused: bool,
    pub repeat: u32,
    pub delay: f32,
}

// ── Native collaborator ───────────────────────────────────────────────────

/// The engine's scheduling primitive.
///
/// Validation, timing and cancellation semantics belong to the implementor;
/// the facade forwards requests and passes failures through unexamined.
pub trait NativeScheduler {
    /// Registers `target` to be invoked through `key` per `request`.
    ///
    /// The implementor keeps `target` for as long as the schedule is live.
    fn schedule_selector(
        &mut self,
        key: EntryPointKey,
        target: NativeTarget,
        request: ScheduleRequest,
    ) -> anyhow::Result<()>;

    /// Removes the schedule registered for `target` under `key`, releasing it.
    fn unschedule(&mut self, key: EntryPointKey, target: TargetId) -> anyhow::Result<()>;
}

impl<T: NativeScheduler + ?Sized> NativeScheduler for &mut T {
    fn schedule_selector(
        &mut self,
        key: EntryPointKey,
        target: NativeTarget,
        request: ScheduleRequest,
    ) -> anyhow::Result<()> {
        (**self).schedule_selector(key, target, request)
    }

    fn unschedule(&mut self, key: EntryPointKey, target: TargetId) -> anyhow::Result<()> {
        (**self).unschedule(key, target)
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────────

/// Free-standing scheduler context.
///
/// Schedules closures directly and returns their tokens so callers can later
/// reschedule or unschedule them through the lower-level primitives.
#[derive(Debug)]
pub struct Scheduler<E> {
    engine: E,
}

impl<E: NativeScheduler> Scheduler<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_inner(self) -> E {
        self.engine
    }

    /// Schedules `callback` every tick, forever, unpaused.
    pub fn schedule(&mut self, callback: impl FnMut(f32) + 'static) -> Result<Token<DeltaDispatcher>> {
        self.schedule_with(callback, Timing::default(), false)
    }

    /// Schedules `callback` with explicit timing and initial paused state.
    pub fn schedule_with(
        &mut self,
        callback: impl FnMut(f32) + 'static,
        timing: Timing,
        paused: bool,
    ) -> Result<Token<DeltaDispatcher>> {
        let token = DeltaDispatcher::new(callback);
        self.schedule_selector(&token, timing.request(paused))?;
        Ok(token)
    }

    /// Lower-level primitive: (re)schedules an existing token.
    pub fn schedule_selector(
        &mut self,
        token: &Token<DeltaDispatcher>,
        request: ScheduleRequest,
    ) -> Result<()> {
        log::debug!(
            "schedule `{}` {:?}: interval={}s repeat={} delay={}s paused={}",
            DeltaDispatcher::KEY,
            token.id(),
            request.interval,
            request.repeat,
            request.delay,
            request.paused,
        );
        self.engine.schedule_selector(DeltaDispatcher::KEY, token.target(), request)?;
        Ok(())
    }

    /// Lower-level primitive: removes the schedule for `token`.
    pub fn unschedule(&mut self, token: &Token<DeltaDispatcher>) -> Result<()> {
        log::debug!("unschedule `{}` {:?}", DeltaDispatcher::KEY, token.id());
        self.engine.unschedule(DeltaDispatcher::KEY, token.id())?;
        Ok(())
    }
}

// ── Node-bound scheduling ─────────────────────────────────────────────────

/// The one piece of node state the facade reads.
pub trait SceneNode {
    /// Whether the node is currently part of the running scene graph.
    fn is_running(&self) -> bool;
}

/// Scheduling entry points bound to a scene node.
///
/// The schedule starts paused when the node is not running. That state is
/// read once, at call time; the engine resumes the target when the node
/// enters the running graph. Tokens are retained by the engine only.
pub trait NodeScheduleExt: SceneNode {
    /// Schedules `callback` every tick, forever.
    fn schedule<E: NativeScheduler>(
        &self,
        scheduler: &mut Scheduler<E>,
        callback: impl FnMut(f32) + 'static,
    ) -> Result<()> {
        self.schedule_with(scheduler, callback, Timing::default())
    }

    fn schedule_with<E: NativeScheduler>(
        &self,
        scheduler: &mut Scheduler<E>,
        callback: impl FnMut(f32) + 'static,
        timing: Timing,
    ) -> Result<()> {
        let paused = !self.is_running();
        scheduler.schedule_with(callback, timing, paused)?;
        Ok(())
    }

    /// Runs `callback` once after `delay` seconds.
    fn schedule_once<E: NativeScheduler>(
        &self,
        scheduler: &mut Scheduler<E>,
        callback: impl FnMut(f32) + 'static,
        delay: f32,
    ) -> Result<()> {
        self.schedule_with(scheduler, callback, Timing::once(delay))
    }
}

impl<N: SceneNode + ?Sized> NodeScheduleExt for N {}
