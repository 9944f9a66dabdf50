use std::collections::HashMap;

use anyhow::{bail, Context};

use cocos_bridge::actions::NativeActions;
use cocos_bridge::dispatch::{DispatchArgs, EntryPointKey, NativeTarget, TargetId};
use cocos_bridge::handle::{Handle, NativeObject, NodeRef, NsNumber};
use cocos_bridge::marshal::{NativeHandleBuffer, NativeMenu};
use cocos_bridge::scheduler::{NativeScheduler, ScheduleRequest, REPEAT_FOREVER};

use crate::node::HeadlessNode;

/// Handles are spaced so they never collide with small integers.
const HANDLE_STRIDE: usize = 0x10;

// ── ScheduledTimer ────────────────────────────────────────────────────────

/// Per-target timer state.
///
/// A timer with `repeat = n` runs `n + 1` times; `REPEAT_FOREVER` runs until
/// unscheduled. With a positive delay the first run waits `delay` seconds,
/// later runs wait `interval`. Callbacks receive the accumulated elapsed time.
#[derive(Debug)]
struct ScheduledTimer {
    key: EntryPointKey,
    target: NativeTarget,
    interval: f32,
    repeat: u32,
    delay: f32,
    paused: bool,
    elapsed: f32,
    runs: u64,
    use_delay: bool,
}

impl ScheduledTimer {
    fn new(key: EntryPointKey, target: NativeTarget, request: ScheduleRequest) -> Self {
        Self {
            key,
            target,
            interval: request.interval,
            repeat: request.repeat,
            delay: request.delay,
            paused: request.paused,
            elapsed: 0.0,
            runs: 0,
            use_delay: request.delay > 0.0,
        }
    }

    /// Advances by `dt`; returns `true` once the timer has run its course.
    fn update(&mut self, dt: f32) -> anyhow::Result<bool> {
        if self.paused {
            return Ok(false);
        }
        self.elapsed += dt;

        if self.use_delay {
            if self.elapsed < self.delay {
                return Ok(false);
            }
            self.fire()?;
            self.elapsed -= self.delay;
            self.use_delay = false;
        } else {
            if self.elapsed < self.interval {
                return Ok(false);
            }
            self.fire()?;
            self.elapsed = 0.0;
        }

        Ok(self.repeat != REPEAT_FOREVER && self.runs > u64::from(self.repeat))
    }

    fn fire(&mut self) -> anyhow::Result<()> {
        self.runs += 1;
        self.target
            .perform(self.key.selector(), DispatchArgs::Delta(self.elapsed))
            .with_context(|| format!("timer {:?} failed to dispatch", self.target.id()))
    }
}

// ── native objects ────────────────────────────────────────────────────────

/// Kind of native object built around a callback target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    CallFunc,
    CallFuncN,
    Timer,
    MenuItemLabel { label: Handle },
    MenuItemImage { normal: String, selected: String, disabled: Option<String> },
}

#[derive(Debug)]
struct NativeEntry {
    kind: ObjectKind,
    key: EntryPointKey,
    target: NativeTarget,
}

/// Which grouping entry point a menu call reached.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Axis {
    Columns,
    Rows,
}

/// A menu grouping request as the engine decoded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    pub axis: Axis,
    /// Group sizes, the leading argument first.
    pub counts: Vec<u32>,
}

// ── HeadlessEngine ────────────────────────────────────────────────────────

/// In-process engine implementing every collaborator the bridge talks to.
///
/// It owns its timers and native objects, and with them the retained
/// callback targets; dropping an entry drops the closure.
#[derive(Debug, Default)]
pub struct HeadlessEngine {
    timers: Vec<ScheduledTimer>,
    objects: HashMap<Handle, NativeEntry>,
    numbers: HashMap<Handle, u32>,
    alignments: Vec<Alignment>,
    next_handle: usize,
    frames: u64,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_handle(&mut self) -> Handle {
        self.next_handle += 1;
        Handle::from_addr(self.next_handle * HANDLE_STRIDE)
    }

    pub fn create_node(&mut self) -> HeadlessNode {
        HeadlessNode::new(self.alloc_handle())
    }

    /// Boxes `value` as a native number.
    pub fn number(&mut self, value: u32) -> NsNumber {
        let handle = self.alloc_handle();
        self.numbers.insert(handle, value);
        NsNumber::from_handle(handle)
    }

    // ── scheduler ─────────────────────────────────────────────────────────

    /// Advances every live timer by `dt` seconds.
    ///
    /// Finished timers, and timers whose callback could not be dispatched,
    /// are removed and their targets released.
    pub fn tick(&mut self, dt: f32) {
        self.frames += 1;
        self.timers.retain_mut(|timer| match timer.update(dt) {
            Ok(done) => {
                if done {
                    log::debug!("timer {:?} finished after {} run(s)", timer.target.id(), timer.runs);
                }
                !done
            }
            Err(e) => {
                log::error!("{e:#}");
                false
            }
        });
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn scheduled_count(&self) -> usize {
        self.timers.len()
    }

    pub fn is_scheduled(&self, target: TargetId) -> bool {
        self.timers.iter().any(|t| t.target.id() == target)
    }

    pub fn is_paused(&self, target: TargetId) -> Option<bool> {
        self.timers.iter().find(|t| t.target.id() == target).map(|t| t.paused)
    }

    pub fn pause_target(&mut self, target: TargetId) {
        self.set_paused(target, true);
    }

    pub fn resume_target(&mut self, target: TargetId) {
        self.set_paused(target, false);
    }

    /// Resumes every paused timer, as when a whole scene goes on stage.
    pub fn resume_all(&mut self) {
        for timer in &mut self.timers {
            timer.paused = false;
        }
    }

    fn set_paused(&mut self, target: TargetId, paused: bool) {
        for timer in self.timers.iter_mut().filter(|t| t.target.id() == target) {
            timer.paused = paused;
        }
    }

    // ── native objects ────────────────────────────────────────────────────

    fn register(&mut self, kind: ObjectKind, target: NativeTarget, key: EntryPointKey) -> anyhow::Result<Handle> {
        if target.key() != key {
            bail!("{kind:?} built with `{key}` but target answers `{}`", target.key());
        }
        let handle = self.alloc_handle();
        log::debug!("created {kind:?} {handle:?} for {:?}", target.id());
        self.objects.insert(handle, NativeEntry { kind, key, target });
        Ok(handle)
    }

    pub fn object_kind(&self, handle: Handle) -> Option<&ObjectKind> {
        self.objects.get(&handle).map(|e| &e.kind)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Runs an instant action on `node`. The action is released afterwards.
    pub fn run_action(&mut self, action: Handle, node: &HeadlessNode) -> anyhow::Result<()> {
        let entry = self.objects.remove(&action).with_context(|| format!("no action {action:?}"))?;
        let args = match entry.kind {
            ObjectKind::CallFunc => DispatchArgs::None,
            ObjectKind::CallFuncN => DispatchArgs::Node(node.node_ref()),
            other => bail!("{action:?} is a {other:?}, not an action"),
        };
        entry.target.perform(entry.key.selector(), args)?;
        Ok(())
    }

    /// Fires a native timer once. Timers stay alive until released.
    pub fn fire_timer(&mut self, timer: Handle) -> anyhow::Result<()> {
        let entry = self.objects.get(&timer).with_context(|| format!("no timer {timer:?}"))?;
        if entry.kind != ObjectKind::Timer {
            bail!("{timer:?} is a {:?}, not a timer", entry.kind);
        }
        entry.target.perform(entry.key.selector(), DispatchArgs::None)?;
        Ok(())
    }

    /// Activates a menu item; its callback receives the item as sender.
    pub fn activate(&mut self, item: Handle) -> anyhow::Result<()> {
        let entry = self.objects.get(&item).with_context(|| format!("no menu item {item:?}"))?;
        match entry.kind {
            ObjectKind::MenuItemLabel { .. } | ObjectKind::MenuItemImage { .. } => {}
            ref other => bail!("{item:?} is a {other:?}, not a menu item"),
        }
        let sender = NodeRef::from_handle(item);
        entry.target.perform(entry.key.selector(), DispatchArgs::Node(sender))?;
        Ok(())
    }

    /// Destroys a native object, releasing its callback.
    pub fn release(&mut self, handle: Handle) -> bool {
        self.objects.remove(&handle).is_some()
    }

    // ── menu ──────────────────────────────────────────────────────────────

    pub fn alignments(&self) -> &[Alignment] {
        &self.alignments
    }

    fn record_alignment(&mut self, axis: Axis, first: &NsNumber, rest: &NativeHandleBuffer) -> anyhow::Result<()> {
        let mut counts = vec![self.unbox(first.handle())?];
        // Walk the array the way native code does: up to the null slot.
        let mut cursor = rest.as_ptr();
        loop {
            // SAFETY: the buffer is null-terminated and outlives this call.
            let handle = unsafe { *cursor };
            if handle.is_null() {
                break;
            }
            counts.push(self.unbox(handle)?);
            // SAFETY: a non-null slot is never the last one.
            cursor = unsafe { cursor.add(1) };
        }
        log::debug!("align {axis:?}: {counts:?}");
        self.alignments.push(Alignment { axis, counts });
        Ok(())
    }

    fn unbox(&self, handle: Handle) -> anyhow::Result<u32> {
        self.numbers
            .get(&handle)
            .copied()
            .with_context(|| format!("{handle:?} is not a number"))
    }
}

impl NativeScheduler for HeadlessEngine {
    /// A target already scheduled under `key` gets its timing replaced.
    fn schedule_selector(
        &mut self,
        key: EntryPointKey,
        target: NativeTarget,
        request: ScheduleRequest,
    ) -> anyhow::Result<()> {
        if key != EntryPointKey::ApplyWithDelta {
            bail!("scheduler callbacks take a delta, got `{key}`");
        }
        if request.interval < 0.0 || request.delay < 0.0 {
            bail!("negative interval or delay: {request:?}");
        }

        let timer = ScheduledTimer::new(key, target, request);
        let id = timer.target.id();
        match self.timers.iter_mut().find(|t| t.key == key && t.target.id() == id) {
            Some(existing) => {
                log::debug!("{id:?} already scheduled, updating timing");
                *existing = timer;
            }
            None => self.timers.push(timer),
        }
        Ok(())
    }

    fn unschedule(&mut self, key: EntryPointKey, target: TargetId) -> anyhow::Result<()> {
        let before = self.timers.len();
        self.timers.retain(|t| !(t.key == key && t.target.id() == target));
        if self.timers.len() == before {
            log::debug!("unschedule: {target:?} was not scheduled");
        }
        Ok(())
    }
}

impl NativeMenu for HeadlessEngine {
    fn align_items_in_columns(&mut self, first: &NsNumber, rest: &NativeHandleBuffer) -> anyhow::Result<()> {
        self.record_alignment(Axis::Columns, first, rest)
    }

    fn align_items_in_rows(&mut self, first: &NsNumber, rest: &NativeHandleBuffer) -> anyhow::Result<()> {
        self.record_alignment(Axis::Rows, first, rest)
    }
}

impl NativeActions for HeadlessEngine {
    fn call_func(&mut self, target: NativeTarget, key: EntryPointKey) -> anyhow::Result<Handle> {
        self.register(ObjectKind::CallFunc, target, key)
    }

    fn call_func_n(&mut self, target: NativeTarget, key: EntryPointKey) -> anyhow::Result<Handle> {
        self.register(ObjectKind::CallFuncN, target, key)
    }

    fn timer(&mut self, target: NativeTarget, key: EntryPointKey) -> anyhow::Result<Handle> {
        self.register(ObjectKind::Timer, target, key)
    }

    fn menu_item_label(
        &mut self,
        label: Handle,
        target: NativeTarget,
        key: EntryPointKey,
    ) -> anyhow::Result<Handle> {
        self.register(ObjectKind::MenuItemLabel { label }, target, key)
    }

    fn menu_item_image(
        &mut self,
        normal_image: &str,
        selected_image: &str,
        disabled_image: Option<&str>,
        target: NativeTarget,
        key: EntryPointKey,
    ) -> anyhow::Result<Handle> {
        let kind = ObjectKind::MenuItemImage {
            normal: normal_image.to_owned(),
            selected: selected_image.to_owned(),
            disabled: disabled_image.map(str::to_owned),
        };
        self.register(kind, target, key)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use cocos_bridge::dispatch::DeltaDispatcher;
    use cocos_bridge::scheduler::{Repeat, Timing};

    use super::*;

    fn recording() -> (Rc<RefCell<Vec<f32>>>, impl FnMut(f32) + 'static) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        (log, move |dt| sink.borrow_mut().push(dt))
    }

    fn schedule(engine: &mut HeadlessEngine, timing: Timing, paused: bool) -> (Rc<RefCell<Vec<f32>>>, TargetId) {
        let (log, cb) = recording();
        let token = DeltaDispatcher::new(cb);
        engine
            .schedule_selector(EntryPointKey::ApplyWithDelta, token.target(), timing.request(paused))
            .unwrap();
        (log, token.id())
    }

    #[test]
    fn every_tick_forever() {
        let mut engine = HeadlessEngine::new();
        let (log, _) = schedule(&mut engine, Timing::default(), false);
        for _ in 0..5 {
            engine.tick(0.5);
        }
        assert_eq!(*log.borrow(), vec![0.5; 5]);
        assert_eq!(engine.scheduled_count(), 1);
    }

    #[test]
    fn repeat_n_runs_n_plus_one_times() {
        let mut engine = HeadlessEngine::new();
        let (log, _) = schedule(&mut engine, Timing::new().repeat(Repeat::Times(2)), false);
        for _ in 0..10 {
            engine.tick(0.1);
        }
        assert_eq!(log.borrow().len(), 3);
        assert_eq!(engine.scheduled_count(), 0);
    }

    #[test]
    fn interval_accumulates_ticks() {
        let mut engine = HeadlessEngine::new();
        let (log, _) = schedule(&mut engine, Timing::new().interval(1.0), false);
        for _ in 0..8 {
            engine.tick(0.25);
        }
        assert_eq!(*log.borrow(), vec![1.0, 1.0]);
    }

    #[test]
    fn once_waits_for_delay() {
        let mut engine = HeadlessEngine::new();
        let (log, _) = schedule(&mut engine, Timing::once(1.0), false);
        engine.tick(0.5);
        assert!(log.borrow().is_empty());
        engine.tick(0.5);
        engine.tick(0.5);
        assert_eq!(*log.borrow(), vec![1.0]);
        assert_eq!(engine.scheduled_count(), 0);
    }

    #[test]
    fn paused_timer_waits_for_resume() {
        let mut engine = HeadlessEngine::new();
        let (log, id) = schedule(&mut engine, Timing::default(), true);
        engine.tick(0.1);
        assert!(log.borrow().is_empty());
        assert_eq!(engine.is_paused(id), Some(true));

        engine.resume_target(id);
        engine.tick(0.1);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn unschedule_releases_the_target() {
        let mut engine = HeadlessEngine::new();
        let token = DeltaDispatcher::new(|_| {});
        engine
            .schedule_selector(token.key(), token.target(), Timing::default().request(false))
            .unwrap();
        assert_eq!(token.retain_count(), 2);
        engine.unschedule(token.key(), token.id()).unwrap();
        assert_eq!(token.retain_count(), 1);
        assert!(!engine.is_scheduled(token.id()));
    }

    #[test]
    fn rescheduling_replaces_timing() {
        let mut engine = HeadlessEngine::new();
        let token = DeltaDispatcher::new(|_| {});
        engine
            .schedule_selector(token.key(), token.target(), Timing::default().request(true))
            .unwrap();
        engine
            .schedule_selector(token.key(), token.target(), Timing::once(2.0).request(false))
            .unwrap();
        assert_eq!(engine.scheduled_count(), 1);
        assert_eq!(engine.is_paused(token.id()), Some(false));
        assert_eq!(token.retain_count(), 2);
    }

    #[test]
    fn rejects_non_delta_entry_points() {
        let mut engine = HeadlessEngine::new();
        let token = DeltaDispatcher::new(|_| {});
        let err = engine
            .schedule_selector(EntryPointKey::Apply, token.target(), Timing::default().request(false))
            .unwrap_err();
        assert!(err.to_string().contains("apply()"));
        assert_eq!(token.retain_count(), 1);
    }
}
