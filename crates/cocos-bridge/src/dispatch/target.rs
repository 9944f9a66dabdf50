use core::ffi::c_void;
use core::fmt;
use core::mem::ManuallyDrop;
use core::ptr::NonNull;
use std::rc::Rc;

use crate::error::{BridgeError, Result};
use crate::handle::{Handle, NativeObject, NodeRef};

use super::key::{DispatchArgs, EntryPointKey};
use super::token::Dispatcher;

/// `apply` on a retained target.
pub type ApplyFn = unsafe extern "C" fn(object: *const c_void);
/// `apply:` with a node on a retained target.
pub type ApplyWithNodeFn = unsafe extern "C" fn(object: *const c_void, node: Handle);
/// `apply:` with a delta on a retained target.
pub type ApplyWithDeltaFn = unsafe extern "C" fn(object: *const c_void, dt: f32);
/// Adds one reference to a retained target.
pub type RetainFn = unsafe extern "C" fn(object: *const c_void);
/// Drops one reference from a retained target.
pub type ReleaseFn = unsafe extern "C" fn(object: *const c_void);

/// The C-ABI function behind an entry point.
#[derive(Debug, Copy, Clone)]
pub enum EntryFn {
    Apply(ApplyFn),
    ApplyWithNode(ApplyWithNodeFn),
    ApplyWithDelta(ApplyWithDeltaFn),
}

impl EntryFn {
    pub const fn key(self) -> EntryPointKey {
        match self {
            EntryFn::Apply(_) => EntryPointKey::Apply,
            EntryFn::ApplyWithNode(_) => EntryPointKey::ApplyWithNode,
            EntryFn::ApplyWithDelta(_) => EntryPointKey::ApplyWithDelta,
        }
    }
}

/// Identity of a dispatcher, comparable across tokens and targets.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TargetId(usize);

impl TargetId {
    #[inline]
    pub(crate) fn of(object: *const c_void) -> Self {
        Self(object.addr())
    }
}

// ── NativeTarget ──────────────────────────────────────────────────────────

/// Engine-side view of a dispatcher.
///
/// Owns one reference to the dispatcher: the closure stays alive for as long
/// as the engine keeps the target, even after every caller-held
/// [`Token`](super::Token) is gone. Dropping the target releases that
/// reference; cloning retains another.
///
/// Invocation is unsynchronized. The target is `!Send`, so only the thread
/// that created it can drive it.
pub struct NativeTarget {
    object: NonNull<c_void>,
    entry: EntryFn,
    retain: RetainFn,
    release: ReleaseFn,
}

impl NativeTarget {
    pub(crate) fn retain<D: Dispatcher>(dispatcher: &Rc<D>) -> Self {
        let raw = Rc::into_raw(Rc::clone(dispatcher));
        Self {
            // SAFETY: `Rc::into_raw` never returns null.
            object: unsafe { NonNull::new_unchecked(raw.cast_mut().cast()) },
            entry: D::ENTRY,
            retain: retain_trampoline::<D>,
            release: release_trampoline::<D>,
        }
    }

    #[inline]
    pub fn key(&self) -> EntryPointKey {
        self.entry.key()
    }

    #[inline]
    pub fn id(&self) -> TargetId {
        TargetId::of(self.object.as_ptr())
    }

    /// Invokes `apply`.
    pub fn apply(&self) -> Result<()> {
        let EntryFn::Apply(f) = self.entry else {
            return Err(self.mismatch(EntryPointKey::Apply));
        };
        // SAFETY: `object` is kept alive by the reference this target owns and
        // `f` was paired with it when the target was created.
        unsafe { f(self.object.as_ptr()) };
        Ok(())
    }

    /// Invokes `apply:` with a node.
    pub fn apply_with_node(&self, node: NodeRef) -> Result<()> {
        let EntryFn::ApplyWithNode(f) = self.entry else {
            return Err(self.mismatch(EntryPointKey::ApplyWithNode));
        };
        // SAFETY: as in `apply`.
        unsafe { f(self.object.as_ptr(), node.handle()) };
        Ok(())
    }

    /// Invokes `apply:` with a delta in seconds.
    pub fn apply_with_delta(&self, dt: f32) -> Result<()> {
        let EntryFn::ApplyWithDelta(f) = self.entry else {
            return Err(self.mismatch(EntryPointKey::ApplyWithDelta));
        };
        // SAFETY: as in `apply`.
        unsafe { f(self.object.as_ptr(), dt) };
        Ok(())
    }

    pub fn responds_to(&self, selector: &str) -> bool {
        self.key().selector() == selector
    }

    /// Name-addressed invocation: resolves `selector` plus the argument shape
    /// to the single entry point this target answers.
    pub fn perform(&self, selector: &str, args: DispatchArgs) -> Result<()> {
        if !self.responds_to(selector) {
            return Err(BridgeError::UnknownSelector { selector: selector.to_owned() });
        }
        match args {
            DispatchArgs::None => self.apply(),
            DispatchArgs::Node(node) => self.apply_with_node(node),
            DispatchArgs::Delta(dt) => self.apply_with_delta(dt),
        }
    }

    /// Hands the reference across a C boundary.
    ///
    /// The receiver becomes responsible for calling `release` exactly once
    /// (or for passing the parts back to [`from_raw_parts`](Self::from_raw_parts)).
    pub fn into_raw_parts(self) -> RawTarget {
        let this = ManuallyDrop::new(self);
        let (apply, apply_with_node, apply_with_delta) = match this.entry {
            EntryFn::Apply(f) => (Some(f), None, None),
            EntryFn::ApplyWithNode(f) => (None, Some(f), None),
            EntryFn::ApplyWithDelta(f) => (None, None, Some(f)),
        };
        RawTarget {
            object: this.object.as_ptr(),
            key: this.key() as u32,
            apply,
            apply_with_node,
            apply_with_delta,
            retain: this.retain,
            release: this.release,
        }
    }

    /// Takes back a reference previously handed out by
    /// [`into_raw_parts`](Self::into_raw_parts).
    ///
    /// Returns `None` when the parts are inconsistent (null object, unknown
    /// key, or missing entry function); the reference is then left untouched.
    ///
    /// # Safety
    ///
    /// `raw` must describe a live, retained object whose functions accept it,
    /// and the reference it carries must not have been released.
    pub unsafe fn from_raw_parts(raw: RawTarget) -> Option<Self> {
        let object = NonNull::new(raw.object.cast_mut())?;
        let entry = match EntryPointKey::from_raw(raw.key)? {
            EntryPointKey::Apply => EntryFn::Apply(raw.apply?),
            EntryPointKey::ApplyWithNode => EntryFn::ApplyWithNode(raw.apply_with_node?),
            EntryPointKey::ApplyWithDelta => EntryFn::ApplyWithDelta(raw.apply_with_delta?),
        };
        Some(Self { object, entry, retain: raw.retain, release: raw.release })
    }

    fn mismatch(&self, invoked: EntryPointKey) -> BridgeError {
        BridgeError::EntryPointMismatch { invoked, target: self.key() }
    }
}

impl Clone for NativeTarget {
    fn clone(&self) -> Self {
        // SAFETY: `object` is alive (we hold a reference) and `retain` matches it.
        unsafe { (self.retain)(self.object.as_ptr()) };
        Self {
            object: self.object,
            entry: self.entry,
            retain: self.retain,
            release: self.release,
        }
    }
}

impl Drop for NativeTarget {
    fn drop(&mut self) {
        // SAFETY: releases the one reference this target owns.
        unsafe { (self.release)(self.object.as_ptr()) };
    }
}

impl fmt::Debug for NativeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeTarget")
            .field("key", &self.key())
            .field("id", &self.id())
            .finish()
    }
}

unsafe extern "C" fn retain_trampoline<D: Dispatcher>(object: *const c_void) {
    // SAFETY: `object` came from `Rc::into_raw` on an `Rc<D>` that is still alive.
    unsafe { Rc::increment_strong_count(object.cast::<D>()) }
}

unsafe extern "C" fn release_trampoline<D: Dispatcher>(object: *const c_void) {
    // SAFETY: as above; the caller gives up the reference it owned.
    unsafe { Rc::decrement_strong_count(object.cast::<D>()) }
}

// ── RawTarget ─────────────────────────────────────────────────────────────

/// C layout of a retained target. Exactly one entry function is set, the one
/// matching `key`.
#[repr(C)]
#[derive(Debug)]
pub struct RawTarget {
    pub object: *const c_void,
    pub key: u32,
    pub apply: Option<ApplyFn>,
    pub apply_with_node: Option<ApplyWithNodeFn>,
    pub apply_with_delta: Option<ApplyWithDeltaFn>,
    pub retain: RetainFn,
    pub release: ReleaseFn,
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::dispatch::{ActionDispatcher, DeltaDispatcher, NodeDispatcher};

    /// Bumps a counter when the closure owning it is dropped.
    struct DropFlag(Rc<Cell<u32>>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn target_keeps_closure_alive_after_token_drop() {
        let drops = Rc::new(Cell::new(0));
        let calls = Rc::new(Cell::new(0));
        let flag = DropFlag(drops.clone());
        let seen = calls.clone();
        let token = ActionDispatcher::new(move || {
            let _ = &flag;
            seen.set(seen.get() + 1);
        });

        let target = token.target();
        assert_eq!(token.retain_count(), 2);
        drop(token);

        target.apply().unwrap();
        target.apply().unwrap();
        assert_eq!(calls.get(), 2);
        assert_eq!(drops.get(), 0);

        drop(target);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn clone_retains_and_drop_releases() {
        let token = DeltaDispatcher::new(|_| {});
        let a = token.target();
        let b = a.clone();
        assert_eq!(token.retain_count(), 3);
        assert_eq!(a.id(), token.id());
        assert_eq!(b.id(), token.id());
        drop(a);
        drop(b);
        assert_eq!(token.retain_count(), 1);
    }

    #[test]
    fn typed_invocation_rejects_wrong_signature() {
        let target = DeltaDispatcher::new(|_| {}).target();
        let err = target.apply().unwrap_err();
        assert!(matches!(
            err,
            BridgeError::EntryPointMismatch {
                invoked: EntryPointKey::Apply,
                target: EntryPointKey::ApplyWithDelta,
            }
        ));
        assert!(target.apply_with_delta(0.25).is_ok());
    }

    #[test]
    fn perform_resolves_by_selector_and_arguments() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let target = DeltaDispatcher::new(move |dt| sink.borrow_mut().push(dt)).target();

        target.perform("apply:", DispatchArgs::Delta(0.5)).unwrap();
        assert_eq!(*log.borrow(), vec![0.5]);

        let node = NodeRef::from_handle(Handle::from_addr(0x20));
        assert!(matches!(
            target.perform("apply:", DispatchArgs::Node(node)),
            Err(BridgeError::EntryPointMismatch { .. })
        ));
        assert!(matches!(
            target.perform("apply", DispatchArgs::None),
            Err(BridgeError::UnknownSelector { .. })
        ));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn node_target_forwards_the_handle() {
        let seen = Rc::new(Cell::new(Handle::NULL));
        let sink = seen.clone();
        let target = NodeDispatcher::new(move |n| {
            sink.set(n.handle());
        })
        .target();

        let node = NodeRef::from_handle(Handle::from_addr(0x7f0));
        target.perform("apply:", DispatchArgs::Node(node)).unwrap();
        assert_eq!(seen.get(), Handle::from_addr(0x7f0));
    }

    #[test]
    fn raw_parts_drive_the_closure_through_c_abi() {
        let drops = Rc::new(Cell::new(0));
        let log = Rc::new(RefCell::new(Vec::new()));
        let flag = DropFlag(drops.clone());
        let sink = log.clone();
        let token = DeltaDispatcher::new(move |dt| {
            let _ = &flag;
            sink.borrow_mut().push(dt);
        });

        let raw = token.target().into_raw_parts();
        drop(token);
        assert_eq!(raw.key, EntryPointKey::ApplyWithDelta as u32);
        assert!(raw.apply.is_none());
        assert!(raw.apply_with_node.is_none());

        let apply = raw.apply_with_delta.unwrap();
        unsafe {
            apply(raw.object, 1.0);
            apply(raw.object, 2.0);
            (raw.release)(raw.object);
        }
        assert_eq!(*log.borrow(), vec![1.0, 2.0]);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn raw_parts_round_trip() {
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let token = ActionDispatcher::new(move || seen.set(seen.get() + 1));

        let raw = token.target().into_raw_parts();
        assert_eq!(token.retain_count(), 2);
        let target = unsafe { NativeTarget::from_raw_parts(raw) }.unwrap();
        target.apply().unwrap();
        drop(target);

        assert_eq!(calls.get(), 1);
        assert_eq!(token.retain_count(), 1);
    }

    #[test]
    fn inconsistent_raw_parts_are_refused() {
        let token = ActionDispatcher::new(|| {});
        let mut raw = token.target().into_raw_parts();
        let object = raw.object;
        let release = raw.release;

        raw.key = EntryPointKey::ApplyWithDelta as u32;
        assert!(unsafe { NativeTarget::from_raw_parts(raw) }.is_none());

        unsafe { release(object) };
        assert_eq!(token.retain_count(), 1);
    }
}
