use core::ffi::c_void;
use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use crate::handle::{Handle, NodeRef};

use super::key::EntryPointKey;
use super::target::{EntryFn, NativeTarget, TargetId};

mod sealed {
    pub trait Sealed {}
}

// ── Dispatcher ────────────────────────────────────────────────────────────

/// A callback wrapper the native dispatch mechanism can invoke.
///
/// Implemented by exactly three types, one per native callback signature:
/// [`ActionDispatcher`], [`NodeDispatcher`] and [`DeltaDispatcher`]. The set
/// is closed; the native engine knows no other entry points.
pub trait Dispatcher: sealed::Sealed + Sized + 'static {
    /// Entry point the native side invokes on this dispatcher.
    const KEY: EntryPointKey;

    /// C-ABI function the native side calls for [`Self::KEY`].
    const ENTRY: EntryFn;
}

/// Runs the wrapped closure unless it is already running further up the stack.
fn forward<F: ?Sized>(action: &RefCell<Box<F>>, key: EntryPointKey, call: impl FnOnce(&mut F)) {
    let Ok(mut action) = action.try_borrow_mut() else {
        log::error!("re-entrant `{key}` invocation skipped");
        return;
    };
    log::trace!("dispatching `{key}`");
    call(&mut **action);
}

// ── ActionDispatcher ──────────────────────────────────────────────────────

/// Wraps a niladic callback (`apply`). Used by call-func actions and timers.
pub struct ActionDispatcher {
    action: RefCell<Box<dyn FnMut()>>,
}

impl ActionDispatcher {
    pub fn new(action: impl FnMut() + 'static) -> Token<Self> {
        Token::new(Self { action: RefCell::new(Box::new(action)) })
    }

    /// Native entry point `apply`.
    pub fn apply(&self) {
        forward(&self.action, Self::KEY, |action| action());
    }
}

impl sealed::Sealed for ActionDispatcher {}

impl Dispatcher for ActionDispatcher {
    const KEY: EntryPointKey = EntryPointKey::Apply;
    const ENTRY: EntryFn = EntryFn::Apply(apply_trampoline);
}

unsafe extern "C" fn apply_trampoline(object: *const c_void) {
    // SAFETY: the engine pairs this entry with objects retained from an
    // `Rc<ActionDispatcher>` and keeps them alive across the call.
    let dispatcher = unsafe { &*object.cast::<ActionDispatcher>() };
    dispatcher.apply();
}

// ── NodeDispatcher ────────────────────────────────────────────────────────

/// Wraps a callback taking the node an action ran on (`apply:`).
pub struct NodeDispatcher {
    action: RefCell<Box<dyn FnMut(NodeRef)>>,
}

impl NodeDispatcher {
    pub fn new(action: impl FnMut(NodeRef) + 'static) -> Token<Self> {
        Token::new(Self { action: RefCell::new(Box::new(action)) })
    }

    /// Native entry point `apply:` with a node.
    pub fn apply(&self, node: NodeRef) {
        forward(&self.action, Self::KEY, |action| action(node));
    }
}

impl sealed::Sealed for NodeDispatcher {}

impl Dispatcher for NodeDispatcher {
    const KEY: EntryPointKey = EntryPointKey::ApplyWithNode;
    const ENTRY: EntryFn = EntryFn::ApplyWithNode(apply_with_node_trampoline);
}

unsafe extern "C" fn apply_with_node_trampoline(object: *const c_void, node: Handle) {
    // SAFETY: see `apply_trampoline`; the pairing is with `Rc<NodeDispatcher>`.
    let dispatcher = unsafe { &*object.cast::<NodeDispatcher>() };
    dispatcher.apply(NodeRef::from_handle(node));
}

// ── DeltaDispatcher ───────────────────────────────────────────────────────

/// Wraps a scheduler callback taking seconds since the previous tick (`apply:`).
pub struct DeltaDispatcher {
    action: RefCell<Box<dyn FnMut(f32)>>,
}

impl DeltaDispatcher {
    pub fn new(action: impl FnMut(f32) + 'static) -> Token<Self> {
        Token::new(Self { action: RefCell::new(Box::new(action)) })
    }

    /// Native entry point `apply:` with a delta in seconds.
    pub fn apply(&self, dt: f32) {
        forward(&self.action, Self::KEY, |action| action(dt));
    }
}

impl sealed::Sealed for DeltaDispatcher {}

impl Dispatcher for DeltaDispatcher {
    const KEY: EntryPointKey = EntryPointKey::ApplyWithDelta;
    const ENTRY: EntryFn = EntryFn::ApplyWithDelta(apply_with_delta_trampoline);
}

unsafe extern "C" fn apply_with_delta_trampoline(object: *const c_void, dt: f32) {
    // SAFETY: see `apply_trampoline`; the pairing is with `Rc<DeltaDispatcher>`.
    let dispatcher = unsafe { &*object.cast::<DeltaDispatcher>() };
    dispatcher.apply(dt);
}

// ── Token ─────────────────────────────────────────────────────────────────

/// Caller-held handle to a dispatcher.
///
/// Cloning shares the same dispatcher. The closure lives as long as any
/// `Token` clone or any [`NativeTarget`] the engine still retains.
pub struct Token<D: Dispatcher>(Rc<D>);

impl<D: Dispatcher> Token<D> {
    fn new(dispatcher: D) -> Self {
        log::debug!("created `{}` token", D::KEY);
        Self(Rc::new(dispatcher))
    }

    #[inline]
    pub fn key(&self) -> EntryPointKey {
        D::KEY
    }

    /// Identity shared with every [`NativeTarget`] made from this token.
    #[inline]
    pub fn id(&self) -> TargetId {
        TargetId::of(Rc::as_ptr(&self.0).cast())
    }

    /// Retains the dispatcher on behalf of the native engine.
    pub fn target(&self) -> NativeTarget {
        NativeTarget::retain(&self.0)
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of live references: caller clones plus engine-retained targets.
    #[inline]
    pub fn retain_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl<D: Dispatcher> Clone for Token<D> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<D: Dispatcher> Deref for Token<D> {
    type Target = D;

    #[inline]
    fn deref(&self) -> &D {
        &self.0
    }
}

impl<D: Dispatcher> fmt::Debug for Token<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("key", &D::KEY)
            .field("id", &self.id())
            .finish()
    }
}
