//! One-off callbacks for actions, timers and menu items.
//!
//! Each constructor wraps the closure in the token matching the native
//! signature and hands a retained target to the engine. No token is
//! returned: the closure lives exactly as long as the native object that
//! owns it.

use crate::dispatch::{ActionDispatcher, Dispatcher, EntryPointKey, NativeTarget, NodeDispatcher};
use crate::error::Result;
use crate::handle::{Handle, NodeRef};

/// Engine constructors that take a `(target, entry point)` pair.
///
/// Every method returns the handle of the native object it created; the
/// object owns `target` from then on.
pub trait NativeActions {
    /// Instant action invoking `apply` when it runs.
    fn call_func(&mut self, target: NativeTarget, key: EntryPointKey) -> anyhow::Result<Handle>;

    /// Instant action invoking `apply:` with the node running it.
    fn call_func_n(&mut self, target: NativeTarget, key: EntryPointKey) -> anyhow::Result<Handle>;

    /// Timer invoking `apply` each time it fires.
    fn timer(&mut self, target: NativeTarget, key: EntryPointKey) -> anyhow::Result<Handle>;

    /// Label menu item invoking `apply:` with itself when activated.
    fn menu_item_label(
        &mut self,
        label: Handle,
        target: NativeTarget,
        key: EntryPointKey,
    ) -> anyhow::Result<Handle>;

    /// Image menu item invoking `apply:` with itself when activated.
    fn menu_item_image(
        &mut self,
        normal_image: &str,
        selected_image: &str,
        disabled_image: Option<&str>,
        target: NativeTarget,
        key: EntryPointKey,
    ) -> anyhow::Result<Handle>;
}

impl<T: NativeActions + ?Sized> NativeActions for &mut T {
    fn call_func(&mut self, target: NativeTarget, key: EntryPointKey) -> anyhow::Result<Handle> {
        (**self).call_func(target, key)
    }

    fn call_func_n(&mut self, target: NativeTarget, key: EntryPointKey) -> anyhow::Result<Handle> {
        (**self).call_func_n(target, key)
    }

    fn timer(&mut self, target: NativeTarget, key: EntryPointKey) -> anyhow::Result<Handle> {
        (**self).timer(target, key)
    }

    fn menu_item_label(
        &mut self,
        label: Handle,
        target: NativeTarget,
        key: EntryPointKey,
    ) -> anyhow::Result<Handle> {
        (**self).menu_item_label(label, target, key)
    }

    fn menu_item_image(
        &mut self,
        normal_image: &str,
        selected_image: &str,
        disabled_image: Option<&str>,
        target: NativeTarget,
        key: EntryPointKey,
    ) -> anyhow::Result<Handle> {
        (**self).menu_item_image(normal_image, selected_image, disabled_image, target, key)
    }
}

/// Creates an instant action that runs `callback`.
pub fn call_func<A>(native: &mut A, callback: impl FnMut() + 'static) -> Result<Handle>
where
    A: NativeActions + ?Sized,
{
    let token = ActionDispatcher::new(callback);
    Ok(native.call_func(token.target(), ActionDispatcher::KEY)?)
}

/// Creates an instant action that runs `callback` with the node running it.
pub fn call_func_n<A>(native: &mut A, callback: impl FnMut(NodeRef) + 'static) -> Result<Handle>
where
    A: NativeActions + ?Sized,
{
    let token = NodeDispatcher::new(callback);
    Ok(native.call_func_n(token.target(), NodeDispatcher::KEY)?)
}

/// Creates a native timer that runs `callback` each time it fires.
pub fn timer<A>(native: &mut A, callback: impl FnMut() + 'static) -> Result<Handle>
where
    A: NativeActions + ?Sized,
{
    let token = ActionDispatcher::new(callback);
    Ok(native.timer(token.target(), ActionDispatcher::KEY)?)
}

/// Creates a label menu item; `callback` receives the item as sender.
pub fn menu_item_label<A>(
    native: &mut A,
    label: Handle,
    callback: impl FnMut(NodeRef) + 'static,
) -> Result<Handle>
where
    A: NativeActions + ?Sized,
{
    let token = NodeDispatcher::new(callback);
    Ok(native.menu_item_label(label, token.target(), NodeDispatcher::KEY)?)
}

/// Creates an image menu item without a disabled image; `callback` receives
/// the item as sender.
pub fn menu_item_image<A>(
    native: &mut A,
    normal_image: &str,
    selected_image: &str,
    callback: impl FnMut(NodeRef) + 'static,
) -> Result<Handle>
where
    A: NativeActions + ?Sized,
{
    let token = NodeDispatcher::new(callback);
    Ok(native.menu_item_image(normal_image, selected_image, None, token.target(), NodeDispatcher::KEY)?)
}
