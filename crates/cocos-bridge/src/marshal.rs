//! Null-terminated handle buffers for the menu grouping calls.
//!
//! The engine's "align items in columns/rows" entry points take the first
//! group count as a regular argument and the remaining counts as a
//! null-terminated `void *` array. [`Menu`] builds that array from a slice,
//! hands it to the engine, and frees it when the call returns.

use crate::error::{BridgeError, Result};
use crate::handle::{Handle, NativeObject, NsNumber};

// ── NativeHandleBuffer ────────────────────────────────────────────────────

/// Contiguous word-sized slots ending in a null slot.
///
/// Owned by a single marshaling call; freed on drop, including when the
/// native call fails.
pub struct NativeHandleBuffer {
    slots: Box<[Handle]>,
}

impl NativeHandleBuffer {
    /// Builds `[h(items[1]), .., h(items[n-1]), NULL]`, `n` slots in total.
    ///
    /// `items[0]` is not copied: callers pass it separately.
    fn for_trailing<T: NativeObject>(items: &[T]) -> Self {
        debug_assert!(!items.is_empty());
        let mut slots = vec![Handle::NULL; items.len()].into_boxed_slice();
        for (slot, item) in slots.iter_mut().zip(items.iter().skip(1)) {
            *slot = item.handle();
        }
        track::allocated();
        log::trace!("allocated handle buffer of {} slot(s)", slots.len());
        Self { slots }
    }

    /// Pointer to the first slot, for native entry points taking `void **`.
    #[inline]
    pub fn as_ptr(&self) -> *const Handle {
        self.slots.as_ptr()
    }

    /// All slots, terminator included.
    #[inline]
    pub fn as_slice(&self) -> &[Handle] {
        &self.slots
    }

    /// Slot count, terminator included.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always `false` for buffers built by the marshaler.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Handles before the terminator.
    #[inline]
    pub fn handles(&self) -> &[Handle] {
        &self.slots[..self.slots.len() - 1]
    }
}

impl Drop for NativeHandleBuffer {
    fn drop(&mut self) {
        track::released();
        log::trace!("released handle buffer of {} slot(s)", self.slots.len());
    }
}

/// Validates `items`, builds the buffer, and runs `call` with it.
fn marshal<T, F>(name: &'static str, items: Option<&[T]>, call: F) -> Result<()>
where
    T: NativeObject,
    F: FnOnce(&T, &NativeHandleBuffer) -> anyhow::Result<()>,
{
    let items = match items {
        Some(items) if !items.is_empty() => items,
        _ => return Err(BridgeError::InvalidArgument { name }),
    };
    let buffer = NativeHandleBuffer::for_trailing(items);
    call(&items[0], &buffer)?;
    Ok(())
}

// ── Native collaborator ───────────────────────────────────────────────────

/// The engine's menu grouping entry points.
///
/// `rest` is only valid for the duration of the call.
pub trait NativeMenu {
    fn align_items_in_columns(&mut self, first: &NsNumber, rest: &NativeHandleBuffer) -> anyhow::Result<()>;
    fn align_items_in_rows(&mut self, first: &NsNumber, rest: &NativeHandleBuffer) -> anyhow::Result<()>;
}

impl<T: NativeMenu + ?Sized> NativeMenu for &mut T {
    fn align_items_in_columns(&mut self, first: &NsNumber, rest: &NativeHandleBuffer) -> anyhow::Result<()> {
        (**self).align_items_in_columns(first, rest)
    }

    fn align_items_in_rows(&mut self, first: &NsNumber, rest: &NativeHandleBuffer) -> anyhow::Result<()> {
        (**self).align_items_in_rows(first, rest)
    }
}

// ── Menu ──────────────────────────────────────────────────────────────────

/// Menu grouping calls over a native menu.
#[derive(Debug)]
pub struct Menu<M> {
    native: M,
}

impl<M: NativeMenu> Menu<M> {
    pub fn new(native: M) -> Self {
        Self { native }
    }

    pub fn native(&self) -> &M {
        &self.native
    }

    pub fn native_mut(&mut self) -> &mut M {
        &mut self.native
    }

    pub fn into_inner(self) -> M {
        self.native
    }

    /// Arranges items into columns; `columns[i]` is the item count of row `i`.
    ///
    /// Fails with [`BridgeError::InvalidArgument`] when `columns` is absent
    /// or empty, before anything is allocated or sent to the engine.
    pub fn align_items_in_columns(&mut self, columns: Option<&[NsNumber]>) -> Result<()> {
        log::debug!("align items in columns: {:?}", columns.map(<[_]>::len));
        marshal("columns", columns, |first, rest| {
            self.native.align_items_in_columns(first, rest)
        })
    }

    /// Arranges items into rows; `rows[i]` is the item count of column `i`.
    ///
    /// Same validation as [`align_items_in_columns`](Self::align_items_in_columns).
    pub fn align_items_in_rows(&mut self, rows: Option<&[NsNumber]>) -> Result<()> {
        log::debug!("align items in rows: {:?}", rows.map(<[_]>::len));
        marshal("rows", rows, |first, rest| self.native.align_items_in_rows(first, rest))
    }
}

// ── allocation tracking ───────────────────────────────────────────────────

#[cfg(not(test))]
mod track {
    #[inline(always)]
    pub(super) fn allocated() {}
    #[inline(always)]
    pub(super) fn released() {}
}


#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Entry {
        Columns,
        Rows,
    }

    /// Copies out what the engine saw, since the buffer dies with the call.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<(Entry, Handle, Vec<Handle>)>,
        fail: bool,
    }

    impl Recorder {
        fn record(&mut self, entry: Entry, first: &NsNumber, rest: &NativeHandleBuffer) -> anyhow::Result<()> {
            // The terminator must be readable through the raw pointer too.
            let last = unsafe { *rest.as_ptr().add(rest.len() - 1) };
            assert!(last.is_null());
            self.calls.push((entry, first.handle(), rest.as_slice().to_vec()));
            if self.fail {
                anyhow::bail!("menu has no children");
            }
            Ok(())
        }
    }

    impl NativeMenu for Recorder {
        fn align_items_in_columns(&mut self, first: &NsNumber, rest: &NativeHandleBuffer) -> anyhow::Result<()> {
            self.record(Entry::Columns, first, rest)
        }

        fn align_items_in_rows(&mut self, first: &NsNumber, rest: &NativeHandleBuffer) -> anyhow::Result<()> {
            self.record(Entry::Rows, first, rest)
        }
    }

    fn h(addr: usize) -> Handle {
        Handle::from_addr(addr)
    }

    fn nums(addrs: &[usize]) -> Vec<NsNumber> {
        addrs.iter().map(|&a| NsNumber::from_handle(h(a))).collect()
    }

    #[test]
    fn single_group_gets_terminator_only() {
        let mut menu = Menu::new(Recorder::default());
        menu.align_items_in_columns(Some(nums(&[0x10]).as_slice())).unwrap();
        assert_eq!(menu.native().calls, vec![(Entry::Columns, h(0x10), vec![Handle::NULL])]);
    }

    #[test]
    fn trailing_handles_then_null() {
        let mut menu = Menu::new(Recorder::default());
        menu.align_items_in_columns(Some(nums(&[0x10, 0x20, 0x30]).as_slice())).unwrap();
        assert_eq!(
            menu.native().calls,
            vec![(Entry::Columns, h(0x10), vec![h(0x20), h(0x30), Handle::NULL])]
        );
    }

    #[test]
    fn rows_use_their_own_entry_point() {
        let mut menu = Menu::new(Recorder::default());
        menu.align_items_in_rows(Some(nums(&[0x10, 0x20, 0x30]).as_slice())).unwrap();
        assert_eq!(
            menu.native().calls,
            vec![(Entry::Rows, h(0x10), vec![h(0x20), h(0x30), Handle::NULL])]
        );
    }

    #[test]
    fn absent_sequence_is_rejected_before_allocation() {
        let mut menu = Menu::new(Recorder::default());
        let before = track::counts();

        let err = menu.align_items_in_columns(None).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument { name: "columns" }));
        let err = menu.align_items_in_rows(None).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument { name: "rows" }));

        assert_eq!(track::counts(), before);
        assert!(menu.native().calls.is_empty());
    }

    #[test]
    fn empty_sequence_is_rejected_before_allocation() {
        let mut menu = Menu::new(Recorder::default());
        let before = track::counts();
        assert!(menu.align_items_in_rows(Some(&[][..])).is_err());
        assert_eq!(track::counts(), before);
        assert!(menu.native().calls.is_empty());
    }

    #[test]
    fn buffer_is_allocated_and_released_once_per_call() {
        let mut menu = Menu::new(Recorder::default());
        for n in 1..=6 {
            let addrs: Vec<usize> = (1..=n).map(|i| i * 0x10).collect();
            let (a0, r0) = track::counts();
            menu.align_items_in_columns(Some(nums(&addrs).as_slice())).unwrap();
            assert_eq!(track::counts(), (a0 + 1, r0 + 1));
            assert_eq!(menu.native().calls.last().unwrap().2.len(), n);
        }
    }

    #[test]
    fn buffer_is_released_when_native_call_fails() {
        let mut menu = Menu::new(Recorder { fail: true, ..Recorder::default() });
        let (a0, r0) = track::counts();
        let err = menu.align_items_in_rows(Some(nums(&[0x10, 0x20]).as_slice())).unwrap_err();
        assert!(matches!(err, BridgeError::Native(_)));
        assert_eq!(track::counts(), (a0 + 1, r0 + 1));
    }

    #[test]
    fn handles_exclude_terminator() {
        let buf = NativeHandleBuffer::for_trailing(nums(&[1, 2, 3]).as_slice());
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.handles(), &[h(2), h(3)]);
    }
}
