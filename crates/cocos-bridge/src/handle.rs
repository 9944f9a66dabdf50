use core::ffi::c_void;
use core::fmt;
use core::ptr;

/// Pointer to an object owned by the native engine.
///
/// Layout-compatible with a machine word, so a `[Handle]` can be handed to
/// native entry points that expect a `void **` array.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Handle(*mut c_void);

impl Handle {
    /// The null handle. Also used as the terminator slot of handle buffers.
    pub const NULL: Handle = Handle(ptr::null_mut());

    #[inline]
    pub const fn from_raw(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    /// Builds a handle from a bare address.
    ///
    /// Engines that identify objects by integer id (headless engines, tests)
    /// use this; the handle is never dereferenced on the Rust side.
    #[inline]
    pub fn from_addr(addr: usize) -> Self {
        Self(ptr::without_provenance_mut(addr))
    }

    #[inline]
    pub const fn as_ptr(self) -> *mut c_void {
        self.0
    }

    #[inline]
    pub fn addr(self) -> usize {
        self.0.addr()
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("Handle(null)")
        } else {
            write!(f, "Handle({:#x})", self.addr())
        }
    }
}

/// Anything backed by a native object.
pub trait NativeObject {
    fn handle(&self) -> Handle;
}

impl NativeObject for Handle {
    #[inline]
    fn handle(&self) -> Handle {
        *self
    }
}

impl<T: NativeObject + ?Sized> NativeObject for &T {
    #[inline]
    fn handle(&self) -> Handle {
        (**self).handle()
    }
}

// ── NsNumber ──────────────────────────────────────────────────────────────

/// A boxed native number, the element type of menu grouping requests.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NsNumber(Handle);

impl NsNumber {
    #[inline]
    pub const fn from_handle(handle: Handle) -> Self {
        Self(handle)
    }
}

impl NativeObject for NsNumber {
    #[inline]
    fn handle(&self) -> Handle {
        self.0
    }
}

// ── NodeRef ───────────────────────────────────────────────────────────────

/// Borrowed scene-graph node, as delivered to node-argument callbacks.
///
/// The bridge never owns nodes; a `NodeRef` is only valid for the duration of
/// the callback that received it unless the engine documents otherwise.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NodeRef(Handle);

impl NodeRef {
    #[inline]
    pub const fn from_handle(handle: Handle) -> Self {
        Self(handle)
    }
}

impl NativeObject for NodeRef {
    #[inline]
    fn handle(&self) -> Handle {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handle_is_default_and_zero() {
        assert!(Handle::default().is_null());
        assert_eq!(Handle::NULL.addr(), 0);
    }

    #[test]
    fn from_addr_round_trips() {
        let h = Handle::from_addr(0x1230);
        assert_eq!(h.addr(), 0x1230);
        assert!(!h.is_null());
        assert_eq!(format!("{h:?}"), "Handle(0x1230)");
    }

    #[test]
    fn handle_is_word_sized() {
        assert_eq!(size_of::<Handle>(), size_of::<usize>());
        assert_eq!(align_of::<Handle>(), align_of::<usize>());
    }

    #[test]
    fn wrappers_expose_their_handle() {
        let h = Handle::from_addr(0x40);
        assert_eq!(NsNumber::from_handle(h).handle(), h);
        assert_eq!(NodeRef::from_handle(h).handle(), h);
        assert_eq!((&NsNumber::from_handle(h)).handle(), h);
    }
}
