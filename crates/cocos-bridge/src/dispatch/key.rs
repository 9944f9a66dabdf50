use core::ffi::CStr;
use core::fmt;

use crate::handle::NodeRef;

/// Fixed entry point the native dispatch mechanism invokes on a target.
///
/// There is exactly one key per native callback signature. The selectors are
/// the ones the native engine looks up, so they must not change. Node and
/// float callbacks share the `apply:` selector; the argument shape tells them
/// apart.
#[repr(u32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EntryPointKey {
    /// `apply`, no arguments.
    Apply = 0,
    /// `apply:` with the node the action ran on.
    ApplyWithNode = 1,
    /// `apply:` with the seconds elapsed since the previous tick.
    ApplyWithDelta = 2,
}

impl EntryPointKey {
    pub const ALL: [EntryPointKey; 3] = [
        EntryPointKey::Apply,
        EntryPointKey::ApplyWithNode,
        EntryPointKey::ApplyWithDelta,
    ];

    /// Native selector name.
    pub const fn selector(self) -> &'static str {
        match self {
            EntryPointKey::Apply => "apply",
            EntryPointKey::ApplyWithNode | EntryPointKey::ApplyWithDelta => "apply:",
        }
    }

    /// Native selector name as a C string, for registration with the engine.
    pub const fn selector_cstr(self) -> &'static CStr {
        match self {
            EntryPointKey::Apply => c"apply",
            EntryPointKey::ApplyWithNode | EntryPointKey::ApplyWithDelta => c"apply:",
        }
    }

    /// Number of arguments the native side passes.
    pub const fn arity(self) -> usize {
        match self {
            EntryPointKey::Apply => 0,
            EntryPointKey::ApplyWithNode | EntryPointKey::ApplyWithDelta => 1,
        }
    }

    const fn signature(self) -> &'static str {
        match self {
            EntryPointKey::Apply => "()",
            EntryPointKey::ApplyWithNode => "(node)",
            EntryPointKey::ApplyWithDelta => "(float)",
        }
    }

    pub(crate) const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(EntryPointKey::Apply),
            1 => Some(EntryPointKey::ApplyWithNode),
            2 => Some(EntryPointKey::ApplyWithDelta),
            _ => None,
        }
    }
}

impl fmt::Display for EntryPointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.selector(), self.signature())
    }
}

// ── DispatchArgs ──────────────────────────────────────────────────────────

/// Arguments for a name-addressed invocation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DispatchArgs {
    None,
    Node(NodeRef),
    Delta(f32),
}

impl DispatchArgs {
    /// The entry point this argument shape resolves to.
    pub const fn key(self) -> EntryPointKey {
        match self {
            DispatchArgs::None => EntryPointKey::Apply,
            DispatchArgs::Node(_) => EntryPointKey::ApplyWithNode,
            DispatchArgs::Delta(_) => EntryPointKey::ApplyWithDelta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Handle;

    #[test]
    fn selectors_match_native_names() {
        assert_eq!(EntryPointKey::Apply.selector(), "apply");
        assert_eq!(EntryPointKey::ApplyWithNode.selector(), "apply:");
        assert_eq!(EntryPointKey::ApplyWithDelta.selector(), "apply:");
        for key in EntryPointKey::ALL {
            assert_eq!(key.selector_cstr().to_str().unwrap(), key.selector());
        }
    }

    #[test]
    fn arity_follows_trailing_colons() {
        for key in EntryPointKey::ALL {
            assert_eq!(key.arity(), key.selector().matches(':').count());
        }
    }

    #[test]
    fn raw_values_round_trip() {
        for key in EntryPointKey::ALL {
            assert_eq!(EntryPointKey::from_raw(key as u32), Some(key));
        }
        assert_eq!(EntryPointKey::from_raw(3), None);
    }

    #[test]
    fn args_resolve_to_exactly_one_key() {
        let node = NodeRef::from_handle(Handle::from_addr(0x10));
        assert_eq!(DispatchArgs::None.key(), EntryPointKey::Apply);
        assert_eq!(DispatchArgs::Node(node).key(), EntryPointKey::ApplyWithNode);
        assert_eq!(DispatchArgs::Delta(0.5).key(), EntryPointKey::ApplyWithDelta);
    }
}
