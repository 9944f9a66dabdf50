//! Callback tokens and the native dispatch surface.
//!
//! Responsibilities:
//! - give a Rust closure a fixed, name-addressable identity the engine can invoke
//! - keep one concrete token type per native callback signature
//! - expose retained, type-erased targets plus their C-ABI entry functions
//!
//! Callers hold [`Token`]s. The engine holds [`NativeTarget`]s, each owning
//! one reference to the same dispatcher, so a closure handed to the engine
//! lives exactly as long as the engine keeps it.

mod key;
mod target;
mod token;

pub use key::{DispatchArgs, EntryPointKey};
pub use target::{
    ApplyFn, ApplyWithDeltaFn, ApplyWithNodeFn, EntryFn, NativeTarget, RawTarget, ReleaseFn,
    RetainFn, TargetId,
};
pub use token::{ActionDispatcher, DeltaDispatcher, Dispatcher, NodeDispatcher, Token};
