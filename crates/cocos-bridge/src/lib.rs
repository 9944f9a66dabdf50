//! Closure-to-native-callback bridge for a retained scene-graph engine.
//!
//! The engine's scheduler, timers, actions and menu items can only call back
//! through fixed, name-addressed entry points. This crate gives Rust closures
//! such an identity and adapts the engine's call shapes to Rust.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`dispatch`] | per-signature tokens, retained native targets, C-ABI entry functions |
//! | [`scheduler`] | `Scheduler` context, node-bound scheduling, repeat sentinel |
//! | [`marshal`] | null-terminated handle buffers for menu grouping |
//! | [`actions`] | call-func actions, timers and menu items built from closures |
//! | [`handle`] | raw native handles and the types wrapping them |
//! | [`logging`] | `env_logger` setup for binaries |
//!
//! The engine itself is reached through the collaborator traits
//! [`NativeScheduler`](scheduler::NativeScheduler),
//! [`NativeMenu`](marshal::NativeMenu) and
//! [`NativeActions`](actions::NativeActions).
//!
//! # Quick start
//!
//! ```rust,ignore
//! use cocos_bridge::prelude::*;
//!
//! let mut scheduler = Scheduler::new(engine);
//!
//! // Context-bound: keep the token to unschedule later.
//! let token = scheduler.schedule_with(|dt| step(dt), Timing::new().interval(0.5), false)?;
//!
//! // Node-bound: starts paused if the node is not on stage yet.
//! node.schedule_once(&mut scheduler, |_| spawn_wave(), 2.0)?;
//!
//! scheduler.unschedule(&token)?;
//! ```

pub mod actions;
pub mod dispatch;
pub mod error;
pub mod handle;
pub mod logging;
pub mod marshal;
pub mod scheduler;

pub use error::{BridgeError, Result};

/// Common imports for code driving the bridge.
pub mod prelude {
    pub use crate::actions::{call_func, call_func_n, menu_item_image, menu_item_label, timer};
    pub use crate::dispatch::{
        ActionDispatcher, DeltaDispatcher, DispatchArgs, Dispatcher, EntryPointKey, NativeTarget,
        NodeDispatcher, Token,
    };
    pub use crate::error::{BridgeError, Result};
    pub use crate::handle::{Handle, NativeObject, NodeRef, NsNumber};
    pub use crate::marshal::Menu;
    pub use crate::scheduler::{
        NodeScheduleExt, Repeat, SceneNode, ScheduleRequest, Scheduler, Timing, REPEAT_FOREVER,
    };
}
