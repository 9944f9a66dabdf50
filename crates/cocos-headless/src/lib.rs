//! Headless engine for `cocos-bridge`.
//!
//! Implements the scheduler, menu and action collaborators in-process so
//! bridged callbacks can be driven without a renderer. Used by the demo
//! binary and the integration tests.

pub mod clock;
pub mod config;
pub mod engine;
pub mod node;

pub use clock::{FrameClock, FrameTime};
pub use config::HeadlessConfig;
pub use engine::{Alignment, Axis, HeadlessEngine, ObjectKind};
pub use node::HeadlessNode;
