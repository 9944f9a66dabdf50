use std::cell::Cell;

use cocos_bridge::handle::{Handle, NativeObject, NodeRef};
use cocos_bridge::scheduler::SceneNode;

/// A scene node with nothing but an identity and an on-stage flag.
#[derive(Debug)]
pub struct HeadlessNode {
    handle: Handle,
    running: Cell<bool>,
}

impl HeadlessNode {
    pub(crate) fn new(handle: Handle) -> Self {
        Self { handle, running: Cell::new(false) }
    }

    /// The node joined the running graph.
    pub fn enter(&self) {
        self.running.set(true);
    }

    /// The node left the running graph.
    pub fn exit(&self) {
        self.running.set(false);
    }

    /// Borrowed form passed to node callbacks.
    pub fn node_ref(&self) -> NodeRef {
        NodeRef::from_handle(self.handle)
    }
}

impl SceneNode for HeadlessNode {
    fn is_running(&self) -> bool {
        self.running.get()
    }
}

impl NativeObject for HeadlessNode {
    fn handle(&self) -> Handle {
        self.handle
    }
}
