//! Host collaborator contracts.
//!
//! The host owns the actual directory renderer and playback resolver; this
//! core only hands it normalized [`ListItem`]s and consumes no meaningful
//! return value. [`MemoryHost`] is a process-local stand-in used for
//! out-of-host testing.

use crate::item::ListItem;

/// Receives a directory listing for display.
pub trait Renderer {
    /// Render the listing for the given invocation handle.
    fn render(&mut self, handle: i32, items: &[ListItem]);
}

/// Receives a single resolved playable item.
pub trait Resolver {
    /// Resolve playback for the given invocation handle.
    fn resolve(&mut self, handle: i32, item: &ListItem);
}

/// In-memory host mock capturing everything it is handed.
#[derive(Debug, Default)]
pub struct MemoryHost {
    /// Items received through [`Renderer::render`], across all calls.
    pub rendered: Vec<ListItem>,
    /// The item received through [`Resolver::resolve`], if any.
    pub resolved: Option<ListItem>,
    /// Handles seen, in call order.
    pub handles: Vec<i32>,
}

impl MemoryHost {
    /// Create an empty mock host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for MemoryHost {
    fn render(&mut self, handle: i32, items: &[ListItem]) {
        self.handles.push(handle);
        self.rendered.extend_from_slice(items);
    }
}

impl Resolver for MemoryHost {
    fn resolve(&mut self, handle: i32, item: &ListItem) {
        self.handles.push(handle);
        self.resolved = Some(item.clone());
    }
}
