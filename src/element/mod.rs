//! Element collaborator trait
//!
//! The engine never touches a real DOM. Everything it needs from the page
//! (attribute storage, selector lookup, content mutation, visibility) sits
//! behind this trait, supplied by the host. An in-memory reference
//! implementation lives in [`memory`] for headless hosts and tests.

use std::sync::Arc;

pub mod memory;

pub use memory::MemoryElement;

/// Shared handle to a trigger element or render target
pub type ElementRef = Arc<dyn Element>;

/// Host-supplied view of a UI element
///
/// Implementations must be cheap to clone through the `Arc` and safe to
/// call from any task; mutations are expected to be applied to the live
/// element, not a snapshot.
pub trait Element: Send + Sync {
    /// Stable identity for this element (used to key poll state and events)
    fn key(&self) -> String;

    /// Lower-case tag name ("a", "form", "div", ...)
    fn tag(&self) -> String;

    /// Read a single attribute
    fn attribute(&self, name: &str) -> Option<String>;

    /// Write a single attribute
    fn set_attribute(&self, name: &str, value: &str);

    /// All attributes as (name, value) pairs
    fn attributes(&self) -> Vec<(String, String)>;

    /// Find descendant elements matching a selector
    ///
    /// The engine only uses the simple forms: `tag`, `#id`, `.class`,
    /// `[attr]`, `[attr=value]`, an optional `:first` suffix, and
    /// comma-separated unions of those.
    fn find(&self, selector: &str) -> Vec<ElementRef>;

    /// Current rendered content
    fn content(&self) -> String;

    /// Add content after the existing content
    fn append(&self, content: &str);

    /// Add content before the existing content
    fn prepend(&self, content: &str);

    /// Replace the content entirely
    fn replace(&self, content: &str);

    /// Make the element visible (busy indicators)
    fn show(&self);

    /// Hide the element (busy indicators)
    fn hide(&self);

    /// Whether the element is still attached to the document
    fn is_attached(&self) -> bool;

    /// Serialized form fields (`a=1&b=2`), `None` for non-forms
    fn serialize_form(&self) -> Option<String>;

    /// Ensure a hidden field with the given name exists and set its value
    fn set_hidden_field(&self, name: &str, value: &str);

    /// Whether this element is a form
    fn is_form(&self) -> bool {
        self.tag() == "form"
    }

    /// Whether this element is an anchor
    fn is_anchor(&self) -> bool {
        self.tag() == "a"
    }
}
