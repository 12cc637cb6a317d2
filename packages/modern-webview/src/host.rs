use std::ffi::c_void;

#[cfg(test)]
use mockall::automock;

use crate::events::EventKind;

/// Opaque pointer-sized value owned by the embedding runtime.
///
/// The window never dereferences a token; it only hands it back to the
/// [`Host`] callbacks it was supplied for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Token(usize);

impl Token {
    pub const NONE: Token = Token(0);

    pub const fn new(value: usize) -> Self {
        Self(value)
    }

    pub fn from_ptr(ptr: *mut c_void) -> Self {
        Self(ptr as usize)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    pub fn value(self) -> usize {
        self.0
    }
}

/// Callbacks into the embedding runtime.
///
/// All methods are invoked on the window's UI thread, either while the
/// message loop is being pumped or from [`Window::run`](crate::Window::run).
#[cfg_attr(test, automock)]
pub trait Host {
    /// Supply the bytes of a virtual-stream resource, or `None` if the path
    /// is unknown.
    fn get_content(&self, owner: Token, path: &str) -> Option<Vec<u8>> {
        let _ = (owner, path);
        None
    }

    /// Run a callback previously posted through a
    /// [`Dispatcher`](crate::Dispatcher).
    fn on_dispatch(&self, owner: Token, callback: Token) {
        let _ = (owner, callback);
    }

    /// A payload-free event was dequeued by `run`.
    fn on_generic_event(&self, owner: Token, kind: EventKind) {
        let _ = (owner, kind);
    }

    /// A script notification was dequeued by `run`.
    fn on_script_notify(&self, owner: Token, text: &str) {
        let _ = (owner, text);
    }
}

/// A host that serves nothing and ignores every callback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl Host for NullHost {}
