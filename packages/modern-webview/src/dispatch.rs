use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::host::{Host, Token};

/// A unit of work posted from any thread to a window's UI thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchItem {
    pub owner: Token,
    pub callback: Token,
}

impl DispatchItem {
    pub fn new(owner: Token, callback: Token) -> Box<Self> {
        Box::new(Self { owner, callback })
    }

    /// Hand the item's ownership to a native message parameter.
    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    pub fn into_raw(self: Box<Self>) -> isize {
        Box::into_raw(self) as isize
    }

    /// Take ownership back from a message parameter produced by
    /// [`into_raw`](Self::into_raw).
    ///
    /// # Safety
    ///
    /// `raw` must come from `into_raw` and must not have been reclaimed yet.
    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    pub unsafe fn from_raw(raw: isize) -> Box<Self> {
        Box::from_raw(raw as *mut Self)
    }

    /// Run the item on the UI thread. The item is released afterwards.
    pub fn deliver(self: Box<Self>, host: &dyn Host) {
        host.on_dispatch(self.owner, self.callback);
    }
}

/// Posting side of a window's message queue. Safe to call from any thread.
pub trait Post: Send + Sync {
    /// Queue the item behind everything already posted. On failure the item
    /// has been released and will never run.
    fn post(&self, item: Box<DispatchItem>) -> Result<()>;
}

/// Cloneable, thread-safe handle used to schedule work on a window's UI
/// thread.
#[derive(Clone)]
pub struct Dispatcher {
    target: Arc<dyn Post>,
}

impl Dispatcher {
    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    pub fn new(target: Arc<dyn Post>) -> Self {
        Self { target }
    }

    /// Post `(owner, callback)` to the window. Returns immediately; the
    /// host's [`on_dispatch`](Host::on_dispatch) runs the next time the
    /// window pumps its queue.
    pub fn dispatch(&self, owner: Token, callback: Token) -> Result<()> {
        self.target.post(DispatchItem::new(owner, callback))
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}
