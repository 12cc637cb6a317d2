//! Native window and rendering-control backends.
//!
//! A backend owns the top-level window, its message queue and the realized
//! control. [`Window`](crate::Window) drives it through [`Control`] and never
//! touches native handles itself.

use std::rc::Rc;

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::options::WindowOptions;
use crate::window::WindowState;

#[cfg(target_os = "windows")]
mod win32;

#[cfg(test)]
pub(crate) mod fake;

/// Outcome of one step of the native message pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) enum Pumped {
    /// A message was dispatched.
    Message,
    /// Nothing was waiting (non-blocking steps only).
    Idle,
    /// The quit message was retrieved.
    Quit,
}

/// Operations a realized control exposes to [`Window`](crate::Window).
///
/// Dropping the control tears down the native window and the control.
pub(crate) trait Control {
    /// Dispatch at most one native message. When `wait` is set, block until
    /// one arrives.
    fn pump(&self, wait: bool) -> Result<Pumped>;

    fn navigate(&self, url: &str) -> Result<()>;

    fn navigate_to_string(&self, html: &str) -> Result<()>;

    /// Run `script` in the current document and block until it has
    /// completed, returning the JSON serialization of its result.
    fn evaluate_script(&self, script: &str) -> Result<String>;
}

/// Create the native window and block until its control is realized.
#[cfg(target_os = "windows")]
pub(crate) fn create(
    options: &WindowOptions,
    state: Rc<WindowState>,
) -> Result<(Box<dyn Control>, Dispatcher)> {
    win32::create(options, state)
}

/// Create the native window and block until its control is realized.
#[cfg(not(target_os = "windows"))]
pub(crate) fn create(
    options: &WindowOptions,
    state: Rc<WindowState>,
) -> Result<(Box<dyn Control>, Dispatcher)> {
    let _ = (options, state);
    Err(crate::error::Error::internal(
        "unsupported platform: only Windows is supported",
    ))
}
