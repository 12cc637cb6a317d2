//! Embed a WebView2 rendering control in a native window behind a
//! synchronous, single-threaded call surface.
//!
//! A [`Window`] is created, polled and torn down on one UI thread. The
//! control's completion-based APIs are turned into blocking calls that keep
//! the thread's message queue flowing while they wait, and its events are
//! queued and handed out by [`Window::poll`] or [`Window::run`]. Other
//! threads schedule work through a [`Dispatcher`].
//!
//! Content can also be served by the embedding application over a private
//! local-stream origin, for instance from a directory compiled into the
//! binary ([`DirHost`], [`webview_dir`]).
//!
//! The same surface is exported as a C ABI from [`ffi`] and, with the
//! `node` feature, as a Node.js class.
//!
//! ```no_run
//! use modern_webview::{Content, Event, NullHost, Window, WindowOptions};
//!
//! # fn main() -> modern_webview::Result<()> {
//! let options = WindowOptions::new("Hello", (800, 600), true);
//! let window = Window::new(&options, &Content::Html("<h1>Hi</h1>".into()), NullHost)?;
//! loop {
//!     match window.poll(true)? {
//!         Event::ContentLoaded => window.inject_style("h1 { color: teal; }")?,
//!         Event::Quit => break,
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
mod bridge;
mod dispatch;
mod embedded;
mod error;
mod events;
pub mod ffi;
mod host;
mod options;
mod platform;
mod resolver;
mod runtime;
mod script;
mod window;

#[cfg(feature = "node")]
mod node;

pub use dispatch::Dispatcher;
pub use embedded::DirHost;
pub use error::{Error, Result, ResultCode};
pub use events::{Event, EventKind};
pub use host::{Host, NullHost, Token};
pub use options::{Content, ContentType, WindowOptions};
pub use resolver::{local_stream_uri, LOCAL_STREAM_ORIGIN};
pub use runtime::{check_runtime, RuntimeInfo};
pub use window::{webview, webview_dir, webview_with_host, PollIter, Window};
