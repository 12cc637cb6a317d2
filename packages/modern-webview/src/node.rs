//! Node.js binding, built with the `node` feature.
//!
//! The JS thread owns the window, so every method runs on the UI thread.
//! Local-stream content is served from an in-memory map filled through
//! `addResource`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use napi::bindgen_prelude::*;
use napi_derive::napi;

use crate::events::Event;
use crate::host::{Host, Token};
use crate::options::{Content, WindowOptions};
use crate::runtime::{self, RuntimeInfo};
use crate::window::Window;

impl From<crate::Error> for napi::Error {
    fn from(err: crate::Error) -> Self {
        napi::Error::from_reason(err.to_string())
    }
}

/// Options for creating a new WebView window.
#[napi(object)]
#[derive(Debug, Clone, Default)]
pub struct WebViewOptions {
    /// Window title. Default: ""
    pub title: Option<String>,
    /// Outer width in pixels. Default: 800
    pub width: Option<f64>,
    /// Outer height in pixels. Default: 600
    pub height: Option<f64>,
    /// Allow resizing. Default: true
    pub resizable: Option<bool>,
    /// Enable devtools. Default: false
    pub devtools: Option<bool>,
    /// Folder for the rendering engine's profile.
    pub data_directory: Option<String>,
}

impl From<WebViewOptions> for WindowOptions {
    fn from(opts: WebViewOptions) -> Self {
        let defaults = WindowOptions::default();
        WindowOptions {
            title: opts.title.unwrap_or(defaults.title),
            width: opts.width.map(|v| v as i32).unwrap_or(defaults.width),
            height: opts.height.map(|v| v as i32).unwrap_or(defaults.height),
            resizable: opts.resizable.unwrap_or(defaults.resizable),
            devtools: opts.devtools.unwrap_or(defaults.devtools),
            data_directory: opts.data_directory.map(Into::into),
        }
    }
}

/// Result of `WebView.poll()`.
#[napi(object)]
#[derive(Debug, Clone)]
pub struct PollResult {
    /// "none", "quit", "contentLoaded" or "scriptNotify".
    pub kind: String,
    /// Text passed to `window.external.notify`, for "scriptNotify".
    pub data: Option<String>,
}

impl From<Event> for PollResult {
    fn from(event: Event) -> Self {
        let kind = match event {
            Event::None => "none",
            Event::Quit => "quit",
            Event::ContentLoaded => "contentLoaded",
            Event::ScriptNotify(_) => "scriptNotify",
        };
        PollResult {
            kind: kind.to_string(),
            data: event.into_payload(),
        }
    }
}

fn parse_content(content: String, content_type: Option<String>) -> Result<Content> {
    match content_type.as_deref().unwrap_or("url") {
        "url" => Ok(Content::Url(content)),
        "html" => Ok(Content::Html(content)),
        other => Err(napi::Error::from_reason(format!(
            "Unknown content type '{}'. Expected 'url' or 'html'.",
            other
        ))),
    }
}

type Resources = Rc<RefCell<HashMap<String, Vec<u8>>>>;

struct ResourceHost {
    resources: Resources,
}

impl Host for ResourceHost {
    fn get_content(&self, _owner: Token, path: &str) -> Option<Vec<u8>> {
        self.resources.borrow().get(path).cloned()
    }
}

/// Check whether the WebView2 runtime is installed.
#[napi]
pub fn check_runtime() -> RuntimeInfo {
    runtime::check_runtime()
}

/// A native window with an embedded WebView2 control.
#[napi]
pub struct WebView {
    window: Window,
    resources: Resources,
}

#[napi]
impl WebView {
    /// Create the window and block until its control is ready.
    /// `contentType` is "url" (default) or "html".
    #[napi(constructor)]
    pub fn new(
        content: String,
        content_type: Option<String>,
        options: Option<WebViewOptions>,
    ) -> Result<Self> {
        let content = parse_content(content, content_type)?;
        let options: WindowOptions = options.unwrap_or_default().into();
        let resources = Resources::default();
        let window = Window::new(
            &options,
            &content,
            ResourceHost {
                resources: Rc::clone(&resources),
            },
        )?;
        Ok(Self { window, resources })
    }

    // ---- Content loading ----

    #[napi]
    pub fn navigate(&self, content: String, content_type: Option<String>) -> Result<()> {
        let content = parse_content(content, content_type)?;
        Ok(self.window.navigate(Token::NONE, &content)?)
    }

    /// Navigate to a resource registered with `addResource`.
    #[napi]
    pub fn navigate_with_local_stream(&self, path: String) -> Result<()> {
        Ok(self.window.navigate_with_local_stream(Token::NONE, &path)?)
    }

    /// Serve `content` for `path` on the local stream.
    #[napi]
    pub fn add_resource(&self, path: String, content: Buffer) {
        let path = path.trim_start_matches('/').to_string();
        self.resources.borrow_mut().insert(path, content.to_vec());
    }

    #[napi]
    pub fn remove_resource(&self, path: String) -> bool {
        self.resources
            .borrow_mut()
            .remove(path.trim_start_matches('/'))
            .is_some()
    }

    // ---- Scripting ----

    /// Evaluate a script and return its JSON-serialized result.
    #[napi]
    pub fn eval_script(&self, script: String) -> Result<String> {
        Ok(self.window.evaluate_script(&script)?)
    }

    #[napi]
    pub fn inject_css(&self, css: String) -> Result<()> {
        Ok(self.window.inject_style(&css)?)
    }

    // ---- Event loop ----

    /// Return the next event. Non-blocking unless `blocking` is true.
    #[napi]
    pub fn poll(&self, blocking: Option<bool>) -> Result<PollResult> {
        let event = self.window.poll(blocking.unwrap_or(false))?;
        Ok(event.into())
    }
}
