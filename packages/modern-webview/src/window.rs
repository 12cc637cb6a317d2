use std::cell::{Cell, RefCell};
use std::rc::Rc;

use include_dir::Dir;

use crate::dispatch::{DispatchItem, Dispatcher};
use crate::embedded::DirHost;
use crate::error::Result;
use crate::events::{Event, EventKind, EventQueue};
use crate::host::{Host, Token};
use crate::options::{Content, WindowOptions};
use crate::platform::{self, Control, Pumped};
use crate::resolver::{self, Resource};
use crate::script;

/// State reachable from native callbacks while the window is being pumped.
///
/// Only ever touched on the UI thread. Borrows are kept short and are never
/// held across a pump step or a host callback, so handlers can run
/// re-entrantly from inside a blocking wait.
pub(crate) struct WindowState {
    events: RefCell<EventQueue>,
    host: Box<dyn Host>,
    owner: Cell<Token>,
}

impl WindowState {
    pub(crate) fn new(host: Box<dyn Host>) -> Self {
        Self {
            events: RefCell::new(EventQueue::new()),
            host,
            owner: Cell::new(Token::NONE),
        }
    }

    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    pub(crate) fn push_event(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    fn pop_event(&self) -> Option<Event> {
        self.events.borrow_mut().pop()
    }

    pub(crate) fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    pub(crate) fn owner(&self) -> Token {
        self.owner.get()
    }

    fn set_owner(&self, owner: Token) {
        self.owner.set(owner);
    }

    /// Answer a virtual-stream request from the control.
    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    pub(crate) fn resolve(&self, uri: &str) -> Result<Resource> {
        resolver::resolve(self.host(), self.owner(), uri)
    }

    /// Run a dispatched item on the UI thread.
    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    pub(crate) fn deliver(&self, item: Box<DispatchItem>) {
        item.deliver(self.host());
    }
}

/// A native window hosting a realized WebView2 control.
///
/// Every method must be called on the thread that created the window; the
/// type is neither `Send` nor `Sync`. Use [`Window::dispatcher`] to schedule
/// work from other threads.
pub struct Window {
    control: Box<dyn Control>,
    dispatcher: Dispatcher,
    state: Rc<WindowState>,
    quit: Cell<bool>,
}

impl Window {
    /// Create the window, block until its control is realized, and start
    /// navigating to `content`.
    pub fn new(options: &WindowOptions, content: &Content, host: impl Host + 'static) -> Result<Self> {
        content.validate()?;
        let window = Self::create(options, host)?;
        window.load(content)?;
        Ok(window)
    }

    /// Create the window and start on `path` served by `host`.
    pub fn with_local_stream(
        options: &WindowOptions,
        path: &str,
        host: impl Host + 'static,
    ) -> Result<Self> {
        let uri = resolver::local_stream_uri(path)?;
        let window = Self::create(options, host)?;
        window.control.navigate(&uri)?;
        Ok(window)
    }

    fn create(options: &WindowOptions, host: impl Host + 'static) -> Result<Self> {
        options.validate()?;
        let state = Rc::new(WindowState::new(Box::new(host)));
        let (control, dispatcher) = platform::create(options, Rc::clone(&state))?;
        log::debug!("window '{}' created", options.title);
        Ok(Self::from_parts(control, dispatcher, state))
    }

    pub(crate) fn from_parts(
        control: Box<dyn Control>,
        dispatcher: Dispatcher,
        state: Rc<WindowState>,
    ) -> Self {
        Self {
            control,
            dispatcher,
            state,
            quit: Cell::new(false),
        }
    }

    /// Thread-safe handle for posting work to this window's UI thread.
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    // ---- Navigation ----

    /// Navigate to a URL or to an HTML string.
    pub fn navigate(&self, owner: Token, content: &Content) -> Result<()> {
        content.validate()?;
        self.state.set_owner(owner);
        self.load(content)
    }

    /// Navigate to `path` served by the host's content provider.
    pub fn navigate_with_local_stream(&self, owner: Token, path: &str) -> Result<()> {
        let uri = resolver::local_stream_uri(path)?;
        self.state.set_owner(owner);
        self.control.navigate(&uri)
    }

    fn load(&self, content: &Content) -> Result<()> {
        match content {
            Content::Url(url) => self.control.navigate(url.trim()),
            Content::Html(html) => self.control.navigate_to_string(html),
        }
    }

    // ---- Scripting ----

    /// Evaluate `script` in the page and return its JSON-serialized result.
    pub fn evaluate_script(&self, script: &str) -> Result<String> {
        self.control.evaluate_script(script)
    }

    /// Append a stylesheet to the current document.
    pub fn inject_style(&self, css: &str) -> Result<()> {
        self.control.evaluate_script(&script::inject_style(css))?;
        Ok(())
    }

    // ---- Event loop ----

    /// Post `(owner, callback)` to the UI thread; see [`Dispatcher::dispatch`].
    pub fn dispatch(&self, owner: Token, callback: Token) -> Result<()> {
        self.dispatcher.dispatch(owner, callback)
    }

    /// Return the next event.
    ///
    /// Queued events are returned first. Otherwise a blocking poll pumps
    /// native messages until an event is queued or the loop quits, and never
    /// returns [`Event::None`]. A non-blocking poll performs at most one pump
    /// step and returns [`Event::None`] when that step produced nothing.
    pub fn poll(&self, blocking: bool) -> Result<Event> {
        loop {
            if let Some(event) = self.state.pop_event() {
                return Ok(event);
            }
            if self.quit.get() {
                return Ok(Event::Quit);
            }
            match self.control.pump(blocking)? {
                Pumped::Quit => {
                    log::debug!("message loop quit");
                    self.quit.set(true);
                    return Ok(Event::Quit);
                }
                Pumped::Message | Pumped::Idle if !blocking => {
                    return Ok(self.state.pop_event().unwrap_or(Event::None));
                }
                Pumped::Message | Pumped::Idle => {}
            }
        }
    }

    /// Iterate over the events that are ready now without blocking. The
    /// iterator ends when nothing is pending, after yielding [`Event::Quit`],
    /// or after yielding an error.
    pub fn poll_iter(&self) -> PollIter<'_> {
        PollIter {
            window: self,
            done: false,
        }
    }

    /// Pump the loop until quit, handing each event to the host's
    /// [`on_generic_event`](Host::on_generic_event) or
    /// [`on_script_notify`](Host::on_script_notify) with `owner`.
    pub fn run(&self, owner: Token) -> Result<()> {
        self.state.set_owner(owner);
        loop {
            match self.poll(true)? {
                Event::Quit => return Ok(()),
                Event::ContentLoaded => {
                    self.state.host().on_generic_event(owner, EventKind::ContentLoaded)
                }
                Event::ScriptNotify(text) => self.state.host().on_script_notify(owner, &text),
                Event::None => {}
            }
        }
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        log::debug!("window released");
    }
}

/// Create a window with no content provider and hand every event to
/// `handler` until the user closes it.
///
/// The handler may call back into the window; an error from it stops the
/// loop and is returned.
pub fn webview(
    title: &str,
    content: Content,
    size: (i32, i32),
    resizable: bool,
    handler: impl FnMut(&Window, Event) -> Result<()>,
) -> Result<()> {
    webview_with_host(title, content, size, resizable, crate::host::NullHost, handler)
}

/// Like [`webview`], with `host` answering local-stream requests.
pub fn webview_with_host(
    title: &str,
    content: Content,
    size: (i32, i32),
    resizable: bool,
    host: impl Host + 'static,
    handler: impl FnMut(&Window, Event) -> Result<()>,
) -> Result<()> {
    let options = WindowOptions::new(title, size, resizable);
    let window = Window::new(&options, &content, host)?;
    drive(&window, handler)
}

/// Serve `dir` on the local stream and start on its `index` file.
pub fn webview_dir(
    title: &str,
    dir: &'static Dir<'static>,
    index: &str,
    size: (i32, i32),
    resizable: bool,
    handler: impl FnMut(&Window, Event) -> Result<()>,
) -> Result<()> {
    let options = WindowOptions::new(title, size, resizable);
    let window = Window::with_local_stream(&options, index, DirHost::new(dir))?;
    drive(&window, handler)
}

fn drive(window: &Window, mut handler: impl FnMut(&Window, Event) -> Result<()>) -> Result<()> {
    loop {
        match window.poll(true)? {
            Event::Quit => return Ok(()),
            event => handler(window, event)?,
        }
    }
}

/// Non-blocking event iterator returned by [`Window::poll_iter`].
pub struct PollIter<'a> {
    window: &'a Window,
    done: bool,
}

impl Iterator for PollIter<'_> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.window.poll(false) {
            Ok(Event::None) => {
                self.done = true;
                None
            }
            Ok(Event::Quit) => {
                self.done = true;
                Some(Ok(Event::Quit))
            }
            Ok(event) => Some(Ok(event)),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
