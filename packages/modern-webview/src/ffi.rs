//! C call boundary.
//!
//! Every fallible function returns a [`ResultCode`]; the message of the
//! calling thread's last failure is available once through
//! [`webview_get_last_error`]. Strings handed out by this module belong to
//! the caller and must be released with [`webview_string_free`].
//!
//! Except for [`webview_dispatch`], functions taking a window must be called
//! on the thread that created it.

use std::ffi::{c_char, c_void, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::OnceLock;

use crate::dispatch::Dispatcher;
use crate::error::{self, Error, Result, ResultCode};
use crate::events::EventKind;
use crate::host::{Host, Token};
use crate::options::{Content, ContentType, WindowOptions};
use crate::runtime;
use crate::window::Window;

pub type GetContentFn = unsafe extern "C" fn(
    owner: *mut c_void,
    path: *const c_char,
    data: *mut *const u8,
    len: *mut usize,
) -> bool;
pub type DispatchFn = unsafe extern "C" fn(owner: *mut c_void, callback: *mut c_void);
pub type GenericEventFn = unsafe extern "C" fn(owner: *mut c_void, kind: u32);
pub type ScriptNotifyFn = unsafe extern "C" fn(owner: *mut c_void, text: *const c_char);

/// Callbacks into the embedding runtime, registered once per process with
/// [`webview_init`]. A missing entry behaves as "not found" or as a no-op.
///
/// `get_content` returns `true` and fills `data`/`len` when it knows the
/// path. The buffer must stay valid until the callback is next invoked on
/// the same thread; it is copied immediately.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCallbacks {
    pub get_content: Option<GetContentFn>,
    pub dispatch: Option<DispatchFn>,
    pub generic_event: Option<GenericEventFn>,
    pub script_notify: Option<ScriptNotifyFn>,
}

static CALLBACKS: OnceLock<HostCallbacks> = OnceLock::new();

/// [`Host`] implementation forwarding to a [`HostCallbacks`] table.
struct CallbackHost {
    callbacks: HostCallbacks,
}

impl CallbackHost {
    fn registered() -> Self {
        Self {
            callbacks: CALLBACKS.get().copied().unwrap_or_default(),
        }
    }
}

impl Host for CallbackHost {
    fn get_content(&self, owner: Token, path: &str) -> Option<Vec<u8>> {
        let get_content = self.callbacks.get_content?;
        let path = CString::new(path).ok()?;
        let mut data: *const u8 = ptr::null();
        let mut len: usize = 0;
        let found = unsafe { get_content(owner.as_ptr(), path.as_ptr(), &mut data, &mut len) };
        if !found {
            return None;
        }
        if data.is_null() || len == 0 {
            return Some(Vec::new());
        }
        Some(unsafe { std::slice::from_raw_parts(data, len) }.to_vec())
    }

    fn on_dispatch(&self, owner: Token, callback: Token) {
        if let Some(dispatch) = self.callbacks.dispatch {
            unsafe { dispatch(owner.as_ptr(), callback.as_ptr()) };
        }
    }

    fn on_generic_event(&self, owner: Token, kind: EventKind) {
        if let Some(generic_event) = self.callbacks.generic_event {
            unsafe { generic_event(owner.as_ptr(), kind as u32) };
        }
    }

    fn on_script_notify(&self, owner: Token, text: &str) {
        if let Some(script_notify) = self.callbacks.script_notify {
            let text = to_c_string(text.to_string());
            unsafe { script_notify(owner.as_ptr(), text.as_ptr()) };
        }
    }
}

/// Opaque window handle owned by the caller.
pub struct WebViewHandle {
    /// Read from other threads by [`webview_dispatch`]; everything else is
    /// UI-thread only.
    dispatcher: Dispatcher,
    window: Window,
}

impl WebViewHandle {
    fn new(window: Window) -> Box<Self> {
        Box::new(Self {
            dispatcher: window.dispatcher(),
            window,
        })
    }
}

// ── Helpers ────────────────────────────────────────────────────

/// Run a boundary operation, catching panics and recording failures.
fn guard<T>(f: impl FnOnce() -> Result<T>) -> (ResultCode, Option<T>) {
    error::capture(|| {
        panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("panic at the call boundary: {}", message);
            Err(Error::internal(format!("panic: {}", message)))
        })
    })
}

unsafe fn read_str<'a>(value: *const c_char, name: &str) -> Result<&'a str> {
    if value.is_null() {
        return Err(Error::invalid_argument(format!("{} must not be null", name)));
    }
    CStr::from_ptr(value)
        .to_str()
        .map_err(|_| Error::invalid_argument(format!("{} is not valid UTF-8", name)))
}

unsafe fn window_ref<'a>(window: *mut WebViewHandle) -> Result<&'a Window> {
    window
        .as_ref()
        .map(|handle| &handle.window)
        .ok_or_else(|| Error::invalid_argument("window must not be null"))
}

/// Interior NULs cannot cross the boundary; they are dropped.
fn to_c_string(value: String) -> CString {
    CString::new(value).unwrap_or_else(|e| {
        let mut bytes = e.into_vec();
        bytes.retain(|&b| b != 0);
        CString::new(bytes).unwrap_or_default()
    })
}

fn into_raw_string(value: String) -> *mut c_char {
    to_c_string(value).into_raw()
}

// ── Exported functions ─────────────────────────────────────────

/// Register the host callback table. Only the first call succeeds.
///
/// # Safety
///
/// `callbacks` must be null or point to a valid [`HostCallbacks`].
#[no_mangle]
pub unsafe extern "C" fn webview_init(callbacks: *const HostCallbacks) -> ResultCode {
    guard(|| {
        let callbacks = callbacks
            .as_ref()
            .ok_or_else(|| Error::invalid_argument("callbacks must not be null"))?;
        CALLBACKS
            .set(*callbacks)
            .map_err(|_| Error::invalid_argument("host callbacks are already registered"))
    })
    .0
}

/// Create a window and block until its control is realized. On failure
/// `*window` is set to null.
///
/// # Safety
///
/// `title` and `content` must be null or NUL-terminated strings; `window`
/// must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn webview_new(
    title: *const c_char,
    content: *const c_char,
    content_type: u32,
    width: i32,
    height: i32,
    resizable: bool,
    window: *mut *mut WebViewHandle,
) -> ResultCode {
    if !window.is_null() {
        *window = ptr::null_mut();
    }
    let (code, handle) = guard(|| {
        if window.is_null() {
            return Err(Error::invalid_argument("window out-parameter must not be null"));
        }
        let title = read_str(title, "title")?;
        let content = Content::new(
            ContentType::try_from(content_type)?,
            read_str(content, "content")?,
        );
        let options = WindowOptions::new(title, (width, height), resizable);
        Window::new(&options, &content, CallbackHost::registered()).map(WebViewHandle::new)
    });
    if let Some(handle) = handle {
        *window = Box::into_raw(handle);
    }
    code
}

/// Destroy a window created by [`webview_new`]. Null is ignored.
///
/// # Safety
///
/// `window` must come from [`webview_new`] and must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn webview_free(window: *mut WebViewHandle) {
    if window.is_null() {
        return;
    }
    let handle = Box::from_raw(window);
    if panic::catch_unwind(AssertUnwindSafe(move || drop(handle))).is_err() {
        log::error!("panic while releasing a window");
    }
}

/// Pump the loop until quit, forwarding events to the host callbacks.
///
/// # Safety
///
/// `window` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn webview_run(window: *mut WebViewHandle, owner: *mut c_void) -> ResultCode {
    guard(|| window_ref(window)?.run(Token::from_ptr(owner))).0
}

/// Return the next event. `*data` receives the payload of a script
/// notification and null otherwise.
///
/// # Safety
///
/// `window` must be null or a live handle; `kind` and `data` must be null
/// or writable.
#[no_mangle]
pub unsafe extern "C" fn webview_loop(
    window: *mut WebViewHandle,
    blocking: bool,
    kind: *mut u32,
    data: *mut *mut c_char,
) -> ResultCode {
    if !kind.is_null() {
        *kind = EventKind::None as u32;
    }
    if !data.is_null() {
        *data = ptr::null_mut();
    }
    let (code, event) = guard(|| {
        if kind.is_null() || data.is_null() {
            return Err(Error::invalid_argument("kind and data must not be null"));
        }
        window_ref(window)?.poll(blocking)
    });
    if let Some(event) = event {
        *kind = event.kind() as u32;
        *data = event.into_payload().map_or(ptr::null_mut(), into_raw_string);
    }
    code
}

/// # Safety
///
/// `window` must be null or a live handle; `content` must be null or a
/// NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn webview_navigate(
    window: *mut WebViewHandle,
    owner: *mut c_void,
    content: *const c_char,
    content_type: u32,
) -> ResultCode {
    guard(|| {
        let window = window_ref(window)?;
        let content = Content::new(
            ContentType::try_from(content_type)?,
            read_str(content, "content")?,
        );
        window.navigate(Token::from_ptr(owner), &content)
    })
    .0
}

/// # Safety
///
/// `window` must be null or a live handle; `path` must be null or a
/// NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn webview_navigate_with_local_stream(
    window: *mut WebViewHandle,
    owner: *mut c_void,
    path: *const c_char,
) -> ResultCode {
    guard(|| {
        let window = window_ref(window)?;
        window.navigate_with_local_stream(Token::from_ptr(owner), read_str(path, "path")?)
    })
    .0
}

/// Evaluate a script; `*value` receives its JSON-serialized result.
///
/// # Safety
///
/// `window` must be null or a live handle; `script` must be null or a
/// NUL-terminated string; `value` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn webview_eval_script(
    window: *mut WebViewHandle,
    script: *const c_char,
    value: *mut *mut c_char,
) -> ResultCode {
    if !value.is_null() {
        *value = ptr::null_mut();
    }
    let (code, result) = guard(|| {
        if value.is_null() {
            return Err(Error::invalid_argument("value out-parameter must not be null"));
        }
        let window = window_ref(window)?;
        window.evaluate_script(read_str(script, "script")?)
    });
    if let Some(result) = result {
        *value = into_raw_string(result);
    }
    code
}

/// # Safety
///
/// `window` must be null or a live handle; `css` must be null or a
/// NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn webview_inject_css(window: *mut WebViewHandle, css: *const c_char) -> ResultCode {
    guard(|| window_ref(window)?.inject_style(read_str(css, "css")?)).0
}

/// Schedule `callback` on the window's UI thread. Callable from any thread.
///
/// # Safety
///
/// `window` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn webview_dispatch(
    window: *mut WebViewHandle,
    owner: *mut c_void,
    callback: *mut c_void,
) -> ResultCode {
    guard(|| {
        if window.is_null() {
            return Err(Error::invalid_argument("window must not be null"));
        }
        if callback.is_null() {
            return Err(Error::invalid_argument("callback must not be null"));
        }
        // Only the thread-safe field is touched; the window itself is not.
        let dispatcher = &*ptr::addr_of!((*window).dispatcher);
        dispatcher.dispatch(Token::from_ptr(owner), Token::from_ptr(callback))
    })
    .0
}

/// Message of the calling thread's last failure, or null. Each failure is
/// returned once.
#[no_mangle]
pub extern "C" fn webview_get_last_error() -> *mut c_char {
    error::take_last_error().map_or(ptr::null_mut(), |err| into_raw_string(err.to_string()))
}

/// Release a string returned by this module. Null is ignored.
///
/// # Safety
///
/// `value` must come from this module and must not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn webview_string_free(value: *mut c_char) {
    if !value.is_null() {
        drop(CString::from_raw(value));
    }
}

/// Version of the installed WebView2 runtime, or null when none is usable.
#[no_mangle]
pub extern "C" fn webview_runtime_version() -> *mut c_char {
    runtime::check_runtime()
        .version
        .map_or(ptr::null_mut(), into_raw_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::{self, FakeControl, Message};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    thread_local! {
        static DISPATCHED: RefCell<Vec<(usize, usize)>> = const { RefCell::new(Vec::new()) };
        static NOTIFIED: RefCell<Vec<(usize, String)>> = const { RefCell::new(Vec::new()) };
        static GENERIC: RefCell<Vec<(usize, u32)>> = const { RefCell::new(Vec::new()) };
    }

    const PAGE: &[u8] = b"<p>served</p>";

    unsafe extern "C" fn get_content(
        _owner: *mut c_void,
        path: *const c_char,
        data: *mut *const u8,
        len: *mut usize,
    ) -> bool {
        if CStr::from_ptr(path).to_str() != Ok("page.html") {
            return false;
        }
        *data = PAGE.as_ptr();
        *len = PAGE.len();
        true
    }

    unsafe extern "C" fn record_dispatch(owner: *mut c_void, callback: *mut c_void) {
        DISPATCHED.with(|d| d.borrow_mut().push((owner as usize, callback as usize)));
    }

    unsafe extern "C" fn record_generic(owner: *mut c_void, kind: u32) {
        GENERIC.with(|g| g.borrow_mut().push((owner as usize, kind)));
    }

    unsafe extern "C" fn record_notify(owner: *mut c_void, text: *const c_char) {
        let text = CStr::from_ptr(text).to_string_lossy().into_owned();
        NOTIFIED.with(|n| n.borrow_mut().push((owner as usize, text)));
    }

    fn recording_callbacks() -> HostCallbacks {
        HostCallbacks {
            get_content: Some(get_content),
            dispatch: Some(record_dispatch),
            generic_event: Some(record_generic),
            script_notify: Some(record_notify),
        }
    }

    fn fake_handle(callbacks: HostCallbacks) -> (*mut WebViewHandle, Rc<FakeControl>) {
        let (window, fake) = fake::window(CallbackHost { callbacks });
        (Box::into_raw(WebViewHandle::new(window)), fake)
    }

    fn last_error() -> Option<String> {
        let raw = webview_get_last_error();
        if raw.is_null() {
            return None;
        }
        let message = unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned();
        unsafe { webview_string_free(raw) };
        Some(message)
    }

    fn token(value: usize) -> *mut c_void {
        value as *mut c_void
    }

    #[test]
    fn new_rejects_bad_arguments_with_null_handle() {
        let title = CString::new("demo").unwrap();
        let content = CString::new("<p>hi</p>").unwrap();
        let mut window = 0x1 as *mut WebViewHandle;

        let code = unsafe {
            webview_new(title.as_ptr(), content.as_ptr(), 9, 800, 600, true, &mut window)
        };
        assert_eq!(code, ResultCode::InvalidArgument);
        assert!(window.is_null());
        assert_eq!(last_error().as_deref(), Some("invalid argument: unknown content type 9"));
        assert_eq!(last_error(), None);

        let code = unsafe {
            webview_new(ptr::null(), content.as_ptr(), 2, 800, 600, true, &mut window)
        };
        assert_eq!(code, ResultCode::InvalidArgument);

        let code = unsafe { webview_new(title.as_ptr(), content.as_ptr(), 2, 0, 600, true, &mut window) };
        assert_eq!(code, ResultCode::InvalidArgument);
        assert!(window.is_null());

        let url = CString::new("not a url").unwrap();
        let code = unsafe { webview_new(title.as_ptr(), url.as_ptr(), 1, 800, 600, true, &mut window) };
        assert_eq!(code, ResultCode::InvalidArgument);

        let code = unsafe {
            webview_new(title.as_ptr(), content.as_ptr(), 2, 800, 600, true, ptr::null_mut())
        };
        assert_eq!(code, ResultCode::InvalidArgument);
    }

    #[test]
    #[cfg(not(target_os = "windows"))]
    fn new_fails_cleanly_off_windows() {
        let title = CString::new("demo").unwrap();
        let content = CString::new("https://github.com").unwrap();
        let mut window = ptr::null_mut();
        let code = unsafe {
            webview_new(title.as_ptr(), content.as_ptr(), 1, 800, 600, true, &mut window)
        };
        assert_eq!(code, ResultCode::InternalError);
        assert!(window.is_null());
        assert!(last_error().unwrap().contains("unsupported platform"));
    }

    #[test]
    fn null_window_is_invalid_argument() {
        let css = CString::new("body{}").unwrap();
        assert_eq!(
            unsafe { webview_inject_css(ptr::null_mut(), css.as_ptr()) },
            ResultCode::InvalidArgument
        );
        assert_eq!(
            unsafe { webview_dispatch(ptr::null_mut(), token(1), token(2)) },
            ResultCode::InvalidArgument
        );
        assert_eq!(
            unsafe { webview_run(ptr::null_mut(), token(1)) },
            ResultCode::InvalidArgument
        );
        assert_eq!(last_error().as_deref(), Some("invalid argument: window must not be null"));
        unsafe { webview_free(ptr::null_mut()) };
    }

    #[test]
    fn loop_reports_kinds_and_payloads() {
        let (window, fake) = fake_handle(HostCallbacks::default());
        fake.post(Message::ContentLoaded);
        fake.post(Message::ScriptNotify("hello".into()));
        fake.post(Message::Quit);

        let mut kind = 0;
        let mut data = ptr::null_mut();
        let mut seen = Vec::new();
        for _ in 0..3 {
            let code = unsafe { webview_loop(window, true, &mut kind, &mut data) };
            assert_eq!(code, ResultCode::Success);
            let payload = (!data.is_null()).then(|| {
                let text = unsafe { CStr::from_ptr(data) }.to_string_lossy().into_owned();
                unsafe { webview_string_free(data) };
                text
            });
            seen.push((kind, payload));
        }
        assert_eq!(
            seen,
            vec![
                (EventKind::ContentLoaded as u32, None),
                (EventKind::ScriptNotify as u32, Some("hello".to_string())),
                (EventKind::Quit as u32, None),
            ]
        );

        let code = unsafe { webview_loop(window, false, &mut kind, &mut data) };
        assert_eq!(code, ResultCode::Success);
        assert_eq!(kind, EventKind::Quit as u32);
        unsafe { webview_free(window) };
    }

    #[test]
    fn loop_rejects_null_out_parameters() {
        let (window, _fake) = fake_handle(HostCallbacks::default());
        let mut kind = 0;
        let code = unsafe { webview_loop(window, false, &mut kind, ptr::null_mut()) };
        assert_eq!(code, ResultCode::InvalidArgument);
        unsafe { webview_free(window) };
    }

    #[test]
    fn dispatch_runs_callback_once_with_tokens() {
        let (window, fake) = fake_handle(recording_callbacks());
        let shared = window as usize;
        let code = std::thread::spawn(move || unsafe {
            webview_dispatch(shared as *mut WebViewHandle, token(7), token(8))
        })
        .join()
        .unwrap();
        assert_eq!(code, ResultCode::Success);
        assert!(DISPATCHED.with(|d| d.borrow().is_empty()));

        let mut kind = 0;
        let mut data = ptr::null_mut();
        unsafe { webview_loop(window, false, &mut kind, &mut data) };
        assert_eq!(kind, EventKind::None as u32);
        assert_eq!(DISPATCHED.with(|d| d.borrow().clone()), vec![(7, 8)]);
        assert_eq!(fake.pumps(), 1);

        assert_eq!(
            unsafe { webview_dispatch(window, token(7), ptr::null_mut()) },
            ResultCode::InvalidArgument
        );
        unsafe { webview_free(window) };
    }

    #[test]
    fn run_forwards_events_to_callbacks() {
        let (window, fake) = fake_handle(recording_callbacks());
        fake.post(Message::ContentLoaded);
        fake.post(Message::ScriptNotify("ready".into()));
        fake.post(Message::Quit);

        assert_eq!(unsafe { webview_run(window, token(3)) }, ResultCode::Success);
        assert_eq!(
            GENERIC.with(|g| g.borrow().clone()),
            vec![(3, EventKind::ContentLoaded as u32)]
        );
        assert_eq!(
            NOTIFIED.with(|n| n.borrow().clone()),
            vec![(3, "ready".to_string())]
        );
        unsafe { webview_free(window) };
    }

    #[test]
    fn eval_script_returns_owned_json() {
        let (window, fake) = fake_handle(HostCallbacks::default());
        let html = CString::new("<h1>Hello</h1>").unwrap();
        assert_eq!(
            unsafe { webview_navigate(window, token(1), html.as_ptr(), 2) },
            ResultCode::Success
        );

        let script = CString::new("document.readyState").unwrap();
        let mut value = ptr::null_mut();
        let code = unsafe { webview_eval_script(window, script.as_ptr(), &mut value) };
        assert_eq!(code, ResultCode::Success);
        assert_eq!(unsafe { CStr::from_ptr(value) }.to_str(), Ok("\"complete\""));
        unsafe { webview_string_free(value) };
        assert_eq!(fake.scripts(), vec!["document.readyState".to_string()]);
        unsafe { webview_free(window) };
    }

    #[test]
    fn local_stream_uses_content_callback() {
        let (window, fake) = fake_handle(recording_callbacks());
        let found = CString::new("page.html").unwrap();
        let missing = CString::new("gone.html").unwrap();

        for path in [&found, &missing] {
            let code = unsafe { webview_navigate_with_local_stream(window, token(4), path.as_ptr()) };
            assert_eq!(code, ResultCode::Success);
        }
        let mut kind = 0;
        let mut data = ptr::null_mut();
        unsafe { webview_loop(window, false, &mut kind, &mut data) };
        assert_eq!(kind, EventKind::ContentLoaded as u32);
        unsafe { webview_loop(window, false, &mut kind, &mut data) };
        assert_eq!(kind, EventKind::None as u32);

        let responses = fake.responses();
        assert_eq!(responses[0].as_ref().map(|r| r.body.clone()), Ok(PAGE.to_vec()));
        assert_eq!(responses[1], Err(Error::NotFound("gone.html".into())));

        let empty = CString::new("").unwrap();
        let code = unsafe { webview_navigate_with_local_stream(window, token(4), empty.as_ptr()) };
        assert_eq!(code, ResultCode::InvalidArgument);
        unsafe { webview_free(window) };
    }

    #[test]
    fn missing_callbacks_are_not_found_and_no_ops() {
        let host = CallbackHost {
            callbacks: HostCallbacks::default(),
        };
        assert_eq!(host.get_content(Token::NONE, "page.html"), None);
        host.on_dispatch(Token::new(1), Token::new(2));
        host.on_script_notify(Token::NONE, "ignored");
    }

    #[test]
    fn init_registers_callbacks_once() {
        assert_eq!(unsafe { webview_init(ptr::null()) }, ResultCode::InvalidArgument);
        let callbacks = recording_callbacks();
        assert_eq!(unsafe { webview_init(&callbacks) }, ResultCode::Success);
        assert_eq!(unsafe { webview_init(&callbacks) }, ResultCode::InvalidArgument);
        assert!(CallbackHost::registered().callbacks.dispatch.is_some());
    }

    #[test]
    fn panics_become_internal_errors() {
        let (code, value) = guard::<()>(|| panic!("boom"));
        assert_eq!(code, ResultCode::InternalError);
        assert_eq!(value, None);
        assert_eq!(last_error().as_deref(), Some("panic: boom"));
    }

    #[test]
    fn interior_nul_is_stripped() {
        assert_eq!(to_c_string("a\0b".to_string()).to_str(), Ok("ab"));
    }
}
