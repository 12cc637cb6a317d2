//! WebView2 hosted in a plain Win32 top-level window.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::c_void;
use std::rc::{Rc, Weak};
use std::sync::{Arc, Once, OnceLock};

use windows::core::{w, Interface, PCWSTR, PWSTR};
use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Gdi::*;
use windows::Win32::System::Com::*;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::{CreateEventW, SetEvent, INFINITE};
use windows::Win32::UI::HiDpi::{
    SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
};
use windows::Win32::UI::Shell::SHCreateMemStream;
use windows::Win32::UI::WindowsAndMessaging::*;

use webview2_com::Microsoft::Web::WebView2::Win32::*;
use webview2_com::{
    CreateCoreWebView2ControllerCompletedHandler, CreateCoreWebView2EnvironmentCompletedHandler,
    DOMContentLoadedEventHandler, ExecuteScriptCompletedHandler, WebMessageReceivedEventHandler,
    WebResourceRequestedEventHandler,
};

use super::{Control, Pumped};
use crate::bridge::{self, Waiter};
use crate::dispatch::{DispatchItem, Dispatcher, Post};
use crate::error::{Error, Result};
use crate::events::Event;
use crate::options::WindowOptions;
use crate::resolver;
use crate::runtime;
use crate::script;
use crate::window::WindowState;

const WINDOW_CLASS: PCWSTR = w!("ModernWebViewWindow");

/// Carries a boxed [`DispatchItem`] in `lParam`.
const WM_DISPATCH: u32 = WM_APP + 1;

static DPI_AWARENESS: Once = Once::new();
static WINDOW_CLASS_REGISTERED: OnceLock<Result<()>> = OnceLock::new();

thread_local! {
    static COM_INITIALIZED: Cell<bool> = const { Cell::new(false) };
    /// Live windows on this thread, looked up by the window procedure.
    static WINDOWS: RefCell<HashMap<isize, Weak<NativeWindow>>> = RefCell::new(HashMap::new());
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Copy out and free a string allocated by the control.
unsafe fn take_pwstr(value: PWSTR) -> String {
    if value.is_null() {
        return String::new();
    }
    let text = value.to_string().unwrap_or_default();
    CoTaskMemFree(Some(value.0 as *const _));
    text
}

// ── Process and thread setup ───────────────────────────────────

fn initialize() -> Result<()> {
    DPI_AWARENESS.call_once(|| unsafe {
        if let Err(e) = SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) {
            log::debug!("DPI awareness left unchanged: {}", e);
        }
    });

    COM_INITIALIZED.with(|initialized| {
        if initialized.get() {
            return Ok(());
        }
        unsafe {
            CoInitializeEx(None, COINIT_APARTMENTTHREADED)
                .ok()
                .map_err(|e| Error::context("CoInitializeEx", e))?;
        }
        initialized.set(true);
        Ok(())
    })
}

fn ensure_class_registered() -> Result<()> {
    WINDOW_CLASS_REGISTERED
        .get_or_init(|| unsafe {
            let hinstance =
                GetModuleHandleW(None).map_err(|e| Error::context("GetModuleHandle", e))?;

            let wc = WNDCLASSEXW {
                cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: Some(wnd_proc),
                hInstance: hinstance.into(),
                hCursor: LoadCursorW(None, IDC_ARROW).unwrap_or_default(),
                hbrBackground: HBRUSH((COLOR_WINDOW.0 + 1) as _),
                lpszClassName: WINDOW_CLASS,
                ..Default::default()
            };

            if RegisterClassExW(&wc) == 0 {
                return Err(Error::context(
                    "RegisterClassEx",
                    windows::core::Error::from_win32(),
                ));
            }
            Ok(())
        })
        .clone()
}

// ── Window registry ────────────────────────────────────────────

/// The native side of one window: its handle and, once realized, its
/// controller. Dropping it closes the controller and destroys the window.
struct NativeWindow {
    hwnd: HWND,
    state: Weak<WindowState>,
    controller: RefCell<Option<ICoreWebView2Controller>>,
}

impl NativeWindow {
    fn fit_controller(&self) {
        let controller = self.controller.borrow().clone();
        if let Some(controller) = controller {
            unsafe {
                let mut rect = RECT::default();
                if GetClientRect(self.hwnd, &mut rect).is_ok() {
                    let _ = controller.SetBounds(rect);
                }
            }
        }
    }
}

impl Drop for NativeWindow {
    fn drop(&mut self) {
        // Unregister first so WM_DESTROY does not post a quit message.
        unregister(self.hwnd);
        if let Some(controller) = self.controller.get_mut().take() {
            if let Err(e) = unsafe { controller.Close() } {
                log::warn!("closing controller failed: {}", e);
            }
        }
        unsafe {
            if IsWindow(self.hwnd).as_bool() {
                if let Err(e) = DestroyWindow(self.hwnd) {
                    log::warn!("DestroyWindow failed: {}", e);
                }
            }
        }
    }
}

fn register(native: &Rc<NativeWindow>) {
    WINDOWS.with(|map| {
        map.borrow_mut()
            .insert(native.hwnd.0 as isize, Rc::downgrade(native));
    });
}

fn unregister(hwnd: HWND) -> bool {
    WINDOWS
        .try_with(|map| map.borrow_mut().remove(&(hwnd.0 as isize)).is_some())
        .unwrap_or(false)
}

fn lookup(hwnd: HWND) -> Option<Rc<NativeWindow>> {
    WINDOWS
        .try_with(|map| map.borrow().get(&(hwnd.0 as isize)).and_then(Weak::upgrade))
        .ok()
        .flatten()
}

/// Release dispatch items still queued for a window that is going away.
unsafe fn reclaim_dispatch_items(hwnd: HWND) {
    let mut msg = MSG::default();
    let mut dropped = 0;
    while PeekMessageW(&mut msg, hwnd, WM_DISPATCH, WM_DISPATCH, PM_REMOVE).as_bool() {
        drop(DispatchItem::from_raw(msg.lParam.0));
        dropped += 1;
    }
    if dropped > 0 {
        log::debug!("released {} undelivered dispatch items", dropped);
    }
}

unsafe extern "system" fn wnd_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    match msg {
        WM_SIZE => {
            if let Some(native) = lookup(hwnd) {
                native.fit_controller();
            }
            DefWindowProcW(hwnd, msg, wparam, lparam)
        }
        WM_DESTROY => {
            // Still registered means the user closed the window.
            if unregister(hwnd) {
                log::debug!("window closed by user");
                PostQuitMessage(0);
            }
            LRESULT(0)
        }
        WM_NCDESTROY => {
            reclaim_dispatch_items(hwnd);
            DefWindowProcW(hwnd, msg, wparam, lparam)
        }
        WM_DISPATCH => {
            let item = DispatchItem::from_raw(lparam.0);
            match lookup(hwnd).and_then(|native| native.state.upgrade()) {
                Some(state) => state.deliver(item),
                None => log::warn!("dropping dispatch item for a released window"),
            }
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

// ── Blocking waits ─────────────────────────────────────────────

/// Auto-reset event waited on with COM's modal loop, which keeps window
/// messages and COM calls flowing on this thread.
struct EventWaiter {
    event: HANDLE,
}

impl EventWaiter {
    fn new() -> Result<Rc<Self>> {
        let event = unsafe { CreateEventW(None, false, false, PCWSTR::null()) }
            .map_err(|e| Error::context("CreateEvent", e))?;
        Ok(Rc::new(Self { event }))
    }
}

impl Waiter for EventWaiter {
    fn signal(&self) {
        if let Err(e) = unsafe { SetEvent(self.event) } {
            log::error!("SetEvent failed: {}", e);
        }
    }

    fn wait(&self) -> Result<()> {
        let flags = (COWAIT_DISPATCH_WINDOW_MESSAGES.0
            | COWAIT_DISPATCH_CALLS.0
            | COWAIT_INPUTAVAILABLE.0) as u32;
        unsafe { CoWaitForMultipleHandles(flags, INFINITE, &[self.event]) }
            .map(|_| ())
            .map_err(|e| Error::context("CoWaitForMultipleHandles", e))
    }
}

impl Drop for EventWaiter {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.event);
        }
    }
}

// ── Cross-thread posting ───────────────────────────────────────

struct WindowPost {
    hwnd: isize,
}

impl Post for WindowPost {
    fn post(&self, item: Box<DispatchItem>) -> Result<()> {
        let raw = item.into_raw();
        let posted = unsafe {
            PostMessageW(
                HWND(self.hwnd as *mut c_void),
                WM_DISPATCH,
                WPARAM(0),
                LPARAM(raw),
            )
        };
        if let Err(e) = posted {
            // Never queued, so ownership is still ours.
            drop(unsafe { DispatchItem::from_raw(raw) });
            return Err(Error::context("PostMessage", e));
        }
        Ok(())
    }
}

// ── Construction ───────────────────────────────────────────────

pub(super) fn create(
    options: &WindowOptions,
    state: Rc<WindowState>,
) -> Result<(Box<dyn Control>, Dispatcher)> {
    initialize()?;

    let version =
        runtime::runtime_version().map_err(|e| Error::context("WebView2 runtime check", e))?;

    let hwnd = create_native_window(options)?;
    let native = Rc::new(NativeWindow {
        hwnd,
        state: Rc::downgrade(&state),
        controller: RefCell::new(None),
    });
    register(&native);

    let waiter: Rc<dyn Waiter> = EventWaiter::new()?;
    let environment = create_environment(&waiter, options)?;
    let controller = create_controller(&waiter, &environment, hwnd)?;
    *native.controller.borrow_mut() = Some(controller.clone());

    let webview = configure(&controller, &environment, &state, options.devtools)?;

    native.fit_controller();
    unsafe {
        controller
            .SetIsVisible(true)
            .map_err(|e| Error::context("SetIsVisible", e))?;
        let _ = ShowWindow(hwnd, SW_SHOW);
        let _ = UpdateWindow(hwnd);
    }

    log::info!("WebView2 {} realized", version);

    let dispatcher = Dispatcher::new(Arc::new(WindowPost {
        hwnd: hwnd.0 as isize,
    }));
    Ok((Box::new(Win32Control { native, webview }), dispatcher))
}

fn create_native_window(options: &WindowOptions) -> Result<HWND> {
    ensure_class_registered()?;

    let mut style = WS_OVERLAPPEDWINDOW;
    if !options.resizable {
        style &= !WS_THICKFRAME & !WS_MAXIMIZEBOX;
    }

    let title_wide = wide(&options.title);

    unsafe {
        CreateWindowExW(
            WINDOW_EX_STYLE::default(),
            WINDOW_CLASS,
            PCWSTR(title_wide.as_ptr()),
            style,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            options.width,
            options.height,
            None,
            None,
            GetModuleHandleW(None).unwrap_or_default(),
            None,
        )
        .map_err(|e| Error::context("CreateWindow", e))
    }
}

fn create_environment(
    waiter: &Rc<dyn Waiter>,
    options: &WindowOptions,
) -> Result<ICoreWebView2Environment> {
    let data_directory = options
        .data_directory
        .as_ref()
        .map(|path| wide(&path.to_string_lossy()));

    bridge::wait_for(Rc::clone(waiter), |completer| unsafe {
        let handler = CreateCoreWebView2EnvironmentCompletedHandler::create(Box::new(
            move |error_code, environment| {
                completer.complete(
                    error_code
                        .map_err(|e| Error::context("CreateCoreWebView2Environment", e))
                        .and_then(|()| {
                            environment.ok_or_else(|| {
                                Error::internal("CreateCoreWebView2Environment returned nothing")
                            })
                        }),
                );
                Ok(())
            },
        ));
        let folder = data_directory
            .as_ref()
            .map_or(PCWSTR::null(), |dir| PCWSTR(dir.as_ptr()));
        CreateCoreWebView2EnvironmentWithOptions(PCWSTR::null(), folder, None, &handler)
            .map_err(|e| Error::context("CreateCoreWebView2Environment", e))
    })
}

fn create_controller(
    waiter: &Rc<dyn Waiter>,
    environment: &ICoreWebView2Environment,
    hwnd: HWND,
) -> Result<ICoreWebView2Controller> {
    bridge::wait_for(Rc::clone(waiter), |completer| unsafe {
        let handler = CreateCoreWebView2ControllerCompletedHandler::create(Box::new(
            move |error_code, controller| {
                completer.complete(
                    error_code
                        .map_err(|e| Error::context("CreateCoreWebView2Controller", e))
                        .and_then(|()| {
                            controller.ok_or_else(|| {
                                Error::internal("CreateCoreWebView2Controller returned nothing")
                            })
                        }),
                );
                Ok(())
            },
        ));
        environment
            .CreateCoreWebView2Controller(hwnd, &handler)
            .map_err(|e| Error::context("CreateCoreWebView2Controller", e))
    })
}

/// Apply settings, install the notify shim and wire the control's events
/// into the window state.
fn configure(
    controller: &ICoreWebView2Controller,
    environment: &ICoreWebView2Environment,
    state: &Rc<WindowState>,
    devtools: bool,
) -> Result<ICoreWebView2> {
    unsafe {
        let webview = controller
            .CoreWebView2()
            .map_err(|e| Error::context("CoreWebView2", e))?;

        let settings = webview.Settings()?;
        settings.SetIsScriptEnabled(true)?;
        settings.SetIsWebMessageEnabled(true)?;
        settings.SetAreDevToolsEnabled(devtools)?;

        let shim = wide(script::NOTIFY_SHIM);
        webview
            .AddScriptToExecuteOnDocumentCreated(PCWSTR(shim.as_ptr()), None)
            .map_err(|e| Error::context("AddScriptToExecuteOnDocumentCreated", e))?;

        // window.external.notify(text)
        let notify = Rc::downgrade(state);
        let mut token = std::mem::zeroed();
        webview.add_WebMessageReceived(
            &WebMessageReceivedEventHandler::create(Box::new(move |_webview, args| {
                if let (Some(args), Some(state)) = (args, notify.upgrade()) {
                    let mut message = PWSTR::null();
                    args.TryGetWebMessageAsString(&mut message)?;
                    state.push_event(Event::ScriptNotify(take_pwstr(message)));
                }
                Ok(())
            })),
            &mut token,
        )?;

        let loaded = Rc::downgrade(state);
        let webview_2: ICoreWebView2_2 = webview.cast()?;
        let mut token = std::mem::zeroed();
        webview_2.add_DOMContentLoaded(
            &DOMContentLoadedEventHandler::create(Box::new(move |_webview, _args| {
                if let Some(state) = loaded.upgrade() {
                    state.push_event(Event::ContentLoaded);
                }
                Ok(())
            })),
            &mut token,
        )?;

        let filter = wide(resolver::LOCAL_STREAM_FILTER);
        webview
            .AddWebResourceRequestedFilter(
                PCWSTR(filter.as_ptr()),
                COREWEBVIEW2_WEB_RESOURCE_CONTEXT_ALL,
            )
            .map_err(|e| Error::context("AddWebResourceRequestedFilter", e))?;

        let resources = Rc::downgrade(state);
        let environment = environment.clone();
        let mut token = std::mem::zeroed();
        webview.add_WebResourceRequested(
            &WebResourceRequestedEventHandler::create(Box::new(move |_webview, args| {
                let (Some(args), Some(state)) = (args, resources.upgrade()) else {
                    return Ok(());
                };
                let mut uri = PWSTR::null();
                args.Request()?.Uri(&mut uri)?;
                let uri = take_pwstr(uri);

                let response = match state.resolve(&uri) {
                    Ok(resource) => {
                        let stream = SHCreateMemStream(Some(resource.body.as_slice()));
                        let headers = wide(&resource.headers());
                        environment.CreateWebResourceResponse(
                            stream.as_ref(),
                            200,
                            w!("OK"),
                            PCWSTR(headers.as_ptr()),
                        )?
                    }
                    Err(e) => {
                        log::debug!("answering {} with 404: {}", uri, e);
                        environment.CreateWebResourceResponse(None, 404, w!("Not Found"), w!(""))?
                    }
                };
                args.SetResponse(&response)?;
                Ok(())
            })),
            &mut token,
        )?;

        Ok(webview)
    }
}

// ── Realized control ───────────────────────────────────────────

struct Win32Control {
    native: Rc<NativeWindow>,
    webview: ICoreWebView2,
}

impl Control for Win32Control {
    fn pump(&self, wait: bool) -> Result<Pumped> {
        unsafe {
            let mut msg = MSG::default();
            if wait {
                match GetMessageW(&mut msg, None, 0, 0).0 {
                    -1 => {
                        return Err(Error::context(
                            "GetMessage",
                            windows::core::Error::from_win32(),
                        ))
                    }
                    0 => return Ok(Pumped::Quit),
                    _ => {}
                }
            } else {
                if !PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                    return Ok(Pumped::Idle);
                }
                if msg.message == WM_QUIT {
                    return Ok(Pumped::Quit);
                }
            }
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
        Ok(Pumped::Message)
    }

    fn navigate(&self, url: &str) -> Result<()> {
        let url_wide = wide(url);
        unsafe { self.webview.Navigate(PCWSTR(url_wide.as_ptr())) }
            .map_err(|e| Error::context("Navigate", e))
    }

    fn navigate_to_string(&self, html: &str) -> Result<()> {
        let html_wide = wide(html);
        unsafe { self.webview.NavigateToString(PCWSTR(html_wide.as_ptr())) }
            .map_err(|e| Error::context("NavigateToString", e))
    }

    fn evaluate_script(&self, script: &str) -> Result<String> {
        let script_wide = wide(script);
        let waiter = EventWaiter::new()?;
        bridge::wait_for(waiter, |completer| unsafe {
            let handler = ExecuteScriptCompletedHandler::create(Box::new(
                move |error_code, result| {
                    completer.complete(
                        error_code
                            .map(|()| result)
                            .map_err(|e| Error::context("ExecuteScript", e)),
                    );
                    Ok(())
                },
            ));
            self.webview
                .ExecuteScript(PCWSTR(script_wide.as_ptr()), &handler)
                .map_err(|e| Error::context("ExecuteScript", e))
        })
    }
}

impl Drop for Win32Control {
    fn drop(&mut self) {
        log::debug!("tearing down window {:?}", self.native.hwnd);
    }
}
