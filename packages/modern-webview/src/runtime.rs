//! WebView2 runtime detection.

use crate::error::{Error, Result};

#[cfg(target_os = "windows")]
use webview2_com::Microsoft::Web::WebView2::Win32::GetAvailableCoreWebView2BrowserVersionString;
#[cfg(target_os = "windows")]
use windows::{core::PWSTR, Win32::System::Com::CoTaskMemFree};

#[cfg(target_os = "windows")]
const PLATFORM: &str = "windows";
#[cfg(not(target_os = "windows"))]
const PLATFORM: &str = "unsupported";

/// Information about the installed rendering runtime.
#[cfg_attr(feature = "node", napi_derive::napi(object))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInfo {
    /// Whether a usable WebView2 runtime was found.
    pub available: bool,
    /// The runtime's version string, if available.
    pub version: Option<String>,
    /// "windows" or "unsupported".
    pub platform: String,
}

/// Check whether the WebView2 runtime can be used on this machine.
///
/// - **Windows**: asks `GetAvailableCoreWebView2BrowserVersionString`.
/// - **Other**: always unavailable with platform "unsupported".
pub fn check_runtime() -> RuntimeInfo {
    match runtime_version() {
        Ok(version) => {
            log::debug!("found WebView2 runtime {}", version);
            RuntimeInfo {
                available: true,
                version: Some(version),
                platform: PLATFORM.to_string(),
            }
        }
        Err(err) => {
            log::warn!("WebView2 runtime unavailable: {}", err);
            RuntimeInfo {
                available: false,
                version: None,
                platform: PLATFORM.to_string(),
            }
        }
    }
}

/// Version of the usable runtime, or the reason no runtime can be used.
pub(crate) fn runtime_version() -> Result<String> {
    #[cfg(target_os = "windows")]
    {
        usable_version(installed_version()?)
    }

    #[cfg(not(target_os = "windows"))]
    {
        Err(Error::internal(
            "unsupported platform: WebView2 is only available on Windows",
        ))
    }
}

#[cfg(target_os = "windows")]
fn installed_version() -> Result<Option<String>> {
    let mut version = PWSTR::null();
    unsafe { GetAvailableCoreWebView2BrowserVersionString(None, &mut version) }
        .map_err(|e| Error::context("GetAvailableCoreWebView2BrowserVersionString", e))?;
    if version.is_null() {
        return Ok(None);
    }

    let text = unsafe { version.to_string() };
    unsafe { CoTaskMemFree(Some(version.0 as *const _)) };
    text.map(Some)
        .map_err(|e| Error::context("decoding WebView2 version", e))
}

/// The loader reports an empty string or "0.0.0.0" when no runtime is
/// installed.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn usable_version(reported: Option<String>) -> Result<String> {
    match reported {
        Some(version) if !version.is_empty() && version != "0.0.0.0" => Ok(version),
        Some(version) => Err(Error::internal(format!(
            "WebView2 runtime is not installed (loader reported '{}')",
            version
        ))),
        None => Err(Error::internal("WebView2 runtime is not installed")),
    }
}
