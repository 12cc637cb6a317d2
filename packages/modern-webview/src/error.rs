use std::cell::RefCell;

/// Errors produced by window, control and boundary operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A caller-supplied value was rejected before any native call was made.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A native call, an asynchronous operation or the platform itself failed.
    #[error("{0}")]
    Internal(String),
    /// A virtual-stream resource was not supplied by the content provider.
    #[error("resource not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Wrap a lower-level failure with the name of the call that produced it.
    pub fn context(what: &str, err: impl std::fmt::Display) -> Self {
        Self::Internal(format!("{} failed: {}", what, err))
    }

    pub fn code(&self) -> ResultCode {
        match self {
            Self::InvalidArgument(_) => ResultCode::InvalidArgument,
            // NotFound is answered to the rendering engine; if it ever reaches
            // the boundary it is an internal failure from the caller's view.
            Self::Internal(_) | Self::NotFound(_) => ResultCode::InternalError,
        }
    }
}

#[cfg(target_os = "windows")]
impl From<windows::core::Error> for Error {
    fn from(err: windows::core::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Status returned by every fallible boundary call.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Success = 0,
    InvalidArgument = 1,
    InternalError = 2,
}

impl<T> From<&Result<T>> for ResultCode {
    fn from(result: &Result<T>) -> Self {
        match result {
            Ok(_) => ResultCode::Success,
            Err(err) => err.code(),
        }
    }
}

// ── Last error (per calling thread) ────────────────────────────

thread_local! {
    static LAST_ERROR: RefCell<Option<Error>> = const { RefCell::new(None) };
}

/// Forget whatever failure the calling thread recorded last.
pub fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

/// Record a failure for the calling thread, replacing any earlier one.
pub fn set_last_error(err: Error) {
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(err));
}

/// Take the calling thread's last failure. A failure is returned once.
pub fn take_last_error() -> Option<Error> {
    LAST_ERROR.with(|e| e.borrow_mut().take())
}

/// Run a boundary operation: clear the thread's error slot, run `f`, and
/// record the failure (if any) before converting it to a [`ResultCode`].
pub fn capture<T>(f: impl FnOnce() -> Result<T>) -> (ResultCode, Option<T>) {
    clear_last_error();
    match f() {
        Ok(value) => (ResultCode::Success, Some(value)),
        Err(err) => {
            let code = err.code();
            set_last_error(err);
            (code, None)
        }
    }
}
