use std::path::PathBuf;

use crate::error::{Error, Result};

/// Options for creating a new window.
#[derive(Debug, Clone)]
pub struct WindowOptions {
    /// Window title. Default: ""
    pub title: String,
    /// Outer width in pixels. Default: 800
    pub width: i32,
    /// Outer height in pixels. Default: 600
    pub height: i32,
    /// Allow resizing. Default: true
    pub resizable: bool,
    /// Enable the rendering engine's devtools. Default: false
    pub devtools: bool,
    /// Folder where the rendering engine keeps its profile. When unset the
    /// engine picks a folder next to the executable.
    pub data_directory: Option<PathBuf>,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            width: 800,
            height: 600,
            resizable: true,
            devtools: false,
            data_directory: None,
        }
    }
}

impl WindowOptions {
    pub fn new(title: impl Into<String>, size: (i32, i32), resizable: bool) -> Self {
        Self {
            title: title.into(),
            width: size.0,
            height: size.1,
            resizable,
            ..Default::default()
        }
    }

    pub fn with_devtools(mut self, devtools: bool) -> Self {
        self.devtools = devtools;
        self
    }

    pub fn with_data_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_directory = Some(path.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(Error::invalid_argument(format!(
                "window size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Wire values for the kind of content handed to a navigation.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Url = 1,
    Html = 2,
}

impl TryFrom<u32> for ContentType {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(Self::Url),
            2 => Ok(Self::Html),
            other => Err(Error::invalid_argument(format!(
                "unknown content type {}",
                other
            ))),
        }
    }
}

/// What to show in the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Url(String),
    Html(String),
}

impl Content {
    pub fn new(content_type: ContentType, content: impl Into<String>) -> Self {
        match content_type {
            ContentType::Url => Self::Url(content.into()),
            ContentType::Html => Self::Html(content.into()),
        }
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            Self::Url(_) => ContentType::Url,
            Self::Html(_) => ContentType::Html,
        }
    }

    /// URLs must be absolute; HTML is handed to the engine as-is.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Url(url) => url::Url::parse(url.trim())
                .map(|_| ())
                .map_err(|e| Error::invalid_argument(format!("malformed url '{}': {}", url, e))),
            Self::Html(_) => Ok(()),
        }
    }
}
