//! Serves a directory compiled into the binary with [`include_dir!`].
//!
//! ```no_run
//! use include_dir::{include_dir, Dir};
//! use modern_webview::{webview_dir, Event};
//!
//! static PAGES: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/examples/html");
//!
//! # fn main() -> modern_webview::Result<()> {
//! webview_dir("Pages", &PAGES, "index.html", (1280, 800), true, |_, event| {
//!     println!("{:?}", event);
//!     Ok(())
//! })
//! # }
//! ```
//!
//! [`include_dir!`]: include_dir::include_dir

use include_dir::Dir;

use crate::host::{Host, Token};

/// Content provider backed by an embedded directory. Paths are looked up
/// relative to the directory root.
#[derive(Debug, Clone, Copy)]
pub struct DirHost {
    dir: &'static Dir<'static>,
}

impl DirHost {
    pub fn new(dir: &'static Dir<'static>) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &'static Dir<'static> {
        self.dir
    }
}

impl Host for DirHost {
    fn get_content(&self, _owner: Token, path: &str) -> Option<Vec<u8>> {
        self.dir.get_file(path).map(|file| file.contents().to_vec())
    }
}
