use include_dir::{include_dir, Dir};
use modern_webview::{webview_dir, Event};

// Compiled into the binary and served over the local stream.
static HTML: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/examples/html");

fn main() -> modern_webview::Result<()> {
    env_logger::init();

    webview_dir("WebView include_dir Demo", &HTML, "index.html", (1280, 800), true, |window, event| {
        match event {
            Event::ContentLoaded => {
                let title = window.evaluate_script("document.title")?;
                println!("Loaded {}", title);
            }
            Event::ScriptNotify(text) => println!("Sent via script notify: {}", text),
            _ => {}
        }
        Ok(())
    })
}
