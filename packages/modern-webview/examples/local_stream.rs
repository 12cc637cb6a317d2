use modern_webview::{Event, Host, Token, Window, WindowOptions};

const INDEX: &str = "<!DOCTYPE html>
<head>
    <link rel=\"stylesheet\" href=\"style.css\">
</head>
<body>
    <h1 class=\"script-message\">Served from the host</h1>
</body>";

const STYLE: &str = ".script-message { color: #36ab00; }";

/// Serves two files from memory.
struct StaticFiles;

impl Host for StaticFiles {
    fn get_content(&self, _owner: Token, path: &str) -> Option<Vec<u8>> {
        match path {
            "index.html" => Some(INDEX.as_bytes().to_vec()),
            "style.css" => Some(STYLE.as_bytes().to_vec()),
            _ => None,
        }
    }
}

fn main() -> modern_webview::Result<()> {
    env_logger::init();

    let options = WindowOptions::new("WebView Local Stream Demo", (1280, 800), true);
    let window = Window::with_local_stream(&options, "index.html", StaticFiles)?;

    loop {
        match window.poll(true)? {
            Event::ContentLoaded => {
                let title = window.evaluate_script("document.querySelector('h1').textContent")?;
                println!("Loaded: {}", title);
            }
            Event::Quit => return Ok(()),
            _ => {}
        }
    }
}
