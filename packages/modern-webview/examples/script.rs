use modern_webview::{webview, Content, Event};

const CSS: &str = ".script-message { color: #36ab00; }";

const HTML: &str = "<!DOCTYPE html>
<head>
    <title>WebView Script Demo</title>
</head>
<body>
    <h1>WebView Script Demo</h1>
</body>";

fn main() -> modern_webview::Result<()> {
    env_logger::init();

    webview("WebView Script Demo", Content::Html(HTML.into()), (1280, 800), true, |window, event| {
        match event {
            Event::ContentLoaded => {
                window.inject_style(CSS)?;

                let value = window.evaluate_script(
                    "document.body.innerHTML += '<span class=\"script-message\">Host called evaluate_script.</span>'; 'ping'",
                )?;
                println!("Returned from evaluate_script: {}", value);

                window.evaluate_script("window.external.notify('pong')")?;
            }
            Event::ScriptNotify(text) => println!("Sent via script notify: {}", text),
            _ => {}
        }
        Ok(())
    })
}
