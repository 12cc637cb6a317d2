/// Exposes `window.external.notify(text)` on top of the WebView2 message
/// channel. Runs at document creation, before any page script.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub const NOTIFY_SHIM: &str = "(function(){var w=window.chrome&&window.chrome.webview;if(!w)return;var post=w.postMessage.bind(w);try{Object.defineProperty(window.external,'notify',{value:function(m){post(String(m))},writable:false,configurable:false})}catch(e){}})();";

/// Escape a string for safe embedding as a JSON string value.
/// The returned string includes surrounding double quotes.
pub fn json_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // Would end an inline <script> block or break JS string literals.
            '<' => out.push_str("\\u003c"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Script that appends `css` to the document in a new `<style>` element.
pub fn inject_style(css: &str) -> String {
    format!(
        "(function(){{var s=document.createElement('style');s.textContent={};(document.head||document.documentElement).appendChild(s);}})();",
        json_escape(css)
    )
}
