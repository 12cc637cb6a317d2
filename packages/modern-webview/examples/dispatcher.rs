use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use modern_webview::{Content, Event, Host, Token, Window, WindowOptions};

/// Runs dispatched callbacks by sending their token back to the main loop.
struct ForwardingHost {
    ready: mpsc::Sender<usize>,
}

impl Host for ForwardingHost {
    fn on_dispatch(&self, _owner: Token, callback: Token) {
        let _ = self.ready.send(callback.value());
    }
}

fn main() -> modern_webview::Result<()> {
    env_logger::init();

    let (tx, rx) = mpsc::channel();
    let options = WindowOptions::new("WebView Dispatcher Demo", (1280, 800), true);
    let window = Window::new(
        &options,
        &Content::Html("<h1>Hello World!</h1>".into()),
        ForwardingHost { ready: tx },
    )?;
    let dispatcher = window.dispatcher();

    let worker = thread::spawn(move || {
        for tick in 1..=3 {
            thread::sleep(Duration::from_secs(2));
            if let Err(e) = dispatcher.dispatch(Token::NONE, Token::new(tick)) {
                eprintln!("dispatch failed: {}", e);
            }
        }
    });

    'running: loop {
        for event in window.poll_iter() {
            match event? {
                Event::Quit => break 'running,
                Event::ScriptNotify(text) => println!("Data from script notify: {}", text),
                _ => {}
            }
        }
        // Callbacks the host received while pumping.
        for tick in rx.try_iter() {
            window.evaluate_script(&format!("window.external.notify('tick {}')", tick))?;
        }
        thread::sleep(Duration::from_millis(16));
    }

    if worker.join().is_err() {
        eprintln!("worker panicked");
    }
    Ok(())
}
