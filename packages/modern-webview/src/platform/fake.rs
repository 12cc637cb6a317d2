//! In-process stand-in for the native backend.
//!
//! Messages are posted to a shared queue and handled one per pump step, the
//! way the native message loop would deliver them.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::{Arc, Mutex};

use super::{Control, Pumped};
use crate::bridge::{self, Completer, Waiter};
use crate::dispatch::{DispatchItem, Dispatcher, Post};
use crate::error::{Error, Result};
use crate::events::Event;
use crate::host::Host;
use crate::resolver::{self, Resource};
use crate::window::{Window, WindowState};

pub(crate) enum Message {
    ContentLoaded,
    ScriptNotify(String),
    /// Several notifications raised while handling a single message.
    Burst(Vec<String>),
    Dispatch(Box<DispatchItem>),
    /// The control requested a local-stream URI.
    Request(String),
    /// The control finished the oldest pending script.
    ScriptDone,
    /// A message that raises no event.
    Other,
    Quit,
}

#[derive(Clone, Default)]
struct Queue(Arc<Mutex<VecDeque<Message>>>);

impl Queue {
    fn push(&self, message: Message) {
        self.0.lock().unwrap().push_back(message);
    }

    fn pop(&self) -> Option<Message> {
        self.0.lock().unwrap().pop_front()
    }

    fn is_empty(&self) -> bool {
        self.0.lock().unwrap().is_empty()
    }
}

impl Post for Queue {
    fn post(&self, item: Box<DispatchItem>) -> Result<()> {
        self.push(Message::Dispatch(item));
        Ok(())
    }
}

pub(crate) struct FakeControl {
    state: Rc<WindowState>,
    queue: Queue,
    pumps: Cell<usize>,
    navigations: RefCell<Vec<String>>,
    scripts: RefCell<Vec<String>>,
    responses: RefCell<Vec<Result<Resource>>>,
    running: RefCell<VecDeque<(String, Completer<String>)>>,
}

impl FakeControl {
    pub(crate) fn post(&self, message: Message) {
        self.queue.push(message);
    }

    pub(crate) fn pumps(&self) -> usize {
        self.pumps.get()
    }

    pub(crate) fn navigations(&self) -> Vec<String> {
        self.navigations.borrow().clone()
    }

    pub(crate) fn scripts(&self) -> Vec<String> {
        self.scripts.borrow().clone()
    }

    pub(crate) fn responses(&self) -> Vec<Result<Resource>> {
        self.responses.borrow().clone()
    }

    /// One step of a pumping wait. The quit message stays queued behind
    /// other work, the way `WM_QUIT` is only retrieved from an otherwise
    /// empty queue.
    fn wait_step(&self) -> Result<()> {
        self.pumps.set(self.pumps.get() + 1);
        match self.queue.pop() {
            None => Err(Error::internal("fake message queue is empty")),
            Some(Message::Quit) => {
                let stranded = self.queue.is_empty();
                self.queue.push(Message::Quit);
                if stranded {
                    Err(Error::internal("message loop ended while waiting"))
                } else {
                    Ok(())
                }
            }
            Some(message) => self.handle(message).map(drop),
        }
    }

    fn handle(&self, message: Message) -> Result<Pumped> {
        match message {
            Message::ContentLoaded => self.state.push_event(Event::ContentLoaded),
            Message::ScriptNotify(text) => self.state.push_event(Event::ScriptNotify(text)),
            Message::Burst(texts) => {
                for text in texts {
                    self.state.push_event(Event::ScriptNotify(text));
                }
            }
            Message::Dispatch(item) => self.state.deliver(item),
            Message::Request(uri) => {
                let response = self.state.resolve(&uri);
                let found = response.is_ok();
                self.responses.borrow_mut().push(response);
                if found {
                    self.state.push_event(Event::ContentLoaded);
                }
            }
            Message::ScriptDone => {
                let finished = self.running.borrow_mut().pop_front();
                if let Some((script, completer)) = finished {
                    completer.complete(script_result(&script));
                }
            }
            Message::Other => {}
            Message::Quit => return Ok(Pumped::Quit),
        }
        Ok(Pumped::Message)
    }
}

/// JSON the fake engine produces for `script`.
fn script_result(script: &str) -> Result<String> {
    let script = script.trim();
    if script == "document.readyState" {
        Ok("\"complete\"".to_string())
    } else if let Some(message) = script.strip_prefix("throw ") {
        Err(Error::context("ExecuteScript", message))
    } else {
        Ok("null".to_string())
    }
}

/// Waits by pumping the fake queue, like `CoWaitForMultipleHandles` does.
struct PumpWaiter(Weak<FakeControl>);

impl Waiter for PumpWaiter {
    // Completion is seen by re-checking the state after each step.
    fn signal(&self) {}

    fn wait(&self) -> Result<()> {
        self.0
            .upgrade()
            .ok_or_else(|| Error::internal("fake control was dropped"))?
            .wait_step()
    }
}

impl Control for Rc<FakeControl> {
    fn pump(&self, wait: bool) -> Result<Pumped> {
        self.pumps.set(self.pumps.get() + 1);
        let Some(message) = self.queue.pop() else {
            return if wait {
                Err(Error::internal("fake message queue is empty"))
            } else {
                Ok(Pumped::Idle)
            };
        };
        self.handle(message)
    }

    fn navigate(&self, url: &str) -> Result<()> {
        self.navigations.borrow_mut().push(url.to_string());
        if resolver::resource_path(url).is_some() {
            self.post(Message::Request(url.to_string()));
        } else {
            self.post(Message::ContentLoaded);
        }
        Ok(())
    }

    fn navigate_to_string(&self, html: &str) -> Result<()> {
        self.navigations.borrow_mut().push(format!("html:{}", html));
        self.post(Message::ContentLoaded);
        Ok(())
    }

    fn evaluate_script(&self, script: &str) -> Result<String> {
        self.scripts.borrow_mut().push(script.to_string());
        let waiter: Rc<dyn Waiter> = Rc::new(PumpWaiter(Rc::downgrade(self)));
        bridge::wait_for(waiter, |completer| {
            self.running
                .borrow_mut()
                .push_back((script.to_string(), completer));
            self.post(Message::ScriptDone);
            Ok(())
        })
    }
}

/// A window backed by a fresh fake control.
pub(crate) fn window(host: impl Host + 'static) -> (Window, Rc<FakeControl>) {
    let state = Rc::new(WindowState::new(Box::new(host)));
    let queue = Queue::default();
    let fake = Rc::new(FakeControl {
        state: Rc::clone(&state),
        queue: queue.clone(),
        pumps: Cell::new(0),
        navigations: RefCell::default(),
        scripts: RefCell::default(),
        responses: RefCell::default(),
        running: RefCell::default(),
    });
    let dispatcher = Dispatcher::new(Arc::new(queue));
    let window = Window::from_parts(Box::new(Rc::clone(&fake)), dispatcher, state);
    (window, fake)
}
