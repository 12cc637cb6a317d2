//! Turns completion-handler based operations into blocking calls.
//!
//! The awaiting call and the operation's completion handler share a small
//! state machine (`Pending -> Completed | Failed`). While the state is
//! pending the caller sits in [`Waiter::wait`], which must keep servicing the
//! calling thread's own message queue: the operation usually needs further
//! message dispatch on this very thread before it can complete.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, Result};

/// Blocking primitive used while an operation is pending.
pub trait Waiter {
    /// Wake the thread blocked in [`wait`](Waiter::wait). Called from the
    /// completion handler.
    fn signal(&self);

    /// Block until signalled, dispatching the thread's queued work meanwhile.
    /// Spurious returns are allowed; the caller re-checks its state.
    fn wait(&self) -> Result<()>;
}

enum State<T> {
    Pending,
    Completed(T),
    Failed(Error),
}

/// Handed to an operation's completion handler. Consumed by
/// [`complete`](Completer::complete); dropping it unused fails the await
/// instead of leaving it blocked forever.
pub struct Completer<T> {
    state: Rc<RefCell<State<T>>>,
    waiter: Rc<dyn Waiter>,
    finished: bool,
}

impl<T> Completer<T> {
    pub fn complete(mut self, result: Result<T>) {
        self.finish(match result {
            Ok(value) => State::Completed(value),
            Err(err) => State::Failed(err),
        });
    }

    fn finish(&mut self, state: State<T>) {
        if self.finished {
            return;
        }
        self.finished = true;
        *self.state.borrow_mut() = state;
        self.waiter.signal();
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        self.finish(State::Failed(Error::internal(
            "asynchronous operation was abandoned before completing",
        )));
    }
}

/// Start an operation and block until its completer is resolved.
///
/// `start` launches the operation and moves the [`Completer`] into its
/// completion handler. An error from `start` itself is returned as-is.
pub fn wait_for<T>(
    waiter: Rc<dyn Waiter>,
    start: impl FnOnce(Completer<T>) -> Result<()>,
) -> Result<T> {
    let state = Rc::new(RefCell::new(State::Pending));
    start(Completer {
        state: Rc::clone(&state),
        waiter: Rc::clone(&waiter),
        finished: false,
    })?;

    loop {
        // Never hold the borrow across `wait`: the handler needs it.
        let current = state.replace(State::Pending);
        match current {
            State::Pending => waiter.wait()?,
            State::Completed(value) => return Ok(value),
            State::Failed(err) => return Err(err),
        }
    }
}
