//! Cancellation tokens for in-flight chat turns.
//!
//! A token is single-threaded (WASM constraint) and shared via `Rc`.
//! The controller holds the only `CancellationToken` for a turn; transports
//! and guarded streams only ever see the read-only `CancelSignal`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::{AbortHandle, Abortable};
use futures::Stream;

thread_local! {
    static NEXT_TOKEN_ID: Cell<u64> = const { Cell::new(1) };
}

/// Why a token was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The user pressed stop
    UserCancelled,
    /// A newer `send` on the same session took over
    Superseded,
}

type Listener = Box<dyn FnOnce(CancelReason)>;

enum TokenState {
    Active(Vec<Listener>),
    Cancelled(CancelReason),
    Completed,
}

struct TokenInner {
    id: u64,
    state: RefCell<TokenState>,
}

impl TokenInner {
    fn reason(&self) -> Option<CancelReason> {
        match &*self.state.borrow() {
            TokenState::Cancelled(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Owner side of one in-flight turn's lifetime.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Rc<TokenInner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let id = NEXT_TOKEN_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        Self {
            inner: Rc::new(TokenInner {
                id,
                state: RefCell::new(TokenState::Active(Vec::new())),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Read-only view handed to transports and guarded streams
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            inner: self.inner.clone(),
        }
    }

    /// Cancel the token and run its listeners.
    ///
    /// Returns `false` when the token was already cancelled or completed.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        let listeners = {
            let mut state = self.inner.state.borrow_mut();
            match std::mem::replace(&mut *state, TokenState::Cancelled(reason)) {
                TokenState::Active(listeners) => listeners,
                previous => {
                    *state = previous;
                    return false;
                }
            }
        };
        // Listeners run outside the borrow; they may inspect the signal.
        for listener in listeners {
            listener(reason);
        }
        true
    }

    /// Mark the turn as finished. Later `cancel` calls are no-ops.
    pub fn complete(&self) -> bool {
        let mut state = self.inner.state.borrow_mut();
        if matches!(*state, TokenState::Active(_)) {
            *state = TokenState::Completed;
            true
        } else {
            false
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.reason().is_some()
    }

    pub fn is_active(&self) -> bool {
        matches!(*self.inner.state.borrow(), TokenState::Active(_))
    }

    pub fn reason(&self) -> Option<CancelReason> {
        self.inner.reason()
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("id", &self.inner.id)
            .field("reason", &self.inner.reason())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Observer side of a token.
#[derive(Clone)]
pub struct CancelSignal {
    inner: Rc<TokenInner>,
}

impl CancelSignal {
    pub fn token_id(&self) -> u64 {
        self.inner.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.reason().is_some()
    }

    pub fn reason(&self) -> Option<CancelReason> {
        self.inner.reason()
    }

    /// Run `listener` once when the token is cancelled.
    ///
    /// Runs immediately if the token is already cancelled; dropped unrun if
    /// the token completes first.
    pub fn on_cancel(&self, listener: impl FnOnce(CancelReason) + 'static) {
        let fire_now = {
            let mut state = self.inner.state.borrow_mut();
            match &mut *state {
                TokenState::Active(listeners) => {
                    listeners.push(Box::new(listener));
                    return;
                }
                TokenState::Cancelled(reason) => *reason,
                TokenState::Completed => return,
            }
        };
        listener(fire_now);
    }

    /// Wrap a future so it resolves to `Err(Aborted)` once the token is cancelled
    pub fn guard_future<F: Future>(&self, future: F) -> Abortable<F> {
        let (handle, registration) = AbortHandle::new_pair();
        self.on_cancel(move |_| handle.abort());
        Abortable::new(future, registration)
    }

    /// Wrap a stream so it ends as soon as the token is cancelled
    pub fn guard_stream<S: Stream>(&self, stream: S) -> Abortable<S> {
        let (handle, registration) = AbortHandle::new_pair();
        self.on_cancel(move |_| handle.abort());
        Abortable::new(stream, registration)
    }
}

impl fmt::Debug for CancelSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelSignal")
            .field("token_id", &self.inner.id)
            .field("reason", &self.inner.reason())
            .finish()
    }
}
