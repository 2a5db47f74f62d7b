//! # Reserva Runtime
//!
//! Runtime implementation for the Reserva architecture.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Effect Executor**: Executes effect descriptions and feeds actions back
//!   to reducers
//! - **Event Loop**: Manages the action → reducer → effects → action feedback
//!   loop
//!
//! ## Example
//!
//! ```ignore
//! use reserva_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Send an action
//! store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field.clone()).await;
//! ```

use reserva_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a matching action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        ///
        /// Typically means the store is shutting down.
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Decrements the pending-effect counter when dropped, even if the effect
/// task panicked or was cancelled.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The Store - runtime for reducers and effects
///
/// The Store owns state, runs the reducer on each action while holding a
/// write lock (serializing all state transitions), and executes the returned
/// effects asynchronously in spawned tasks. Actions produced by effects are
/// fed back into the reducer and broadcast to observers.
///
/// # Type Parameters
///
/// - `S`: State type
/// - `A`: Action type
/// - `E`: Environment type
/// - `R`: Reducer implementation
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: Arc<RwLock<S>>,
    reducer: R,
    environment: E,
    shutdown: Arc<AtomicBool>,
    pending_effects: Arc<AtomicUsize>,
    /// Action broadcast channel for observing actions produced by effects.
    ///
    /// This enables request-response patterns: callers subscribe, send a
    /// command, then wait for the terminal event action.
    action_broadcast: broadcast::Sender<A>,
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a new store with initial state, reducer, and environment
    ///
    /// The action broadcast capacity defaults to 16; use
    /// [`Store::with_broadcast_capacity`] if observers lag.
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self::with_broadcast_capacity(initial_state, reducer, environment, 16)
    }

    /// Create a new Store with custom action broadcast capacity
    #[must_use]
    pub fn with_broadcast_capacity(
        initial_state: S,
        reducer: R,
        environment: E,
        capacity: usize,
    ) -> Self {
        let (action_broadcast, _) = broadcast::channel(capacity);

        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer,
            environment,
            shutdown: Arc::new(AtomicBool::new(false)),
            pending_effects: Arc::new(AtomicUsize::new(0)),
            action_broadcast,
        }
    }

    /// Send an action to the store
    ///
    /// 1. Acquires the write lock on state
    /// 2. Calls the reducer with `(state, action, environment)`
    /// 3. Executes returned effects asynchronously
    /// 4. Effects may produce more actions (feedback loop)
    ///
    /// `send()` returns after *starting* effect execution, not completion.
    /// Use [`Store::wait_for_idle`] or [`Store::send_and_wait_for`] when a
    /// caller needs the downstream result.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting
    /// down.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: A) -> Result<(), StoreError> {
        if self.shutdown.load(Ordering::Acquire) {
            tracing::warn!("rejected action: store is shutting down");
            return Err(StoreError::ShutdownInProgress);
        }

        let effects = {
            let mut state = self.state.write().await;
            self.reducer.reduce(&mut state, action, &self.environment)
        };

        tracing::trace!(count = effects.len(), "executing effects");
        for effect in effects {
            self.execute_effect(effect);
        }

        Ok(())
    }

    /// Send an action and wait for a matching result action
    ///
    /// Designed for request-response flows: subscribe to the action broadcast
    /// *before* sending (avoiding a completion race), send the initial
    /// action, then wait for the first effect-produced action matching the
    /// predicate.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Timeout`]: no matching action within `timeout`
    /// - [`StoreError::ChannelClosed`]: broadcast channel closed
    /// - [`StoreError::ShutdownInProgress`]: store is shutting down
    pub async fn send_and_wait_for<F>(
        &self,
        action: A,
        predicate: F,
        timeout: Duration,
    ) -> Result<A, StoreError>
    where
        F: Fn(&A) -> bool,
    {
        let mut rx = self.action_broadcast.subscribe();
        self.send(action).await?;

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let recv = tokio::time::timeout_at(deadline, rx.recv()).await;
            match recv {
                Err(_) => return Err(StoreError::Timeout),
                Ok(Err(broadcast::error::RecvError::Closed)) => {
                    return Err(StoreError::ChannelClosed);
                },
                Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    tracing::warn!(skipped, "action observer lagged");
                },
                Ok(Ok(candidate)) => {
                    if predicate(&candidate) {
                        return Ok(candidate);
                    }
                },
            }
        }
    }

    /// Read current state via a closure
    ///
    /// Access state through a closure to ensure the lock is released
    /// promptly:
    ///
    /// ```ignore
    /// let step = store.state(|s| s.step).await;
    /// ```
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Subscribe to actions produced by effects
    ///
    /// Useful for observers that want to react to the feedback loop (logging,
    /// UI refresh) without polling state.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<A> {
        self.action_broadcast.subscribe()
    }

    /// Number of effects currently running (including the whole cascade of
    /// feedback actions)
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.pending_effects.load(Ordering::Acquire)
    }

    /// Wait until no effects are running
    ///
    /// Feedback actions register their own effects before the parent effect
    /// is counted as finished, so the counter only reaches zero once the
    /// whole cascade has settled.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if effects are still running when the
    /// timeout expires.
    pub async fn wait_for_idle(&self, timeout: Duration) -> Result<(), StoreError> {
        let start = tokio::time::Instant::now();
        let poll_interval = Duration::from_millis(10);

        loop {
            if self.pending_effects.load(Ordering::Acquire) == 0 {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(StoreError::Timeout);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Initiate graceful shutdown of the store
    ///
    /// Sets the shutdown flag (rejecting new actions), then waits for
    /// pending effects to complete.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before
    /// all pending effects complete.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("initiating graceful shutdown");
        self.shutdown.store(true, Ordering::Release);

        let start = tokio::time::Instant::now();
        let poll_interval = Duration::from_millis(50);

        loop {
            let pending = self.pending_effects.load(Ordering::Acquire);
            if pending == 0 {
                tracing::info!("all effects completed, shutdown successful");
                return Ok(());
            }
            if start.elapsed() >= timeout {
                tracing::error!(pending, "shutdown timeout");
                return Err(StoreError::ShutdownTimeout(pending));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Execute a single effect
    ///
    /// `None` is a no-op and `Parallel` fans out immediately; everything else
    /// is spawned onto the runtime with a [`PendingGuard`] so the pending
    /// counter stays accurate even when a task panics.
    fn execute_effect(&self, effect: Effect<A>) {
        match effect {
            Effect::None => {},
            Effect::Parallel(effects) => {
                for effect in effects {
                    self.execute_effect(effect);
                }
            },
            other => {
                self.pending_effects.fetch_add(1, Ordering::SeqCst);
                let guard = PendingGuard(Arc::clone(&self.pending_effects));
                let store = self.clone();

                tokio::spawn(async move {
                    // Dropped at end of scope: feedback sends inside
                    // run_effect register their own effects first, so the
                    // counter never dips to zero mid-cascade.
                    let _guard = guard;
                    store.run_effect(other).await;
                });
            },
        }
    }

    /// Drive an effect to completion inside a task
    ///
    /// `Sequential` awaits each child in order; `Parallel` nested inside a
    /// sequential chain joins its branches before the chain continues.
    async fn run_effect(&self, effect: Effect<A>) {
        match effect {
            Effect::None => {},
            Effect::Future(fut) => {
                if let Some(action) = fut.await {
                    tracing::trace!("effect produced an action, feeding back");
                    // Reduce first, then notify: observers waiting on this
                    // action must see the state it produced.
                    let _ = self.send(action.clone()).await;
                    let _ = self.action_broadcast.send(action);
                }
            },
            Effect::Delay { duration, action } => {
                tokio::time::sleep(duration).await;
                let _ = self.send((*action).clone()).await;
                let _ = self.action_broadcast.send(*action);
            },
            Effect::Sequential(effects) => {
                for effect in effects {
                    Box::pin(self.run_effect(effect)).await;
                }
            },
            Effect::Parallel(effects) => {
                let branches = effects
                    .into_iter()
                    .map(|effect| Box::pin(self.run_effect(effect)));
                futures::future::join_all(branches).await;
            },
        }
    }
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: self.reducer.clone(),
            environment: self.environment.clone(),
            shutdown: Arc::clone(&self.shutdown),
            pending_effects: Arc::clone(&self.pending_effects),
            action_broadcast: self.action_broadcast.clone(),
        }
    }
}
