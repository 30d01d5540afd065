//! # FRANC Portal Runtime
//!
//! The Store runtime that coordinates reducer execution and effect handling.
//!
//! One [`Store`] owns the state of exactly one form session. `send` runs the
//! action through the reducer, executes the returned effects, feeds any
//! actions they produce back into the reducer, and only returns once the
//! whole cascade has settled. HTTP handlers can therefore read the state
//! right after `send` and see the final outcome of a submission.
//!
//! ## Example
//!
//! ```ignore
//! use franc_portal_runtime::Store;
//!
//! let store = Store::new(PortalState::default(), PortalReducer::new(), environment);
//!
//! store.send(PortalAction::SetInterfaceCount { count: 3 }).await?;
//!
//! let rows = store.state(|s| s.form.interface_count()).await;
//! ```

use franc_portal_core::{
    effect::{Effect, EventBusOperation},
    reducer::Reducer,
};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Prometheus metrics for observability
pub mod metrics;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// Returned when `send()` is called after the owning session was discarded.
        #[error("Store is shutting down")]
        ShutdownInProgress,
    }
}

pub use error::StoreError;

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicBool, Effect, EventBusOperation, Future, Ordering, Pin, Reducer, RwLock,
        StoreError, VecDeque,
    };
    use std::marker::PhantomData;

    type EffectFuture<'a, A> = Pin<Box<dyn Future<Output = Vec<A>> + Send + 'a>>;

    struct Shared<S, R, E> {
        state: RwLock<S>,
        reducer: R,
        environment: E,
        shutdown: AtomicBool,
    }

    /// The Store - runtime coordinator for a reducer
    ///
    /// Cloning is cheap; clones share state, reducer and environment.
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
        shared: Arc<Shared<S, R, E>>,
        _action: PhantomData<fn(A)>,
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                shared: Arc::clone(&self.shared),
                _action: PhantomData,
            }
        }
    }

    impl<S, A, E, R> std::fmt::Debug for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Store").finish_non_exhaustive()
        }
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self {
                shared: Arc::new(Shared {
                    state: RwLock::new(initial_state),
                    reducer,
                    environment,
                    shutdown: AtomicBool::new(false),
                }),
                _action: PhantomData,
            }
        }

        /// Send an action and drive every resulting effect to completion.
        ///
        /// Actions produced by effects are reduced in the order they are
        /// produced. The write lock is only held while the reducer runs, so
        /// readers are never blocked behind slow I/O. `Effect::Background`
        /// is spawned instead of awaited; its action arrives through a later
        /// `send` on this store.
        ///
        /// Returns the number of actions reduced (the initial action included).
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<usize, StoreError> {
            if self.is_shutdown() {
                tracing::warn!("Rejecting action: store is shutting down");
                return Err(StoreError::ShutdownInProgress);
            }

            let mut queue = VecDeque::from([action]);
            let mut reduced = 0usize;

            while let Some(next) = queue.pop_front() {
                let effects = {
                    let mut state = self.shared.state.write().await;
                    self.shared
                        .reducer
                        .reduce(&mut state, next, &self.shared.environment)
                };
                reduced += 1;
                metrics::counter!("store_actions_processed_total").increment(1);

                for effect in effects {
                    queue.extend(self.execute_effect(effect).await);
                }
            }

            tracing::trace!(reduced, "Action cascade settled");
            Ok(reduced)
        }

        /// Read the current state through a projection closure.
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.shared.state.read().await;
            f(&*state)
        }

        /// Stop accepting actions. Background results that arrive later are dropped.
        pub fn shutdown(&self) {
            self.shared.shutdown.store(true, Ordering::SeqCst);
            tracing::debug!("Store shutdown initiated");
        }

        /// Whether [`Store::shutdown`] was called.
        #[must_use]
        pub fn is_shutdown(&self) -> bool {
            self.shared.shutdown.load(Ordering::SeqCst)
        }

        /// Execute one effect and collect the actions it feeds back.
        fn execute_effect(&self, effect: Effect<A>) -> EffectFuture<'_, A> {
            Box::pin(async move {
                match effect {
                    Effect::None => {
                        tracing::trace!("Executing Effect::None (no-op)");
                        metrics::counter!("store_effects_executed_total", "type" => "none")
                            .increment(1);
                        Vec::new()
                    },
                    Effect::Future(fut) => {
                        tracing::trace!("Executing Effect::Future");
                        metrics::counter!("store_effects_executed_total", "type" => "future")
                            .increment(1);
                        fut.await.into_iter().collect()
                    },
                    Effect::Background(fut) => {
                        tracing::trace!("Spawning Effect::Background");
                        metrics::counter!("store_effects_executed_total", "type" => "background")
                            .increment(1);
                        let store = self.clone();
                        tokio::spawn(async move {
                            let Some(action) = fut.await else {
                                return;
                            };
                            if let Err(error) = store.send(action).await {
                                tracing::debug!(error = %error, "Dropping background result");
                            }
                        });
                        Vec::new()
                    },
                    Effect::Parallel(effects) => {
                        tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                        metrics::counter!("store_effects_executed_total", "type" => "parallel")
                            .increment(1);
                        let running = effects.into_iter().map(|e| self.execute_effect(e));
                        futures::future::join_all(running)
                            .await
                            .into_iter()
                            .flatten()
                            .collect()
                    },
                    Effect::PublishEvent(EventBusOperation::Publish {
                        event_bus,
                        topic,
                        event,
                        on_success,
                        on_error,
                    }) => {
                        metrics::counter!("store_effects_executed_total", "type" => "publish_event")
                            .increment(1);
                        tracing::debug!(
                            topic = %topic,
                            event_type = %event.event_type,
                            key = %event.key,
                            "Executing publish"
                        );

                        let action = match event_bus.publish(&topic, &event).await {
                            Ok(()) => {
                                tracing::debug!(topic = %topic, "publish succeeded");
                                on_success(())
                            },
                            Err(error) => {
                                tracing::warn!(topic = %topic, error = %error, "publish failed");
                                on_error(error)
                            },
                        };
                        action.into_iter().collect()
                    },
                }
            })
        }
    }
}

pub use store::Store;
