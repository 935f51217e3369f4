//! Push-to-pull adapter over event sources
//!
//! An [`EventBridge`] subscribes to an [`EventSource`], appends every payload
//! to an unbounded FIFO buffer and releases a [`Gate`]. Pulling from the
//! bridge waits on the gate, then drains the buffer in arrival order. Nothing
//! is ever dropped and there is no backpressure: the buffer grows while nobody
//! pulls.
//!
//! The pull sequence never ends. The primary subscription is removed only when
//! the configured terminal event fires or [`EventBridge::dispose`] is called;
//! a bridge dropped without either keeps its listener (and buffer) alive for
//! as long as the source lives.
//!
//! A bridge handle is also a [`Stream`] in its own right: polling it pulls
//! through a pass the handle starts on first poll and keeps.

use async_stream::stream;
use futures_core::Stream;
use futures_util::StreamExt;
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use crate::error::{LazyListError, LazyListResult};
use crate::event_source::{EventSource, ListenerId};
use crate::gate::Gate;
use crate::lazy_list::{Capability, LazyStream, Sequence};
use crate::stream_configuration::{BridgeConfig, ListenOptions};

/// Buffer and gate shared between the listeners and every pull pass
struct BridgeState<T> {
    event_type: String,
    buffer: Mutex<VecDeque<T>>,
    gate: Gate,
    delivered: AtomicUsize,
    terminated: AtomicBool,
    backlog_warning: Option<usize>,
}

impl<T> BridgeState<T> {
    fn buffer(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, payload: T) {
        let pending = {
            let mut buffer = self.buffer();
            buffer.push_back(payload);
            buffer.len()
        };
        log::trace!("Buffered '{}' event ({} pending)", self.event_type, pending);

        if let Some(threshold) = self.backlog_warning {
            if threshold > 0 && pending % threshold == 0 {
                log::warn!(
                    "Event bridge for '{}' has {} undelivered events; nobody is pulling",
                    self.event_type,
                    pending
                );
            }
        }

        self.gate.release();
    }

    fn pop(&self) -> Option<T> {
        let payload = self.buffer().pop_front();
        if payload.is_some() {
            self.delivered.fetch_add(1, Ordering::Relaxed);
        }
        payload
    }

    fn pending(&self) -> usize {
        self.buffer().len()
    }
}

fn drain<T: Send + 'static>(state: Arc<BridgeState<T>>) -> LazyStream<T> {
    stream! {
        loop {
            if state.pending() == 0 {
                state.gate.wait().await;
            }
            // Re-arm before draining: a push landing mid-drain releases
            // the gate again and the next wait returns at once.
            state.gate.arm();
            while let Some(payload) = state.pop() {
                yield payload;
            }
        }
    }
    .boxed()
}

struct BridgeInner<T> {
    state: Arc<BridgeState<T>>,
    source: Arc<dyn EventSource<T>>,
    options: ListenOptions,
    primary: ListenerId,
    terminal: Option<ListenerId>,
    disposed: AtomicBool,
}

/// Asynchronous, never-ending sequence of events from one event type.
///
/// Cloning yields another handle to the same subscription and buffer, with
/// no pass of its own yet. The buffer is shared by every pass, so only one
/// consumer should pull at a time.
pub struct EventBridge<T> {
    inner: Arc<BridgeInner<T>>,
    // Pass behind the handle's own `Stream` impl; only touched through `&mut`
    pass: Mutex<Option<LazyStream<T>>>,
}

impl<T> Clone for EventBridge<T> {
    fn clone(&self) -> Self {
        EventBridge { inner: Arc::clone(&self.inner), pass: Mutex::new(None) }
    }
}

/// Open a bridge over `event_type` on `source` with the default buffer
/// configuration.
pub fn open_event_bridge<T>(source: Arc<dyn EventSource<T>>, event_type: &str, options: ListenOptions) -> EventBridge<T>
where
    T: Send + 'static,
{
    open_event_bridge_with_config(source, event_type, options, BridgeConfig::default())
}

/// Open a bridge over `event_type` on `source`.
///
/// The primary listener is registered immediately. When `options.end` names a
/// terminal event type, a one-shot listener for it removes the primary
/// listener and then buffers the terminal payload as the last item.
pub fn open_event_bridge_with_config<T>(
    source: Arc<dyn EventSource<T>>,
    event_type: &str,
    options: ListenOptions,
    config: BridgeConfig,
) -> EventBridge<T>
where
    T: Send + 'static,
{
    let state = Arc::new(BridgeState {
        event_type: event_type.to_string(),
        buffer: Mutex::new(VecDeque::with_capacity(config.initial_capacity)),
        gate: Gate::new(),
        delivered: AtomicUsize::new(0),
        terminated: AtomicBool::new(false),
        backlog_warning: config.backlog_warning,
    });

    let primary = {
        let state = Arc::clone(&state);
        source.subscribe(event_type, &options, Arc::new(move |payload: T| state.push(payload)))
    };

    let terminal = options.end.as_deref().map(|end_type| {
        let state = Arc::clone(&state);
        // Weak so the registration stored inside the source does not keep the
        // source itself alive.
        let weak_source: Weak<dyn EventSource<T>> = Arc::downgrade(&source);
        let primary_type = event_type.to_string();
        let primary_options = options.clone();

        source.subscribe_once(
            end_type,
            &options,
            Arc::new(move |payload: T| {
                if let Some(source) = weak_source.upgrade() {
                    source.unsubscribe(&primary_type, &primary_options, primary);
                }
                state.terminated.store(true, Ordering::Release);
                log::debug!("Terminal event received; stopped listening for '{}'", primary_type);
                state.push(payload);
            }),
        )
    });

    log::debug!(
        "Opened event bridge for '{}' ({}, end: {:?})",
        event_type,
        primary,
        options.end
    );

    EventBridge {
        inner: Arc::new(BridgeInner {
            state,
            source,
            options,
            primary,
            terminal,
            disposed: AtomicBool::new(false),
        }),
        pass: Mutex::new(None),
    }
}

impl<T> EventBridge<T>
where
    T: Send + 'static,
{
    /// Start a pull pass over the shared buffer.
    ///
    /// Values already buffered are yielded first without waiting. The pass
    /// never completes.
    pub fn stream(&self) -> LazyStream<T> {
        drain(Arc::clone(&self.inner.state))
    }

    pub fn event_type(&self) -> &str {
        &self.inner.state.event_type
    }

    /// Remove any listeners this bridge still holds on its source.
    ///
    /// Buffered values stay available to pull. Fails if already disposed.
    pub fn dispose(&self) -> LazyListResult<()> {
        let inner = &self.inner;
        if inner.disposed.swap(true, Ordering::AcqRel) {
            return Err(LazyListError::Disposed(inner.state.event_type.clone()));
        }

        let event_type = &inner.state.event_type;
        let removed_primary = inner.source.unsubscribe(event_type, &inner.options, inner.primary);
        let removed_terminal = match (&inner.terminal, &inner.options.end) {
            (Some(id), Some(end_type)) => inner.source.unsubscribe(end_type, &inner.options, *id),
            _ => false,
        };

        log::debug!(
            "Disposed event bridge for '{}' (primary removed: {}, terminal removed: {})",
            event_type,
            removed_primary,
            removed_terminal
        );
        Ok(())
    }

    /// Snapshot of the bridge for monitoring
    pub fn stats(&self) -> BridgeStats {
        let state = &self.inner.state;
        let terminated = state.terminated.load(Ordering::Acquire);
        let disposed = self.inner.disposed.load(Ordering::Acquire);

        BridgeStats {
            event_type: state.event_type.clone(),
            pending: state.pending(),
            delivered: state.delivered.load(Ordering::Relaxed),
            subscribed: !terminated && !disposed,
            terminated,
        }
    }
}

impl<T> Sequence<T> for EventBridge<T>
where
    T: Send + 'static,
{
    fn capability(&self) -> Capability {
        Capability::Async
    }

    fn stream(&self) -> LazyStream<T> {
        EventBridge::stream(self)
    }
}

impl<T> Stream for EventBridge<T>
where
    T: Send + 'static,
{
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.get_mut();
        let state = &this.inner.state;
        let pass = this.pass.get_mut().unwrap_or_else(PoisonError::into_inner);
        pass.get_or_insert_with(|| drain(Arc::clone(state))).poll_next_unpin(cx)
    }
}

impl<T> fmt::Debug for EventBridge<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBridge")
            .field("event_type", &self.inner.state.event_type)
            .field("options", &self.inner.options)
            .field("primary", &self.inner.primary)
            .field("gate", &self.inner.state.gate)
            .finish()
    }
}

/// Bridge statistics for monitoring and debugging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeStats {
    pub event_type: String,
    /// Buffered values not yet pulled
    pub pending: usize,
    /// Values handed to consumers so far
    pub delivered: usize,
    /// Whether the primary listener is still registered
    pub subscribed: bool,
    /// Whether the terminal event has fired
    pub terminated: bool,
}

impl fmt::Display for BridgeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EventBridge('{}', {} pending, {} delivered{})",
            self.event_type,
            self.pending,
            self.delivered,
            if self.terminated {
                ", terminated"
            } else if !self.subscribed {
                ", disposed"
            } else {
                ""
            }
        )
    }
}
