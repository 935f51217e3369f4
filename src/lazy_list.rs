//! Lazy, pull-based sequences
//!
//! A [`LazyList`] wraps exactly one source and derives new lists through
//! [`filter`](LazyList::filter), [`map`](LazyList::map) and
//! [`zip`](LazyList::zip) without producing anything until a consumer pulls.
//! Nothing is cached: every call to [`iter`](LazyList::iter) or
//! [`stream`](LazyList::stream) starts a fresh pass over the source.
//!
//! Whether a list can be pulled synchronously is recorded once, at
//! construction, as its [`Capability`]. Lists over plain iterables are
//! [`Capability::Sync`] and can still be consumed as streams; lists over event
//! bridges, or with an async predicate or transform anywhere upstream, are
//! [`Capability::Async`] and reject synchronous pulls with
//! [`LazyListError::AsyncOnly`].

use futures::stream::{self, BoxStream, StreamExt};
use futures_core::Stream;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::bridge::{open_event_bridge, EventBridge};
use crate::combinators::{zip_pair, Filter, Map, Zip};
use crate::error::{LazyListError, LazyListResult};
use crate::event_source::EventSource;
use crate::stream_configuration::ListenOptions;

/// A boxed synchronous pass over a sequence
pub type LazyIter<T> = Box<dyn Iterator<Item = T> + Send>;

/// A boxed asynchronous pass over a sequence
pub type LazyStream<T> = BoxStream<'static, T>;

/// Which pull protocols a sequence supports natively
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Synchronous only; asynchronous passes drive the synchronous iterator
    Sync,
    /// Both protocols are native
    Dual,
    /// Asynchronous only
    Async,
}

impl Capability {
    pub fn supports_sync(self) -> bool {
        !matches!(self, Capability::Async)
    }

    /// Capability of a node that has its own async path over `upstream`
    pub(crate) fn derived(upstream: Capability) -> Capability {
        if upstream.supports_sync() {
            Capability::Dual
        } else {
            Capability::Async
        }
    }
}

/// A source a [`LazyList`] can wrap.
///
/// Each call to `iter` or `stream` must return an independent pass, unless
/// the source itself is stateful (an event bridge drains a shared buffer).
pub trait Sequence<T: Send + 'static>: Send + Sync {
    fn capability(&self) -> Capability;

    /// Start a synchronous pass. Sources without a synchronous path keep the
    /// default, which fails with [`LazyListError::AsyncOnly`].
    fn iter(&self) -> LazyListResult<LazyIter<T>> {
        Err(LazyListError::AsyncOnly)
    }

    /// Start an asynchronous pass. [`Capability::Sync`] sources drive their
    /// iterator here.
    fn stream(&self) -> LazyStream<T>;
}

/// Re-iterable synchronous source
struct IterSource<I>(I);

impl<I> Sequence<I::Item> for IterSource<I>
where
    I: IntoIterator + Clone + Send + Sync,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    fn capability(&self) -> Capability {
        Capability::Sync
    }

    fn iter(&self) -> LazyListResult<LazyIter<I::Item>> {
        Ok(Box::new(self.0.clone().into_iter()))
    }

    fn stream(&self) -> LazyStream<I::Item> {
        stream::iter(self.0.clone()).boxed()
    }
}

/// Asynchronous source built from a stream factory
struct StreamSource<F, S> {
    factory: F,
    _phantom: PhantomData<fn() -> S>,
}

impl<F, S> Sequence<S::Item> for StreamSource<F, S>
where
    F: Fn() -> S + Send + Sync,
    S: Stream + Send + 'static,
    S::Item: Send + 'static,
{
    fn capability(&self) -> Capability {
        Capability::Async
    }

    fn stream(&self) -> LazyStream<S::Item> {
        (self.factory)().boxed()
    }
}

/// Source with both a synchronous iterable and an asynchronous factory
struct DualSource<I, F, S> {
    iterable: I,
    factory: F,
    _phantom: PhantomData<fn() -> S>,
}

impl<I, F, S> Sequence<I::Item> for DualSource<I, F, S>
where
    I: IntoIterator + Clone + Send + Sync,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
    F: Fn() -> S + Send + Sync,
    S: Stream<Item = I::Item> + Send + 'static,
{
    fn capability(&self) -> Capability {
        Capability::Dual
    }

    fn iter(&self) -> LazyListResult<LazyIter<I::Item>> {
        Ok(Box::new(self.iterable.clone().into_iter()))
    }

    fn stream(&self) -> LazyStream<I::Item> {
        (self.factory)().boxed()
    }
}

/// Handle to a lazily produced sequence
pub struct LazyList<T: Send + 'static> {
    pub(crate) source: Arc<dyn Sequence<T>>,
    capability: Capability,
}

impl<T: Send + 'static> Clone for LazyList<T> {
    fn clone(&self) -> Self {
        LazyList {
            source: Arc::clone(&self.source),
            capability: self.capability,
        }
    }
}

impl<T: Send + 'static> fmt::Debug for LazyList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyList")
            .field("capability", &self.capability)
            .finish()
    }
}

impl<T> LazyList<T>
where
    T: Send + 'static,
{
    /// Wrap any [`Sequence`]
    pub fn new<S>(source: S) -> Self
    where
        S: Sequence<T> + 'static,
    {
        let capability = source.capability();
        LazyList {
            source: Arc::new(source),
            capability,
        }
    }

    /// Wrap a re-iterable collection; each pass iterates a clone of it
    pub fn from_iterable<I>(iterable: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
        I::IntoIter: Send + 'static,
    {
        Self::new(IterSource(iterable))
    }

    /// Wrap a stream factory; each pass calls `factory` once
    pub fn from_stream<F, S>(factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Stream<Item = T> + Send + 'static,
    {
        Self::new(StreamSource { factory, _phantom: PhantomData })
    }

    /// Wrap a source that can be pulled both ways natively
    pub fn from_parts<I, F, S>(iterable: I, factory: F) -> Self
    where
        I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
        I::IntoIter: Send + 'static,
        F: Fn() -> S + Send + Sync + 'static,
        S: Stream<Item = T> + Send + 'static,
    {
        Self::new(DualSource { iterable, factory, _phantom: PhantomData })
    }

    /// Wrap an event bridge. Passes share the bridge's buffer.
    pub fn from_bridge(bridge: EventBridge<T>) -> Self {
        Self::new(bridge)
    }

    /// Subscribe to `event_type` on `source` and expose the events as an
    /// asynchronous, never-ending list.
    pub fn listen(source: Arc<dyn EventSource<T>>, event_type: &str, options: ListenOptions) -> Self {
        Self::from_bridge(open_event_bridge(source, event_type, options))
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Keep the elements for which `predicate` holds
    pub fn filter<F>(&self, predicate: F) -> LazyList<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        LazyList::new(Filter::new(self.clone(), predicate))
    }

    /// Keep the elements for which the awaited `predicate` holds.
    /// The resulting list is asynchronous only.
    pub fn filter_async<F, Fut>(&self, predicate: F) -> LazyList<T>
    where
        F: Fn(&T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        LazyList::new(Filter::new_async(self.clone(), predicate))
    }

    /// Transform each element
    pub fn map<U, F>(&self, transform: F) -> LazyList<U>
    where
        F: Fn(T) -> U + Send + Sync + 'static,
        U: Send + 'static,
    {
        LazyList::new(Map::new(self.clone(), transform))
    }

    /// Transform each element with an awaited function.
    /// The resulting list is asynchronous only.
    pub fn map_async<U, F, Fut>(&self, transform: F) -> LazyList<U>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = U> + Send + 'static,
        U: Send + 'static,
    {
        LazyList::new(Map::new_async(self.clone(), transform))
    }

    /// Pair this list with `other` position by position.
    ///
    /// Runs until both lists are exhausted; the shorter side contributes
    /// `None` after it ends.
    pub fn zip<U>(&self, other: &LazyList<U>) -> LazyList<(Option<T>, Option<U>)>
    where
        U: Send + 'static,
    {
        zip_pair(self, other)
    }

    /// Combine this list with `others` position by position, this list first.
    ///
    /// Each tuple has one slot per list. The sequence ends at the first step
    /// where every list is exhausted.
    pub fn zip_all<I>(&self, others: I) -> LazyList<Vec<Option<T>>>
    where
        I: IntoIterator<Item = LazyList<T>>,
    {
        let mut sources = vec![self.clone()];
        sources.extend(others);
        LazyList::new(Zip::new(sources))
    }

    /// Start a synchronous pass
    pub fn iter(&self) -> LazyListResult<LazyIter<T>> {
        if self.capability.supports_sync() {
            self.source.iter()
        } else {
            Err(LazyListError::AsyncOnly)
        }
    }

    /// Start an asynchronous pass. Synchronous-only sources are driven
    /// through their iterator.
    pub fn stream(&self) -> LazyStream<T> {
        self.source.stream()
    }

    /// Fold the synchronous pass left to right
    pub fn reduce<B, F>(&self, seed: B, combine: F) -> LazyListResult<B>
    where
        F: FnMut(B, T) -> B,
    {
        Ok(self.iter()?.fold(seed, combine))
    }

    /// Fold the asynchronous pass left to right. Never completes over a
    /// bridge-backed list.
    pub async fn fold_async<B, F>(&self, seed: B, mut combine: F) -> B
    where
        F: FnMut(B, T) -> B,
    {
        let mut pass = self.stream();
        let mut acc = seed;
        while let Some(item) = pass.next().await {
            acc = combine(acc, item);
        }
        acc
    }

    pub fn collect_vec(&self) -> LazyListResult<Vec<T>> {
        Ok(self.iter()?.collect())
    }

    pub async fn collect_async(&self) -> Vec<T> {
        self.stream().collect().await
    }
}

/// Extension trait turning re-iterable collections into lazy lists
pub trait IntoLazyList: IntoIterator + Sized {
    fn into_lazy_list(self) -> LazyList<Self::Item>
    where
        Self::Item: Send + 'static;
}

impl<I> IntoLazyList for I
where
    I: IntoIterator + Clone + Send + Sync + 'static,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    fn into_lazy_list(self) -> LazyList<I::Item> {
        LazyList::from_iterable(self)
    }
}
