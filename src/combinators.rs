//! Filter, map and zip nodes
//!
//! Every node owns its upstream list(s) and its function. The synchronous path
//! is built from iterator adapters; the asynchronous path pulls the upstream
//! stream one element at a time and awaits async predicates and transforms
//! before yielding.

use async_stream::stream;
use futures::future::{join_all, BoxFuture, FutureExt};
use futures::stream::StreamExt;
use std::future::Future;
use std::sync::Arc;

use crate::error::{LazyListError, LazyListResult};
use crate::lazy_list::{Capability, LazyIter, LazyList, LazyStream, Sequence};

enum Predicate<T> {
    Sync(Arc<dyn Fn(&T) -> bool + Send + Sync>),
    Async(Arc<dyn Fn(&T) -> BoxFuture<'static, bool> + Send + Sync>),
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        match self {
            Predicate::Sync(f) => Predicate::Sync(Arc::clone(f)),
            Predicate::Async(f) => Predicate::Async(Arc::clone(f)),
        }
    }
}

/// Keeps the upstream elements for which a predicate holds
pub struct Filter<T: Send + 'static> {
    upstream: LazyList<T>,
    predicate: Predicate<T>,
}

impl<T: Send + 'static> Filter<T> {
    pub fn new<F>(upstream: LazyList<T>, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Filter { upstream, predicate: Predicate::Sync(Arc::new(predicate)) }
    }

    pub fn new_async<F, Fut>(upstream: LazyList<T>, predicate: F) -> Self
    where
        F: Fn(&T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let predicate = move |item: &T| predicate(item).boxed();
        Filter { upstream, predicate: Predicate::Async(Arc::new(predicate)) }
    }
}

impl<T: Send + 'static> Sequence<T> for Filter<T> {
    fn capability(&self) -> Capability {
        match self.predicate {
            Predicate::Sync(_) => Capability::derived(self.upstream.capability()),
            Predicate::Async(_) => Capability::Async,
        }
    }

    fn iter(&self) -> LazyListResult<LazyIter<T>> {
        match &self.predicate {
            Predicate::Sync(predicate) => {
                let upstream = self.upstream.iter()?;
                let predicate = Arc::clone(predicate);
                Ok(Box::new(upstream.filter(move |item| predicate(item))))
            }
            Predicate::Async(_) => Err(LazyListError::AsyncOnly),
        }
    }

    fn stream(&self) -> LazyStream<T> {
        let mut upstream = self.upstream.stream();
        let predicate = self.predicate.clone();

        stream! {
            while let Some(item) = upstream.next().await {
                let keep = match &predicate {
                    Predicate::Sync(f) => f(&item),
                    Predicate::Async(f) => f(&item).await,
                };
                if keep {
                    yield item;
                }
            }
        }
        .boxed()
    }
}

enum Transform<T, U> {
    Sync(Arc<dyn Fn(T) -> U + Send + Sync>),
    Async(Arc<dyn Fn(T) -> BoxFuture<'static, U> + Send + Sync>),
}

impl<T, U> Clone for Transform<T, U> {
    fn clone(&self) -> Self {
        match self {
            Transform::Sync(f) => Transform::Sync(Arc::clone(f)),
            Transform::Async(f) => Transform::Async(Arc::clone(f)),
        }
    }
}

/// Applies a transform to each upstream element, one to one
pub struct Map<T: Send + 'static, U> {
    upstream: LazyList<T>,
    transform: Transform<T, U>,
}

impl<T: Send + 'static, U: Send + 'static> Map<T, U> {
    pub fn new<F>(upstream: LazyList<T>, transform: F) -> Self
    where
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        Map { upstream, transform: Transform::Sync(Arc::new(transform)) }
    }

    pub fn new_async<F, Fut>(upstream: LazyList<T>, transform: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = U> + Send + 'static,
    {
        let transform = move |item: T| transform(item).boxed();
        Map { upstream, transform: Transform::Async(Arc::new(transform)) }
    }
}

impl<T: Send + 'static, U: Send + 'static> Sequence<U> for Map<T, U> {
    fn capability(&self) -> Capability {
        match self.transform {
            Transform::Sync(_) => Capability::derived(self.upstream.capability()),
            Transform::Async(_) => Capability::Async,
        }
    }

    fn iter(&self) -> LazyListResult<LazyIter<U>> {
        match &self.transform {
            Transform::Sync(transform) => {
                let upstream = self.upstream.iter()?;
                let transform = Arc::clone(transform);
                Ok(Box::new(upstream.map(move |item| transform(item))))
            }
            Transform::Async(_) => Err(LazyListError::AsyncOnly),
        }
    }

    fn stream(&self) -> LazyStream<U> {
        let mut upstream = self.upstream.stream();
        let transform = self.transform.clone();

        stream! {
            while let Some(item) = upstream.next().await {
                let mapped = match &transform {
                    Transform::Sync(f) => f(item),
                    Transform::Async(f) => f(item).await,
                };
                yield mapped;
            }
        }
        .boxed()
    }
}

/// Combines several lists position by position.
///
/// Each step pulls once from every source. Exhausted sources contribute
/// `None`, and the sequence ends at the first step where all of them are
/// exhausted; that step yields nothing. Shorter sources do not stop the zip.
pub struct Zip<T: Send + 'static> {
    sources: Vec<LazyList<T>>,
}

impl<T: Send + 'static> Zip<T> {
    pub fn new(sources: Vec<LazyList<T>>) -> Self {
        Zip { sources }
    }
}

impl<T: Send + 'static> Sequence<Vec<Option<T>>> for Zip<T> {
    fn capability(&self) -> Capability {
        if self.sources.iter().all(|s| s.capability().supports_sync()) {
            Capability::Dual
        } else {
            Capability::Async
        }
    }

    fn iter(&self) -> LazyListResult<LazyIter<Vec<Option<T>>>> {
        let mut iterators = self
            .sources
            .iter()
            .map(|s| s.iter().map(Iterator::fuse))
            .collect::<LazyListResult<Vec<_>>>()?;

        Ok(Box::new(std::iter::from_fn(move || {
            let tuple: Vec<Option<T>> = iterators.iter_mut().map(Iterator::next).collect();
            if tuple.iter().all(Option::is_none) {
                None
            } else {
                Some(tuple)
            }
        })))
    }

    fn stream(&self) -> LazyStream<Vec<Option<T>>> {
        let mut streams: Vec<_> = self.sources.iter().map(|s| s.stream().fuse()).collect();

        stream! {
            loop {
                // All sources are polled together for each step
                let tuple: Vec<Option<T>> = join_all(streams.iter_mut().map(|s| s.next())).await;
                if tuple.iter().all(Option::is_none) {
                    break;
                }
                yield tuple;
            }
        }
        .boxed()
    }
}

enum Side<A, B> {
    Left(A),
    Right(B),
}

/// Two-list zip over lists of different element types
pub(crate) fn zip_pair<A, B>(left: &LazyList<A>, right: &LazyList<B>) -> LazyList<(Option<A>, Option<B>)>
where
    A: Send + 'static,
    B: Send + 'static,
{
    let left = left.map(Side::<A, B>::Left);
    let right = right.map(Side::<A, B>::Right);

    left.zip_all([right]).map(|tuple| {
        let mut slots = tuple.into_iter();
        let a = match slots.next().flatten() {
            Some(Side::Left(a)) => Some(a),
            _ => None,
        };
        let b = match slots.next().flatten() {
            Some(Side::Right(b)) => Some(b),
            _ => None,
        };
        (a, b)
    })
}
