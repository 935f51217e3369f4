//! pico-stream - lazy, pull-based sequences over iterables and events
//!
//! A [`LazyList`] wraps a synchronous iterable, an asynchronous stream or an
//! [`EventBridge`] and composes through `filter`, `map`, `reduce` and `zip`
//! without producing anything until a consumer pulls.
//!
//! ```
//! use pico_stream::{IntoLazyList, LazyList};
//!
//! let evens = vec![1, 2, 3, 4]
//!     .into_lazy_list()
//!     .filter(|x| x % 2 == 0)
//!     .map(|x| x * 10);
//! assert_eq!(evens.collect_vec().unwrap(), vec![20, 40]);
//!
//! let zipped = LazyList::from_iterable(vec![1, 2]).zip(&LazyList::from_iterable(vec!["a", "b", "c"]));
//! assert_eq!(
//!     zipped.collect_vec().unwrap(),
//!     vec![(Some(1), Some("a")), (Some(2), Some("b")), (None, Some("c"))]
//! );
//! ```

pub mod error;
pub mod gate;
pub mod event_source;
pub mod bridge;
pub mod lazy_list;
pub mod combinators;
pub mod stream_configuration;

pub use bridge::{open_event_bridge, open_event_bridge_with_config, BridgeStats, EventBridge};
pub use error::{LazyListError, LazyListResult};
pub use event_source::{EventEmitter, EventSource, Listener, ListenerId};
pub use gate::Gate;
pub use lazy_list::{Capability, IntoLazyList, LazyIter, LazyList, LazyStream, Sequence};
pub use stream_configuration::{BridgeConfig, ListenOptions};
