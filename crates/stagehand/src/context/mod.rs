//! Bounded, prioritized short-term memory.
//!
//! The [`ContextStore`] holds a **fixed** number of windows (seven by
//! default) that exist for the life of the store. A write always replaces a
//! window's content wholesale and re-estimates its token cost; oversized
//! content is compressed down to an allow-listed field subset before
//! storage. When total estimated tokens cross a threshold, a rebalance pass
//! clears the lowest-priority, oldest windows until usage drops back under
//! the retention bound.
//!
//! Readers never mutate: step execution takes an immutable
//! [`ContextSnapshot`] for relevance lookup and hands back a [`WindowWrite`]
//! delta, which the driver applies between steps. That keeps the
//! "step N's side effects are visible before step N+1" ordering guarantee
//! trivially checkable.

pub mod store;

pub use store::{
    CHARS_PER_TOKEN, ContextReport, ContextSnapshot, ContextStore, ContextStoreConfig,
    ContextWindow, DEFAULT_PER_WINDOW_CAP, DEFAULT_WINDOW_COUNT, WindowWrite,
};
