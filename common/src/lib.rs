//! Shared low-level building blocks: core types, timing, a slab arena, and a
//! background-thread logger. Consumed by `orderbook` and `bookctl`.

pub mod lf_queue;
pub mod logging;
pub mod slab;
pub mod time;
pub mod types;
