//! Single-threaded containers behind the queue locks.
//!
//! None of these synchronize internally: every instance is owned by exactly
//! one queue and only touched while that queue's mutex is held.

pub mod deque;
pub mod heap;
pub mod pool;
pub mod set;

pub use deque::Deque;
pub use heap::TimingHeap;
pub use pool::{Key, Pool};
pub use set::DedupSet;
