//! Market feed: connection lifecycle, subscription registry, and the
//! live per-symbol snapshot store.

pub mod core;
pub mod manager;
pub mod wire;

pub use self::core::{FeedShared, SessionState};
pub use self::manager::{FeedHandle, FeedManager};
pub use self::wire::RawTick;
