//! Metrics facade for murmur.
//!
//! Crates record through the `metrics` macros re-exported here, using the
//! names in [`definitions`]. Nothing is exported unless the embedding
//! application installs a recorder.
//!
//! ```rust,ignore
//! use murmur_metrics::{counter, transmit};
//!
//! counter!(transmit::MESSAGES_SENT_TOTAL).increment(1);
//! ```

mod definitions;

pub use definitions::*;

pub use metrics::{counter, gauge, histogram};
