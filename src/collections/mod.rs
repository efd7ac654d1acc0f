//! Ordered, case-aware key/value containers.
//!
//! # Data Flow
//! ```text
//! OrderedMap<S>
//!     ├── PlainStrategy  → ValueMap  (exact keys, JSON text)
//!     ├── HeaderStrategy → Headers   (case-insensitive keys, header block)
//!     └── QueryStrategy  → Query     (exact keys, form string)
//! ```
//!
//! # Design Decisions
//! - Specialization by strategy type parameter, not by wrapping or inheritance
//! - Iteration order is insertion order, so rendering is deterministic

pub mod headers;
pub mod map;
pub mod query;
pub mod values;

pub use headers::{HeaderStrategy, Headers};
pub use map::{MapStrategy, OrderedMap};
pub use query::{Query, QueryStrategy};
pub use values::{PlainStrategy, ValueMap};
