//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request::end():
//!     → tracing.rs (span with request id)
//!     → logging.rs (structured log events, opt-in subscriber)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → whatever subscriber/recorder the host application installs
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every event of a request via its span
//! - Metrics are cheap and can be switched off in config

pub mod logging;
pub mod metrics;
pub mod tracing;
