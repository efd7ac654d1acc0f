//! Response normalization subsystem.
//!
//! # Data Flow
//! ```text
//! RawResponse { head, body }
//!     → decompress.rs (ResponseStream: inflate, optional text decoding)
//!     → collect
//!     → normalize.rs (headers, cookies, body parse, status, error)
//!     → Response
//! ```

pub mod decompress;
pub mod normalize;
pub mod status;

pub use decompress::{Chunk, ResponseStream};
pub use normalize::{RawBody, Response, ResponseBody, StreamedResponse};
pub use status::{StatusError, StatusInfo};
