//! Request building subsystem.
//!
//! # Data Flow
//! ```text
//! Unirest::post(url)
//!     → builder.rs (Request: headers, query, body policy, parts)
//!     → options.rs (TransportOptions handed to the transport)
//!     → body.rs / multipart.rs (payload representations)
//!     → future.rs (await, then, callbacks)
//! ```

pub mod auth;
pub mod body;
pub mod builder;
pub mod future;
pub mod multipart;
pub mod options;

pub use auth::Auth;
pub use body::Body;
pub use builder::Request;
pub use multipart::{Attachment, FieldValue, MultipartForm, Part, PartOptions, PartValue, RelatedPart};
pub use options::{ResponseEncoding, TransportOptions, DEFAULT_MAX_REDIRECTS};
