//! Wire codecs.
//!
//! # Data Flow
//! ```text
//! wire text ── marshal ──▶ structure
//! structure ── unmarshal ─▶ wire text
//! ```
//!
//! # Design Decisions
//! - "marshal" always decodes and "unmarshal" always encodes, for every codec
//! - Codecs are pure functions; only `body` keeps state (the registry)
//! - Decoding is lenient: malformed fragments are skipped, never raised

pub mod body;
pub mod cookie;
pub mod form;
pub mod header;
pub mod json;

pub use body::{BodyCodec, BodyMarshals, FormCodec, JsonCodec};
