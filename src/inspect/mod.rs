//! Request introspection subsystem.
//!
//! # Data Flow
//! ```text
//! Buffered request (method, path, headers, body, peer)
//!     → headers.rs (flatten, client address, compression, status override)
//!     → cookies.rs (Cookie header)
//!     → body.rs (binary detection, media-type dispatch, truncation)
//!     → token.rs (token headers → decoded header/payload)
//!     → snapshot.rs (assemble with ServerFacts and certificate)
//!     → RequestSnapshot (serialized as the echo response)
//! ```
//!
//! # Design Decisions
//! - Pure functions over borrowed request data; no I/O
//! - Malformed input never fails a request, it only changes the shape of
//!   the report
//! - Decoding limits come from config and are fixed at construction

pub mod body;
pub mod cookies;
pub mod headers;
pub mod snapshot;
pub mod token;

pub use body::{BodyContent, BodyDecoder, BodyDescriptor};
pub use cookies::{CookieDescriptor, SET_COOKIE_REQUEST_HEADER};
pub use headers::{CompressionDescriptor, STATUS_OVERRIDE_HEADER};
pub use snapshot::{Inspector, RequestParts, RequestSnapshot, Transport};
pub use token::{TokenDescriptor, TokenExtractor};
