//! Asset discovery: directory listing, image probing and layer decoding.

/// Layer image decoding.
pub mod decode;
/// Asset source trait and the filesystem implementation.
pub mod source;
