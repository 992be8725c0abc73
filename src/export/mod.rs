//! Bulk export of written metadata records.

/// CSV table export.
pub mod csv;
