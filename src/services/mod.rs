//! Import service: the operations the HTTP layer exposes, independent of axum.

pub mod import;
