//! Middleware layer.
//!
//! Middleware sits between the connection and an application handler and owns
//! a cross-cutting concern. Here that concern is file uploads: parse the form
//! once, hand it to the handler, and release the spooled files afterwards.

mod service;
mod upload;

pub use upload::{DEFAULT_BODY_LIMIT, UploadMiddleware, with_file_upload};
