//! # tsu-upload
//!
//! File-upload middleware for hyper services. Parse once, run the handler,
//! always clean up.
//!
//! ## The contract
//!
//! [`UploadMiddleware`] wraps one handler:
//!
//! - Only `POST` gets through. Everything else is `405 Method Not Allowed`.
//! - A body some upstream layer already parsed is a wiring mistake: `500`.
//! - The [`FormParser`] you plug in decodes the request. Its fields land on
//!   [`Request::form`], its files on [`Request::files`].
//! - Whatever the handler does (returns, errors, panics) every uploaded file
//!   is destroyed exactly once before the response goes out.
//! - Parser errors, handler errors and handler panics are logged and answered
//!   with an empty `500`. No detail reaches the client.
//!
//! Decoding multipart bodies is not this crate's job. Bring a parser.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tsu_upload::{BoxError, DiskFile, Fields, FormParser, ParsedForm, Request, Response};
//! use tsu_upload::handler::BoxFuture;
//! use tsu_upload::with_file_upload;
//!
//! struct SpoolParser;
//!
//! impl FormParser for SpoolParser {
//!     fn parse<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Result<ParsedForm, BoxError>> {
//!         Box::pin(spool(req))
//!     }
//! }
//!
//! async fn spool(req: &Request) -> Result<ParsedForm, BoxError> {
//!     let path = std::env::temp_dir().join("upload.bin");
//!     tokio::fs::write(&path, req.body()).await?;
//!     let file = DiskFile::new("file", path).into_handle();
//!     Ok(ParsedForm::new(Fields::new(), vec![file]))
//! }
//!
//! async fn store(req: Request) -> Result<Response, std::io::Error> {
//!     let file = req.file("file").and_then(|f| f.path()).map(std::fs::read).transpose()?;
//!     Ok(Response::text(format!("{} bytes", file.map_or(0, |b| b.len()))))
//! }
//!
//! # async fn run(req: Request) {
//! let upload = with_file_upload(SpoolParser, store);
//! let res = upload.handle(req).await;
//! # }
//! ```

mod error;
mod file;
mod form;
mod request;
mod response;

pub mod handler;
pub mod middleware;

pub use error::{BoxError, Error};
pub use file::{DiskFile, FileHandle, UploadedFile};
pub use form::{FieldValue, Fields, FormParser, ParsedForm};
pub use handler::{Handler, IntoOutcome};
pub use middleware::{UploadMiddleware, with_file_upload};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
