//! Handler trait and type erasure.
//!
//! # How upload handlers are stored
//!
//! [`UploadMiddleware`](crate::middleware::UploadMiddleware) holds exactly one
//! downstream handler, but it must not be generic over it: the middleware is
//! cloned into every connection and named in application types. So the
//! handler is erased behind `dyn ErasedHandler`, the same way a router would
//! store many of them.
//!
//! ```text
//! async fn store(req: Request) -> Result<Response, E> { … }   ← user writes this
//!        ↓ with_file_upload(parser, store)
//! store.into_boxed_handler()                               ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(store))                               ← stored as BoxedHandler
//!        ↓
//! handler.call(req)  at request time                       ← one vtable dispatch
//!        ↓
//! Box::pin(async { store(req).await.into_outcome() })      ← HandlerFuture
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::StatusCode;

use crate::error::BoxError;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future.
///
/// `Send` so the middleware can run it on any tokio worker.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a handler resolves to once erased: its response, or the error it failed with.
#[doc(hidden)]
pub type HandlerFuture = BoxFuture<'static, Result<Response, BoxError>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> HandlerFuture;
}

/// A type-erased handler shared by every clone of the middleware.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Outcomes ──────────────────────────────────────────────────────────────────

/// What a handler may return.
///
/// Anything that is a response succeeds. A `Result` fails on `Err`, which the
/// middleware answers with `500`.
pub trait IntoOutcome {
    fn into_outcome(self) -> Result<Response, BoxError>;
}

impl IntoOutcome for Response {
    fn into_outcome(self) -> Result<Response, BoxError> { Ok(self) }
}

impl IntoOutcome for StatusCode {
    fn into_outcome(self) -> Result<Response, BoxError> { Ok(self.into_response()) }
}

impl IntoOutcome for &'static str {
    fn into_outcome(self) -> Result<Response, BoxError> { Ok(self.into_response()) }
}

impl IntoOutcome for String {
    fn into_outcome(self) -> Result<Response, BoxError> { Ok(self.into_response()) }
}

/// `()` is an empty `200 OK`.
impl IntoOutcome for () {
    fn into_outcome(self) -> Result<Response, BoxError> { Ok(Response::status(StatusCode::OK)) }
}

impl<R, E> IntoOutcome for Result<R, E>
where
    R: IntoResponse,
    E: Into<BoxError>,
{
    fn into_outcome(self) -> Result<Response, BoxError> {
        self.map(IntoResponse::into_response).map_err(Into::into)
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid upload handler.
///
/// You never implement this yourself. It is satisfied by any `async fn` with
/// the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoOutcome
/// ```
///
/// The trait is sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Holds a concrete handler `F` and implements [`ErasedHandler`] for it.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn call(&self, req: Request) -> HandlerFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_outcome() })
    }
}
