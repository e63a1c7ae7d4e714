//! File-upload middleware.
//!
//! Wraps one handler. For every request it:
//!
//! 1. rejects anything but the accepted method (`POST`) with `405`,
//! 2. rejects a body an upstream layer already parsed with `500`,
//! 3. runs the [`FormParser`] and puts the fields and files on the request,
//! 4. runs the handler,
//! 5. destroys every uploaded file, whatever the handler did.
//!
//! Parse errors, handler errors and handler panics all become an empty `500`.
//! The error itself only goes to the log.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::Method;
use tokio::task::{JoinError, JoinHandle};
use tracing::{Instrument, debug, debug_span, error, warn};

use crate::error::Error;
use crate::file::UploadGuard;
use crate::form::{FormParser, ParsedForm};
use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// Wraps `handler` so it receives parsed upload requests.
///
/// ```rust,no_run
/// # use tsu_upload::{BoxError, FormParser, ParsedForm, Request, Response};
/// # use tsu_upload::handler::BoxFuture;
/// # struct MultipartParser;
/// # impl FormParser for MultipartParser {
/// #     fn parse<'a>(&'a self, _: &'a Request) -> BoxFuture<'a, Result<ParsedForm, BoxError>> {
/// #         Box::pin(async { Ok::<_, BoxError>(ParsedForm::default()) })
/// #     }
/// # }
/// use tsu_upload::with_file_upload;
///
/// async fn store(req: Request) -> Response {
///     let title = req.field("title").unwrap_or("untitled");
///     Response::text(format!("{title}: {} file(s)", req.files().len()))
/// }
///
/// let upload = with_file_upload(MultipartParser, store);
/// ```
pub fn with_file_upload<P: FormParser>(parser: P, handler: impl Handler) -> UploadMiddleware<P> {
    UploadMiddleware::new(parser, handler)
}

/// Parses upload requests, runs the wrapped handler, and cleans up after it.
///
/// Cheap to clone: parser and handler are shared.
pub struct UploadMiddleware<P> {
    parser: Arc<P>,
    handler: BoxedHandler,
    method: Method,
    body_limit: usize,
}

/// Largest body the hyper service buffers unless told otherwise: 16 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 16 * 1024 * 1024;

impl<P: FormParser> UploadMiddleware<P> {
    pub fn new(parser: P, handler: impl Handler) -> Self {
        Self {
            parser: Arc::new(parser),
            handler: handler.into_boxed_handler(),
            method: Method::POST,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Accepts `method` instead of `POST`.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Caps how many body bytes the hyper service buffers before parsing.
    /// Larger bodies are answered with `413`.
    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    pub(crate) fn limit(&self) -> usize { self.body_limit }

    /// Runs one request through the middleware.
    ///
    /// Never fails: every error is logged and answered with a status code.
    /// Uploaded files are destroyed before this returns.
    pub async fn handle(&self, req: Request) -> Response {
        let span = debug_span!("upload", method = %req.method(), path = req.path());
        async move {
            match self.run(req).await {
                Ok(res) => res,
                Err(e) => {
                    report(&e);
                    e.into_response()
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, mut req: Request) -> Result<Response, Error> {
        if !req.method().as_str().eq_ignore_ascii_case(self.method.as_str()) {
            return Err(Error::MethodNotAllowed {
                method: req.method().clone(),
                allowed: self.method.clone(),
            });
        }
        if req.form().is_some() {
            return Err(Error::BodyConflict);
        }

        let ParsedForm { fields, files } = self.parser.parse(&req).await.map_err(Error::Parse)?;
        debug!(fields = fields.len(), files = files.len(), "form parsed");

        let guard = UploadGuard::new(files);
        req.attach(fields, guard.handles());
        self.invoke(req, guard).await
    }

    // The handler gets its own task so a panic stays inside it. The guard
    // travels with it: files are destroyed once the handler future is gone,
    // whether it finished, panicked or was aborted.
    async fn invoke(&self, req: Request, guard: UploadGuard) -> Result<Response, Error> {
        let fut = self.handler.call(req);
        let task = AbortOnDrop(tokio::spawn(async move {
            let outcome = fut.await;
            guard.release();
            outcome
        }));
        match task.await {
            Ok(Ok(res)) => Ok(res),
            Ok(Err(e)) => Err(Error::Handler(e)),
            Err(e) if e.is_panic() => Err(Error::HandlerPanicked),
            Err(e) => Err(Error::Handler(Box::new(e))),
        }
    }
}

/// Aborts the handler task if the request future is dropped before it finishes.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Future for AbortOnDrop<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl<P> Clone for UploadMiddleware<P> {
    fn clone(&self) -> Self {
        Self {
            parser: Arc::clone(&self.parser),
            handler: Arc::clone(&self.handler),
            method: self.method.clone(),
            body_limit: self.body_limit,
        }
    }
}

pub(crate) fn report(e: &Error) {
    match e {
        Error::MethodNotAllowed { .. } => debug!(error = %e, "request rejected"),
        Error::Parse(_) | Error::Body(_) | Error::BodyTooLarge { .. } => warn!(error = %e, "upload request failed"),
        Error::BodyConflict | Error::Handler(_) | Error::HandlerPanicked => {
            error!(error = %e, "upload request failed")
        }
    }
}
