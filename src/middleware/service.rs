//! Hyper integration.
//!
//! [`UploadMiddleware`] is a hyper [`Service`], so it can be handed straight to
//! a connection builder, or called from a router that dispatches hyper
//! requests:
//!
//! ```rust,ignore
//! let svc = with_file_upload(parser, store).body_limit(8 * 1024 * 1024);
//! ConnBuilder::new(TokioExecutor::new()).serve_connection(io, svc).await
//! ```
//!
//! The body is buffered in full before the parser runs, never past
//! [`UploadMiddleware::body_limit`].

use std::convert::Infallible;

use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::service::Service;

use super::upload::{UploadMiddleware, report};
use crate::error::{BoxError, Error};
use crate::form::FormParser;
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::IntoResponse;

impl<P, B> Service<http::Request<B>> for UploadMiddleware<P>
where
    P: FormParser,
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = http::Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Infallible>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let response = match buffer(&parts, body, this.limit()).await {
                Ok(bytes) => this.handle(Request::from_parts(parts, bytes)).await,
                Err(e) => {
                    report(&e);
                    e.into_response()
                }
            };
            Ok(response.into_inner())
        })
    }
}

/// Collects the body, refusing to hold more than `limit` bytes.
async fn buffer<B>(parts: &http::request::Parts, body: B, limit: usize) -> Result<Bytes, Error>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    // An announced length over the limit is refused before reading anything.
    let announced = parts.headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok()?.parse::<usize>().ok());
    if announced.is_some_and(|len| len > limit) {
        return Err(Error::BodyTooLarge { limit });
    }

    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(Error::BodyTooLarge { limit })
        }
        Err(e) => Err(Error::Body(e)),
    }
}
