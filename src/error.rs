//! Unified error type.

use std::fmt;

use http::{Method, StatusCode};

/// A type-erased error, as returned by form parsers, handlers and file handles.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why an upload request did not end with the handler's own response.
///
/// None of these escape [`UploadMiddleware`](crate::middleware::UploadMiddleware):
/// each one is logged and collapsed into a status code. The client never sees
/// the detail.
#[derive(Debug)]
pub enum Error {
    /// The request method is not the one the middleware accepts.
    MethodNotAllowed { method: Method, allowed: Method },
    /// An upstream layer already parsed the request body.
    BodyConflict,
    /// The form parser rejected the request.
    Parse(BoxError),
    /// The downstream handler returned an error.
    Handler(BoxError),
    /// The downstream handler panicked.
    HandlerPanicked,
    /// Reading the request body off the connection failed.
    Body(BoxError),
    /// The request body is larger than the configured limit.
    BodyTooLarge { limit: usize },
}

impl Error {
    /// The status code this failure is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Body(_)                 => StatusCode::BAD_REQUEST,
            Self::BodyTooLarge { .. }     => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BodyConflict
            | Self::Parse(_)
            | Self::Handler(_)
            | Self::HandlerPanicked       => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MethodNotAllowed { method, allowed } => {
                write!(f, "method {method} not allowed, expected {allowed}")
            }
            Self::BodyConflict    => f.write_str("request body was already parsed upstream"),
            Self::Parse(e)        => write!(f, "form parsing failed: {e}"),
            Self::Handler(e)      => write!(f, "handler failed: {e}"),
            Self::HandlerPanicked => f.write_str("handler panicked"),
            Self::Body(e)         => write!(f, "reading request body failed: {e}"),
            Self::BodyTooLarge { limit } => write!(f, "request body exceeds {limit} bytes"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) | Self::Handler(e) | Self::Body(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        let e = Error::MethodNotAllowed { method: Method::GET, allowed: Method::POST };
        assert_eq!(e.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(e.to_string(), "method GET not allowed, expected POST");

        assert_eq!(Error::BodyConflict.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(Error::HandlerPanicked.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(Error::Body("reset".into()).status(), StatusCode::BAD_REQUEST);

        let e = Error::BodyTooLarge { limit: 1024 };
        assert_eq!(e.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(e.to_string(), "request body exceeds 1024 bytes");
    }

    #[test]
    fn source_is_the_wrapped_error() {
        use std::error::Error as _;

        let e = Error::Parse("bad boundary".into());
        assert_eq!(e.source().map(ToString::to_string).as_deref(), Some("bad boundary"));
        assert!(Error::BodyConflict.source().is_none());
    }
}
