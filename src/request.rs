//! Incoming HTTP request type.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, Uri};

use crate::file::FileHandle;
use crate::form::Fields;

/// An incoming upload request.
///
/// Carries the raw body as received and, once the middleware has run the form
/// parser, the parsed fields ([`form`](Self::form)) and uploaded files
/// ([`files`](Self::files)).
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    form: Option<Fields>,
    files: Vec<FileHandle>,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            form: None,
            files: Vec::new(),
        }
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            form: None,
            files: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Marks the body as already parsed, as an upstream body parser would.
    pub fn with_form(mut self, fields: Fields) -> Self {
        self.form = Some(fields);
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }

    /// The raw body bytes.
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Values that are not visible ASCII are skipped.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The parsed form fields, present once the body has been parsed.
    pub fn form(&self) -> Option<&Fields> { self.form.as_ref() }

    /// First value of form field `name`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.form.as_ref().and_then(|f| f.text(name))
    }

    /// Files uploaded with this request, in the order the parser produced them.
    pub fn files(&self) -> &[FileHandle] { &self.files }

    /// First file uploaded under form field `name`.
    pub fn file(&self, name: &str) -> Option<&FileHandle> {
        self.files.iter().find(|f| f.field_name() == name)
    }

    pub(crate) fn attach(&mut self, fields: Fields, files: Vec<FileHandle>) {
        self.form = Some(fields);
        self.files = files;
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, body)
    }
}
