//! Parsed form data and the parser seam.
//!
//! tsu-upload does not decode multipart bodies. An application plugs in a
//! [`FormParser`] backed by multer, a hand-written decoder or a test fake,
//! and the middleware drives it.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use crate::error::BoxError;
use crate::file::FileHandle;
use crate::handler::BoxFuture;
use crate::request::Request;

// ── FieldValue ────────────────────────────────────────────────────────────────

/// The value of a form field: one text value, or every value of a repeated field.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// The first value, in arrival order.
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            Self::List(vs) => vs.first().map(String::as_str),
        }
    }

    /// Every value, in arrival order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let slice = match self {
            Self::Text(v) => std::slice::from_ref(v),
            Self::List(vs) => vs.as_slice(),
        };
        slice.iter().map(String::as_str)
    }

    fn push(&mut self, value: String) {
        match self {
            Self::Text(prev) => {
                let prev = std::mem::take(prev);
                *self = Self::List(vec![prev, value]);
            }
            Self::List(vs) => vs.push(value),
        }
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self { Self::Text(v) }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

impl From<Vec<String>> for FieldValue {
    fn from(vs: Vec<String>) -> Self { Self::List(vs) }
}

// ── Fields ────────────────────────────────────────────────────────────────────

/// Non-file form fields, keyed by field name.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Fields(HashMap<String, FieldValue>);

impl Fields {
    pub fn new() -> Self { Self::default() }

    /// Adds a value. A name seen before becomes a [`FieldValue::List`].
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        match self.0.entry(name.into()) {
            Entry::Occupied(mut slot) => slot.get_mut().push(value),
            Entry::Vacant(slot) => {
                slot.insert(FieldValue::Text(value));
            }
        }
    }

    /// Sets `name`, replacing whatever was there.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> { self.0.get(name) }

    /// First text value of `name`.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(FieldValue::first)
    }

    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (k, v) in iter {
            fields.append(k, v);
        }
        fields
    }
}

// ── ParsedForm ────────────────────────────────────────────────────────────────

/// What a [`FormParser`] yields: the fields, and the files it spooled.
///
/// Every handle in `files` is destroyed by the middleware once the handler
/// is done with the request.
#[derive(Default)]
pub struct ParsedForm {
    pub fields: Fields,
    pub files: Vec<FileHandle>,
}

impl ParsedForm {
    pub fn new(fields: Fields, files: Vec<FileHandle>) -> Self {
        Self { fields, files }
    }
}

// ── FormParser ────────────────────────────────────────────────────────────────

/// Decodes an upload request into fields and file handles.
///
/// A parser that fails halfway must release any files it already created;
/// the middleware only cleans up handles it was given.
pub trait FormParser: Send + Sync + 'static {
    fn parse<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Result<ParsedForm, BoxError>>;
}

impl<P: FormParser + ?Sized> FormParser for Arc<P> {
    fn parse<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Result<ParsedForm, BoxError>> {
        (**self).parse(req)
    }
}

impl<P: FormParser + ?Sized> FormParser for Box<P> {
    fn parse<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Result<ParsedForm, BoxError>> {
        (**self).parse(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_names_become_lists() {
        let fields: Fields = [("tag", "a"), ("title", "t"), ("tag", "b"), ("tag", "c")]
            .into_iter()
            .collect();

        assert_eq!(fields.len(), 2);
        assert_eq!(fields.text("title"), Some("t"));
        assert_eq!(
            fields.get("tag"),
            Some(&FieldValue::List(vec!["a".into(), "b".into(), "c".into()])),
        );
        assert_eq!(fields.text("tag"), Some("a"));
    }

    #[test]
    fn insert_replaces() {
        let mut fields = Fields::new();
        fields.append("name", "alice");
        fields.insert("name", "bob");
        assert_eq!(fields.get("name"), Some(&FieldValue::Text("bob".into())));
        assert!(fields.get("missing").is_none());
    }

    #[test]
    fn values_in_order() {
        let single = FieldValue::from("x");
        assert_eq!(single.values().collect::<Vec<_>>(), ["x"]);

        let empty = FieldValue::List(Vec::new());
        assert_eq!(empty.first(), None);
        assert_eq!(empty.values().count(), 0);
    }
}
