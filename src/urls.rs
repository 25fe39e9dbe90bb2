//! Resource-fetch URL construction.
//!
//! Rewritten markup and stylesheets point images and fonts at a serving
//! layer endpoint of the shape
//! `{base}/api/ebooks/{book_id}/resource?path={encoded}&token={token}`.
//! The book id and token are opaque here; they are embedded verbatim and
//! never interpreted.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters escaped by JavaScript's `encodeURIComponent`: everything
/// but alphanumerics and `- _ . ! ~ * ' ( )`. Archive paths are encoded
/// as a whole, slashes included.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const DEV_BASE_PATH: &str = "http://localhost:3333";

pub(crate) fn encode_uri_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

/// Everything needed to build resource-fetch URLs for one book: the base
/// origin, the book id and the auth token.
#[derive(Debug, Clone)]
pub struct UrlContext {
    base_path: String,
    book_id: String,
    token: String,
}

impl UrlContext {
    /// Context with a same-origin (empty) base path, the production
    /// default.
    pub fn new<S: Into<String>, T: Into<String>>(book_id: S, token: T) -> Self {
        Self {
            base_path: String::new(),
            book_id: book_id.into(),
            token: token.into(),
        }
    }

    /// Context pointing at the local development origin.
    pub fn dev<S: Into<String>, T: Into<String>>(book_id: S, token: T) -> Self {
        Self::new(book_id, token).with_base_path(DEV_BASE_PATH)
    }

    /// Overrides the base path prepended to every generated URL.
    #[must_use]
    pub fn with_base_path<S: Into<String>>(mut self, base_path: S) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// URL at which the serving layer streams the archive entry at
    /// `archive_path`.
    pub fn resource_url(&self, archive_path: &str) -> String {
        format!(
            "{}/api/ebooks/{}/resource?path={}&token={}",
            self.base_path,
            self.book_id,
            encode_uri_component(archive_path),
            self.token
        )
    }
}
