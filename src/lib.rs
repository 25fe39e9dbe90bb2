#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::let_underscore_drop,
    clippy::uninlined_format_args,
    clippy::missing_const_for_fn,
)]

//! EPUB extraction and safe-rendering pipeline.
//!
//! Opens an epub (a ZIP archive), resolves its OPF manifest and spine
//! into an immutable [`container::EbookContainer`], rewrites every
//! stylesheet so it is scoped under a containment class, and renders
//! individual spine pages into self-contained HTML fragments whose
//! image and font references point at a resource-fetch endpoint.
//!
//! # Parsing a book
//!
//! ```no_run
//! use epub_render::container::EbookContainer;
//! use epub_render::urls::UrlContext;
//!
//! let urls = UrlContext::new("book-id", "auth-token");
//! let container = EbookContainer::parse("book.epub", &urls).unwrap();
//! println!("{} pages", container.page_count());
//! ```
//!
//! The container is read-only after construction: cache it per book for
//! the reading session and share it freely across concurrent render
//! calls.
//!
//! # Rendering a page
//!
//! ```no_run
//! # use epub_render::container::EbookContainer;
//! # use epub_render::urls::UrlContext;
//! use epub_render::render::render_page;
//!
//! # let urls = UrlContext::new("book-id", "auth-token");
//! # let container = EbookContainer::parse("book.epub", &urls).unwrap();
//! let html = render_page(&container, 0, &urls).unwrap();
//! assert!(html.starts_with("<div class=\"abs-page-content\""));
//! ```
//!
//! # Serving resources
//!
//! Rendered pages reference images and fonts through URLs of the shape
//! `{base}/api/ebooks/{id}/resource?path={path}&token={token}`. The
//! endpoint behind that shape is the caller's; it can stream the bytes
//! with [`container::EbookContainer::read_resource`], which also
//! reports the manifest media type for the content-type header.

mod paths;
mod xmlutils;

pub mod archive;
pub mod container;
pub mod css;
pub mod render;
pub mod urls;

/// CSS class namespacing a rendered page's markup and styles against
/// the host document.
pub const SCOPE_CLASS: &str = "abs-page-content";
