//! Renders one spine page into a self-contained HTML fragment.
//!
//! The fragment carries its own `<style>` blocks (scoped by the
//! containment class) ahead of the page body, so several pages can sit
//! in one host document without their styles colliding with the host or
//! with each other. Relative image references are rewritten into
//! resource-fetch URLs; images and svgs get uniform sizing classes so a
//! book's own CSS can never blow them past the viewport.

use log::warn;

use crate::archive::{ArchiveError, EpubArchive};
use crate::container::{EbookContainer, Stylesheet};
use crate::css;
use crate::paths;
use crate::urls::UrlContext;
use crate::xmlutils::{XmlContent, XmlError, XmlNode};
use crate::SCOPE_CLASS;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("page index {index} out of bounds, book has {pages} pages")]
    PageOutOfBounds { index: usize, pages: usize },
    #[error("Archive Error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("XML Error: {0}")]
    Xml(#[from] XmlError),
    #[error("page {0} has no <body> element")]
    MissingBody(String),
}

const IMAGE_SCALE_CLASS: &str = "abs-image-scale";
const SVG_SCALE_CLASS: &str = "abs-svg-scale";

/// Fixed sizing rules shared by every rendered page.
const SIZING_RULES: &str = "\
.abs-image-scale{max-width:100%;object-fit:contain;max-height:100vh}\
.abs-svg-scale{width:auto;max-height:80vh}";

const WRAPPER_STYLE: &str = "width:100%;height:100%";

/// Renders the spine page at `page_index` into a single HTML string.
///
/// Output order is deterministic: the wrapper div, then per stylesheet
/// link (in document order) its transitive imports followed by its own
/// `<style>` block, then the shared sizing rules, then the mutated body
/// content. Rendering the same page twice yields byte-identical HTML.
///
/// A link with no matching stylesheet in the container and an image with
/// no source attribute are logged and skipped; they degrade the output
/// without failing the call.
///
/// # Errors
///
/// An out-of-range `page_index` is reported as
/// [`RenderError::PageOutOfBounds`] so the caller can map it to a
/// "no such page" response. A page without a `<body>` element fails with
/// [`RenderError::MissingBody`]; unreadable or unparseable pages fail
/// with the underlying error. One bad page never invalidates the
/// container.
pub fn render_page(
    container: &EbookContainer,
    page_index: usize,
    urls: &UrlContext,
) -> Result<String, RenderError> {
    let Some(page) = container.pages.get(page_index) else {
        return Err(RenderError::PageOutOfBounds {
            index: page_index,
            pages: container.pages.len(),
        });
    };

    let mut archive = EpubArchive::new(&container.filepath)?;
    let markup = archive.get_entry_as_str(&page.path)?;
    let mut doc = XmlNode::parse(markup.as_bytes())?;

    let page_dir = paths::dirname(&page.path).to_string();
    let links = collect_stylesheet_links(&doc, &page_dir);

    let Some(body) = doc.find_mut("body") else {
        return Err(RenderError::MissingBody(page.path.clone()));
    };
    rewrite_media_elements(body, &page_dir, urls);

    let mut html = String::new();
    html.push_str("<div class=\"");
    html.push_str(SCOPE_CLASS);
    html.push_str("\" style=\"");
    html.push_str(WRAPPER_STYLE);
    html.push_str("\">");

    for link_path in &links {
        match container.stylesheet_by_path(link_path) {
            Some(sheet) => {
                let mut seen = vec![];
                inline_stylesheet(sheet, container, &mut html, &mut seen);
            }
            None => warn!(
                "page {} links stylesheet {} not present in container",
                page.path, link_path
            ),
        }
    }

    html.push_str("<style>");
    html.push_str(SIZING_RULES);
    html.push_str("</style>");

    body.serialize_children_into(&mut html);
    html.push_str("</div>");

    Ok(html)
}

/// Emits a stylesheet's transitive imports (deepest first), then the
/// stylesheet itself, each in its own `<style>` tag. `seen` guards
/// against import cycles within one link's cascade.
fn inline_stylesheet(
    sheet: &Stylesheet,
    container: &EbookContainer,
    html: &mut String,
    seen: &mut Vec<String>,
) {
    if seen.iter().any(|p| p == &sheet.item.path) {
        return;
    }
    seen.push(sheet.item.path.clone());

    for imported in css::resolve_imports(&sheet.style, &container.stylesheets) {
        inline_stylesheet(imported, container, html, seen);
    }

    html.push_str("<style>");
    html.push_str(&sheet.style);
    html.push_str("</style>");
}

/// Stylesheet link targets in document order, resolved against the
/// page's own directory (which may differ from where the stylesheet is
/// stored).
fn collect_stylesheet_links(doc: &XmlNode, page_dir: &str) -> Vec<String> {
    let mut out = vec![];
    walk_links(doc, page_dir, &mut out);
    out
}

fn walk_links(node: &XmlNode, page_dir: &str, out: &mut Vec<String>) {
    if node.local_name() == "link" && is_stylesheet_link(node) {
        if let Some(href) = node.get_attr("href") {
            out.push(paths::join(page_dir, href));
        }
    }
    for child in &node.children {
        if let XmlContent::Element(el) = child {
            walk_links(el, page_dir, out);
        }
    }
}

fn is_stylesheet_link(node: &XmlNode) -> bool {
    let rel_ok = node
        .get_attr("rel")
        .is_some_and(|rel| rel.eq_ignore_ascii_case("stylesheet"));
    let type_ok = node
        .get_attr("type")
        .map_or(true, |t| t.eq_ignore_ascii_case("text/css"));
    rel_ok && type_ok
}

/// Single-pass visitor over the body subtree: tags `<svg>`/`<img>`/
/// `<image>` with the sizing classes and points image sources at the
/// resource endpoint.
fn rewrite_media_elements(node: &mut XmlNode, page_dir: &str, urls: &UrlContext) {
    for child in &mut node.children {
        let XmlContent::Element(el) = child else {
            continue;
        };
        match el.local_name() {
            "svg" => append_class(el, SVG_SCALE_CLASS),
            "img" | "image" => {
                append_class(el, IMAGE_SCALE_CLASS);
                rewrite_image_source(el, page_dir, urls);
            }
            _ => {}
        }
        rewrite_media_elements(el, page_dir, urls);
    }
}

fn rewrite_image_source(el: &mut XmlNode, page_dir: &str, urls: &UrlContext) {
    let (attr, value) = if let Some(src) = el.get_attr("src") {
        ("src", src.to_string())
    } else if let Some(href) = el.get_attr("xlink:href") {
        ("xlink:href", href.to_string())
    } else {
        warn!("<{}> element with no src or xlink:href, leaving as is", el.name);
        return;
    };

    // external and inline references stay untouched
    if value.starts_with("http") || value.starts_with("data:") {
        return;
    }

    let resolved = paths::join(page_dir, &value);
    el.set_attr(attr, &urls.resource_url(&resolved));
}

fn append_class(el: &mut XmlNode, class: &str) {
    let merged = match el.get_attr("class") {
        Some(existing) if existing.split_whitespace().any(|c| c == class) => return,
        Some(existing) => format!("{} {}", existing, class),
        None => class.to_string(),
    };
    el.set_attr("class", &merged);
}
