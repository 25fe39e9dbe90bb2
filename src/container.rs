//! Manages the epub container.
//!
//! Opens the archive, reads `META-INF/container.xml` to locate the
//! package document, and parses the OPF manifest and spine into an
//! immutable [`EbookContainer`]: an ordered page list plus a stylesheet
//! and resource inventory. Callers are expected to build one container
//! per book and cache it for the reading session; rendering never
//! mutates it.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::archive::{ArchiveError, EpubArchive};
use crate::css;
use crate::paths;
use crate::urls::UrlContext;
use crate::xmlutils::{XmlContent, XmlError, XmlNode};

#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("Archive Error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("XML Error: {0}")]
    Xml(#[from] XmlError),
    #[error("malformed META-INF/container.xml: {0}")]
    MalformedContainer(String),
    #[error("package document not readable: {0}")]
    MissingPackageDocument(String),
    #[error("package document has no {0} element")]
    InvalidPackage(&'static str),
}

/// One entry of the OPF manifest. `path` is the archive entry name,
/// POSIX-joined from the package directory and the declared href.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub path: String,
    pub media_type: String,
}

/// A `text/css` manifest item together with its rewritten style text.
#[derive(Debug, Clone)]
pub struct Stylesheet {
    pub item: ManifestItem,
    /// Scoped and url-rewritten CSS, ready for inlining in a `<style>`
    /// tag.
    pub style: String,
}

/// A manifest item that is neither a spine page nor a stylesheet:
/// images, fonts and whatever else the book carries.
#[derive(Debug, Clone)]
pub struct Resource {
    pub item: ManifestItem,
    pub file_name: String,
}

/// The `{ title, pages }` pair the serving layer exposes as book info.
/// The title is caller-supplied metadata; only the page count comes
/// from the container.
#[derive(Debug, Clone)]
pub struct BookInfo {
    pub title: Option<String>,
    pub pages: usize,
}

/// Parsed epub container. Immutable once built; safe to share across
/// concurrent render calls.
#[derive(Debug, Clone)]
pub struct EbookContainer {
    /// Absolute path of the archive on disk. Each top-level operation
    /// reopens it; there is no long-lived file handle.
    pub filepath: PathBuf,

    /// Version attribute of the OPF package element.
    pub epub_version: String,

    /// Directory inside the archive containing the OPF; manifest hrefs
    /// resolve relative to this.
    pub package_dir: String,

    /// Spine pages in exact spine document order. This ordering defines
    /// reading order and must not be re-sorted.
    pub pages: Vec<ManifestItem>,

    /// Manifest stylesheets, already rewritten for scoped inlining.
    pub stylesheets: Vec<Stylesheet>,

    /// Remaining manifest items, keyed for resource serving.
    pub resources: Vec<Resource>,
}

impl EbookContainer {
    /// Opens the epub at `path` and parses it into a container.
    ///
    /// `urls` supplies the book id and token embedded into font URLs in
    /// the rewritten stylesheets, so a container is bound to the session
    /// it was parsed for.
    ///
    /// Unmatched spine idrefs and stylesheets that fail to rewrite are
    /// logged and dropped; a malformed book still renders its other
    /// pages.
    ///
    /// # Errors
    ///
    /// Archive open failures propagate as [`ContainerError::Archive`].
    /// A missing or unparseable `META-INF/container.xml` yields
    /// [`ContainerError::MalformedContainer`]; a rootfile path that does
    /// not resolve to a readable entry yields
    /// [`ContainerError::MissingPackageDocument`].
    pub fn parse<P: AsRef<Path>>(path: P, urls: &UrlContext) -> Result<Self, ContainerError> {
        let mut archive = EpubArchive::new(&path)?;

        let container_xml = archive
            .get_container_file()
            .map_err(|e| ContainerError::MalformedContainer(e.to_string()))?;
        let container = XmlNode::parse(&container_xml)
            .map_err(|e| ContainerError::MalformedContainer(e.to_string()))?;
        let opf_path = container
            .find("rootfile")
            .and_then(|n| n.get_attr("full-path"))
            .map(String::from)
            .ok_or_else(|| {
                ContainerError::MalformedContainer("no rootfile full-path".to_string())
            })?;

        let package_dir = paths::dirname(&opf_path).to_string();

        let opf_xml = archive
            .get_entry(&opf_path)
            .map_err(|_| ContainerError::MissingPackageDocument(opf_path.clone()))?;
        let package = XmlNode::parse(&opf_xml)?;
        let epub_version = package.get_attr("version").unwrap_or_default().to_string();

        // working list of manifest items; spine matches are moved out
        let mut remaining = collect_manifest_items(&package)?;

        let spine = package
            .find("spine")
            .ok_or(ContainerError::InvalidPackage("spine"))?;
        let mut pages = vec![];
        for child in &spine.children {
            let XmlContent::Element(itemref) = child else {
                continue;
            };
            if itemref.local_name() != "itemref" {
                continue;
            }
            let Some(idref) = itemref.get_attr("idref") else {
                warn!("spine itemref without idref, skipping");
                continue;
            };
            match remaining.iter().position(|(id, _, _)| id == idref) {
                Some(pos) => {
                    let (id, href, media_type) = remaining.remove(pos);
                    pages.push(make_item(id, href, media_type, &package_dir));
                }
                None => warn!("spine idref {} has no manifest item, skipping", idref),
            }
        }

        let mut stylesheets = vec![];
        let mut resources = vec![];
        for (id, href, media_type) in remaining {
            let item = make_item(id, href, media_type, &package_dir);
            if item.media_type == "text/css" {
                let raw = match archive.get_entry_as_str(&item.path) {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!("stylesheet {} unreadable, dropping: {}", item.path, e);
                        continue;
                    }
                };
                match css::rewrite_stylesheet(&raw, &item.path, urls) {
                    Ok(style) => stylesheets.push(Stylesheet { item, style }),
                    Err(e) => warn!("stylesheet {} failed to rewrite, dropping: {}", item.path, e),
                }
            } else {
                let file_name = paths::basename(&item.path).to_string();
                resources.push(Resource { item, file_name });
            }
        }

        debug!(
            "parsed {}: {} pages, {} stylesheets, {} resources",
            opf_path,
            pages.len(),
            stylesheets.len(),
            resources.len()
        );

        Ok(Self {
            filepath: path.as_ref().to_path_buf(),
            epub_version,
            package_dir,
            pages,
            stylesheets,
            resources,
        })
    }

    /// Number of spine pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Book-info façade value; `title` is caller-supplied metadata.
    pub fn book_info(&self, title: Option<String>) -> BookInfo {
        BookInfo {
            title,
            pages: self.page_count(),
        }
    }

    /// Finds a stylesheet by its archive path, the join key `@import`
    /// resolution uses.
    pub fn stylesheet_by_path(&self, path: &str) -> Option<&Stylesheet> {
        self.stylesheets.iter().find(|s| s.item.path == path)
    }

    /// Declared media type of the manifest item at `path`, if any.
    pub fn media_type(&self, path: &str) -> Option<&str> {
        self.pages
            .iter()
            .chain(self.stylesheets.iter().map(|s| &s.item))
            .chain(self.resources.iter().map(|r| &r.item))
            .find(|item| item.path == path)
            .map(|item| item.media_type.as_str())
    }

    /// Reads the archive entry at `path` for on-demand resource
    /// serving, along with its manifest media type when declared.
    ///
    /// The archive handle is scoped to this call.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive can't be reopened or the entry
    /// doesn't exist.
    pub fn read_resource(&self, path: &str) -> Result<(Vec<u8>, Option<String>), ArchiveError> {
        let mut archive = EpubArchive::new(&self.filepath)?;
        let bytes = archive.get_entry(path)?;
        Ok((bytes, self.media_type(path).map(String::from)))
    }
}

type RawItem = (String, String, String);

fn collect_manifest_items(package: &XmlNode) -> Result<Vec<RawItem>, ContainerError> {
    let manifest = package
        .find("manifest")
        .ok_or(ContainerError::InvalidPackage("manifest"))?;

    let mut items = vec![];
    for child in &manifest.children {
        let XmlContent::Element(el) = child else {
            continue;
        };
        if el.local_name() != "item" {
            continue;
        }
        match (el.get_attr("id"), el.get_attr("href"), el.get_attr("media-type")) {
            (Some(id), Some(href), Some(media_type)) => {
                items.push((id.to_string(), href.to_string(), media_type.to_string()));
            }
            _ => warn!("manifest item missing id/href/media-type, skipping"),
        }
    }
    Ok(items)
}

fn make_item(id: String, href: String, media_type: String, package_dir: &str) -> ManifestItem {
    let path = paths::join(package_dir, &href);
    ManifestItem {
        id,
        href,
        path,
        media_type,
    }
}
