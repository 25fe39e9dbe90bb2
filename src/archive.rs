//! Manages the zip component part of the epub.
//!
//! Archive entry paths are always `/`-separated, as required by the ZIP
//! and EPUB specs, so entries are addressed by plain strings rather than
//! host paths.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Zip Error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("no such entry in archive: {0}")]
    EntryNotFound(String),
}

/// Epub archive struct. Stores the file path and the list of entries
/// in the zip archive.
pub struct EpubArchive {
    zip: zip::ZipArchive<BufReader<File>>,
    pub path: PathBuf,
    pub files: Vec<String>,
}

impl EpubArchive {
    /// Opens the epub file in `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the zip is broken or if the file doesn't
    /// exist.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let zip = zip::ZipArchive::new(BufReader::new(file))?;
        let files: Vec<String> = zip.file_names().map(String::from).collect();

        Ok(Self {
            zip,
            path: path.to_path_buf(),
            files,
        })
    }

    /// Returns the content of the entry at `name` as `Vec<u8>`.
    ///
    /// Entry names that were stored percent-encoded resolve too: if the
    /// literal name misses, the percent-decoded form is tried before
    /// giving up.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::EntryNotFound`] if neither form exists in
    /// the zip archive.
    pub fn get_entry(&mut self, name: &str) -> Result<Vec<u8>, ArchiveError> {
        match read_by_name(&mut self.zip, name) {
            Ok(entry) => Ok(entry),
            Err(zip::result::ZipError::FileNotFound) => {
                let decoded = percent_decode_str(name).decode_utf8_lossy().to_string();
                if decoded != name {
                    if let Ok(entry) = read_by_name(&mut self.zip, &decoded) {
                        return Ok(entry);
                    }
                }
                Err(ArchiveError::EntryNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the content of the entry at `name` as UTF-8 `String`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry doesn't exist or isn't valid UTF-8.
    pub fn get_entry_as_str(&mut self, name: &str) -> Result<String, ArchiveError> {
        let bytes = self.get_entry(name)?;
        String::from_utf8(bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
    }

    /// Returns the content of the container file "META-INF/container.xml".
    ///
    /// # Errors
    ///
    /// Returns an error if the epub doesn't have the container file.
    pub fn get_container_file(&mut self) -> Result<Vec<u8>, ArchiveError> {
        self.get_entry("META-INF/container.xml")
    }
}

fn read_by_name(
    zip: &mut zip::ZipArchive<BufReader<File>>,
    name: &str,
) -> Result<Vec<u8>, zip::result::ZipError> {
    let mut entry = vec![];
    let mut zipfile = zip.by_name(name)?;
    zipfile.read_to_end(&mut entry)?;
    Ok(entry)
}
