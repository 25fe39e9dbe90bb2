//! POSIX-style path arithmetic for archive entry names.
//!
//! Zip entry names are `/`-separated on every host OS, so these helpers
//! work on plain strings and never touch `std::path`.

/// Directory part of an archive path, without the trailing slash.
/// Returns the empty string for top-level entries.
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[..pos],
        None => "",
    }
}

/// Final component of an archive path.
pub fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Joins `href` onto `dir` and normalizes `.`/`..`/empty segments.
///
/// Idempotent: an `href` that already lives under `dir` is returned
/// normalized but not prefixed again.
pub fn join(dir: &str, href: &str) -> String {
    let combined = if dir.is_empty() || href.starts_with(&format!("{}/", dir)) {
        href.to_string()
    } else {
        format!("{}/{}", dir, href)
    };
    normalize(&combined)
}

fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            ".." => {
                parts.pop();
            }
            "." | "" => {}
            _ => parts.push(part),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_relative() {
        assert_eq!("OEBPS/text/ch1.xhtml", join("OEBPS", "text/ch1.xhtml"));
        assert_eq!("ch1.xhtml", join("", "ch1.xhtml"));
    }

    #[test]
    fn join_parent_segments() {
        assert_eq!("OEBPS/css/style.css", join("OEBPS/text", "../css/style.css"));
        assert_eq!("style.css", join("OEBPS", "../../style.css"));
    }

    #[test]
    fn join_is_idempotent() {
        let once = join("OEBPS", "text/ch1.xhtml");
        assert_eq!(once, join("OEBPS", &once));
    }

    #[test]
    fn dirname_and_basename() {
        assert_eq!("OEBPS/text", dirname("OEBPS/text/ch1.xhtml"));
        assert_eq!("", dirname("content.opf"));
        assert_eq!("ch1.xhtml", basename("OEBPS/text/ch1.xhtml"));
        assert_eq!("content.opf", basename("content.opf"));
    }
}
