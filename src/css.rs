//! Stylesheet rewriting.
//!
//! Epub stylesheets are written for a standalone document; embedding
//! several pages in one host page needs every rule scoped under the
//! containment class and every `url()`/`@import` reference turned into
//! something resolvable outside the archive. The scanner works on
//! top-level constructs only: plain rules get their selectors prefixed,
//! `@font-face` gets its `src` pointed at the resource endpoint,
//! `@import` targets are resolved to archive paths, and every other
//! at-rule passes through verbatim.

use log::warn;
use regex::{NoExpand, Regex};

use crate::container::Stylesheet;
use crate::paths;
use crate::urls::UrlContext;
use crate::SCOPE_CLASS;

const URL_PATTERN: &str = r#"url\(\s*['"]?([^'")]+)['"]?\s*\)"#;
const IMPORT_PATTERN: &str = r#"@import\s+(?:url\(\s*)?["']?([^"'();\s]+)["']?"#;

#[derive(Debug, thiserror::Error)]
pub enum CssError {
    #[error("expected '{{' after selector at byte {0}")]
    MissingBlock(usize),
    #[error("unclosed block starting at byte {0}")]
    UnclosedBlock(usize),
    #[error("Regex Error: {0}")]
    Regex(#[from] regex::Error),
}

/// Rewrites a raw stylesheet so it can be inlined next to other pages'
/// styles in a host document.
///
/// Selectors are scoped under the containment class, with the literal
/// `body` selector becoming the containment class itself. `@font-face`
/// `src` values starting with `url(...)` get their first url token
/// pointed at the resource-fetch endpoint, resolved against the
/// stylesheet's own directory. `@import` targets are resolved to
/// archive-relative paths but not fetched; they are matched against the
/// container's stylesheet set at render time.
///
/// # Errors
///
/// Returns a [`CssError`] when the stylesheet cannot be scanned into
/// rules; the caller decides whether to drop it or propagate.
pub fn rewrite_stylesheet(
    raw: &str,
    stylesheet_path: &str,
    urls: &UrlContext,
) -> Result<String, CssError> {
    let url_re = Regex::new(URL_PATTERN)?;
    let import_re = Regex::new(IMPORT_PATTERN)?;
    let css_dir = paths::dirname(stylesheet_path);

    let bytes = raw.as_bytes();
    let mut pos = 0;
    let mut out = String::new();

    while pos < bytes.len() {
        pos = skip_ws_comments(bytes, pos);
        if pos >= bytes.len() {
            break;
        }

        let rendered = if bytes[pos] == b'@' {
            let (text, next) = rewrite_at_rule(raw, pos, css_dir, urls, &url_re, &import_re)?;
            pos = next;
            text
        } else {
            let (text, next) = rewrite_plain_rule(raw, pos)?;
            pos = next;
            text
        };

        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&rendered);
    }

    Ok(out)
}

/// Finds, for each `@import` in an already-rewritten stylesheet, the
/// matching stylesheet object by exact path equality. Targets with no
/// match are logged and skipped.
pub fn resolve_imports<'a>(css: &str, stylesheets: &'a [Stylesheet]) -> Vec<&'a Stylesheet> {
    let import_re = match Regex::new(IMPORT_PATTERN) {
        Ok(re) => re,
        Err(e) => {
            warn!("import pattern failed to compile: {}", e);
            return vec![];
        }
    };

    let mut resolved = vec![];
    for cap in import_re.captures_iter(css) {
        let target = &cap[1];
        match stylesheets.iter().find(|s| s.item.path == target) {
            Some(sheet) => resolved.push(sheet),
            None => warn!("@import target {} matches no stylesheet", target),
        }
    }
    resolved
}

fn rewrite_plain_rule(css: &str, pos: usize) -> Result<(String, usize), CssError> {
    let bytes = css.as_bytes();
    let brace = scan_to_byte(bytes, pos, b'{').ok_or(CssError::MissingBlock(pos))?;
    let end = scan_to_byte(bytes, brace + 1, b'}').ok_or(CssError::UnclosedBlock(brace))?;

    let selectors = css[pos..brace]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(scope_selector)
        .collect::<Vec<_>>()
        .join(", ");
    let decls = css[brace + 1..end].trim();

    Ok((format!("{}{{{}}}", selectors, decls), end + 1))
}

/// `body` rules apply to the injected container div, every other
/// selector is scoped beneath it.
fn scope_selector(selector: &str) -> String {
    if selector == "body" {
        format!(".{}", SCOPE_CLASS)
    } else {
        format!(".{} {}", SCOPE_CLASS, selector)
    }
}

fn rewrite_at_rule(
    css: &str,
    pos: usize,
    css_dir: &str,
    urls: &UrlContext,
    url_re: &Regex,
    import_re: &Regex,
) -> Result<(String, usize), CssError> {
    let bytes = css.as_bytes();
    let keyword = at_keyword(bytes, pos);

    match keyword.as_str() {
        "import" => {
            let end = scan_to_byte(bytes, pos, b';').unwrap_or(bytes.len() - 1);
            let statement = &css[pos..=end.min(bytes.len() - 1)];
            let rendered = match import_re.captures(statement) {
                Some(cap) => {
                    let resolved = paths::join(css_dir, cap[1].trim());
                    format!("@import \"{}\";", resolved)
                }
                None => {
                    warn!("unparseable @import statement: {}", statement.trim());
                    statement.to_string()
                }
            };
            Ok((rendered, end + 1))
        }
        "font-face" => {
            let brace = scan_to_byte(bytes, pos, b'{').ok_or(CssError::MissingBlock(pos))?;
            let end = scan_to_byte(bytes, brace + 1, b'}').ok_or(CssError::UnclosedBlock(brace))?;
            let rendered = rewrite_font_face(&css[brace + 1..end], css_dir, urls, url_re);
            Ok((rendered, end + 1))
        }
        _ => {
            // @media, @charset, @namespace, ... pass through untouched
            let end = skip_at_rule(bytes, pos)?;
            Ok((css[pos..end].trim_end().to_string(), end))
        }
    }
}

fn rewrite_font_face(decls: &str, css_dir: &str, urls: &UrlContext, url_re: &Regex) -> String {
    let mut parts: Vec<String> = vec![];

    for decl in decls.split(';') {
        let decl = decl.trim();
        if decl.is_empty() {
            continue;
        }
        let Some(colon) = decl.find(':') else {
            parts.push(decl.to_string());
            continue;
        };
        let name = decl[..colon].trim();
        let value = decl[colon + 1..].trim();

        if name.eq_ignore_ascii_case("src") && value.starts_with("url(") {
            if let Some(cap) = url_re.captures(value) {
                let resolved = paths::join(css_dir, cap[1].trim());
                let endpoint = format!("url({})", urls.resource_url(&resolved));
                // only the first url() token on the value is rewritten
                let rewritten = url_re.replace(value, NoExpand(&endpoint));
                parts.push(format!("{}:{}", name, rewritten));
                continue;
            }
        }
        parts.push(format!("{}:{}", name, value));
    }

    format!("@font-face{{{}}}", parts.join(";"))
}

fn at_keyword(css: &[u8], pos: usize) -> String {
    let start = pos + 1;
    let mut end = start;
    while end < css.len() && (css[end].is_ascii_alphanumeric() || css[end] == b'-') {
        end += 1;
    }
    String::from_utf8_lossy(&css[start..end]).to_ascii_lowercase()
}

/// Consume an at-rule starting at `pos`: either a statement ending at
/// `;` or a block with nested braces. Returns the position just past it.
fn skip_at_rule(css: &[u8], pos: usize) -> Result<usize, CssError> {
    let mut p = pos + 1;
    while p < css.len() {
        match css[p] {
            b';' => return Ok(p + 1),
            b'{' => return skip_block(css, p),
            b'"' | b'\'' => {
                p = skip_string(css, p).ok_or(CssError::UnclosedBlock(pos))?;
            }
            b'/' if css.get(p + 1) == Some(&b'*') => {
                p = find_comment_end(css, p + 2).unwrap_or(css.len());
            }
            _ => p += 1,
        }
    }
    Ok(css.len())
}

/// Consumes the brace block opening at `open`, nested blocks included.
/// Braces inside strings and comments don't count toward nesting.
fn skip_block(css: &[u8], open: usize) -> Result<usize, CssError> {
    let mut depth = 0u32;
    let mut p = open;
    while p < css.len() {
        match css[p] {
            b'{' => {
                depth += 1;
                p += 1;
            }
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(p + 1);
                }
                p += 1;
            }
            b'"' | b'\'' => {
                p = skip_string(css, p).ok_or(CssError::UnclosedBlock(open))?;
            }
            b'/' if css.get(p + 1) == Some(&b'*') => {
                p = find_comment_end(css, p + 2).ok_or(CssError::UnclosedBlock(open))?;
            }
            _ => p += 1,
        }
    }
    Err(CssError::UnclosedBlock(open))
}

fn skip_ws_comments(css: &[u8], mut pos: usize) -> usize {
    loop {
        while pos < css.len() && css[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos + 1 < css.len() && css[pos] == b'/' && css[pos + 1] == b'*' {
            match find_comment_end(css, pos + 2) {
                Some(end) => pos = end,
                // unterminated comment swallows the rest
                None => return css.len(),
            }
        } else {
            break;
        }
    }
    pos
}

fn find_comment_end(css: &[u8], mut pos: usize) -> Option<usize> {
    while pos + 1 < css.len() {
        if css[pos] == b'*' && css[pos + 1] == b'/' {
            return Some(pos + 2);
        }
        pos += 1;
    }
    None
}

/// Position of the next `needle` from `pos`, stepping over quoted
/// strings and comments so braces and semicolons inside them don't
/// terminate a rule. `None` when the needle is missing or a string or
/// comment never closes.
fn scan_to_byte(css: &[u8], mut pos: usize, needle: u8) -> Option<usize> {
    while pos < css.len() {
        match css[pos] {
            b if b == needle => return Some(pos),
            b'"' | b'\'' => pos = skip_string(css, pos)?,
            b'/' if css.get(pos + 1) == Some(&b'*') => {
                pos = find_comment_end(css, pos + 2)?;
            }
            _ => pos += 1,
        }
    }
    None
}

/// Consumes the string literal opening at `pos`, honoring backslash
/// escapes. `None` when the closing quote is missing.
fn skip_string(css: &[u8], pos: usize) -> Option<usize> {
    let quote = css[pos];
    let mut p = pos + 1;
    while p < css.len() {
        match css[p] {
            b'\\' => p += 2,
            b if b == quote => return Some(p + 1),
            _ => p += 1,
        }
    }
    None
}
