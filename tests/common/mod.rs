//! Shared fixture building: synthesizes real epub archives on disk so
//! the tests exercise the whole zip/xml path.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Writes `entries` into a fresh epub-shaped zip on disk and returns
/// the temp file handle (the archive lives as long as the handle).
pub fn build_epub(entries: &[(&str, &str)]) -> NamedTempFile {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);

        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();

        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, content) in entries {
            zip.start_file(*name, deflated).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), cursor.into_inner()).unwrap();
    file
}

pub const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

pub const CONTENT_OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package version="3.0" xmlns="http://www.idpf.org/2007/opf" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Fixture Book</dc:title>
  </metadata>
  <manifest>
    <item id="ch1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch2" href="text/ch2.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch3" href="text/ch3.xhtml" media-type="application/xhtml+xml"/>
    <item id="css" href="css/style.css" media-type="text/css"/>
    <item id="shared" href="css/shared.css" media-type="text/css"/>
    <item id="cover" href="images/cover.jpg" media-type="image/jpeg"/>
  </manifest>
  <spine>
    <itemref idref="ch1"/>
    <itemref idref="ch2"/>
    <itemref idref="ch3"/>
  </spine>
</package>"#;

pub const STYLE_CSS: &str = "@import \"shared.css\";\nbody{color:red}\n.quote{margin:1em}";

pub const SHARED_CSS: &str = "p{font-size:12pt}";

pub const CH1_XHTML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <title>Chapter 1</title>
  <link rel="stylesheet" type="text/css" href="../css/style.css"/>
</head>
<body>
  <p class="quote">Hello there</p>
  <img src="images/cover.jpg"/>
</body>
</html>"#;

pub const CH2_XHTML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>Chapter 2</title></head>
<body>
  <svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">
    <image xlink:href="images/figure.png"/>
  </svg>
</body>
</html>"#;

pub const CH3_XHTML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>Chapter 3</title></head>
<body><p>The end.</p></body>
</html>"#;

/// A three-page book with a stylesheet cascade and an image resource.
pub fn basic_book() -> NamedTempFile {
    build_epub(&[
        ("META-INF/container.xml", CONTAINER_XML),
        ("OEBPS/content.opf", CONTENT_OPF),
        ("OEBPS/text/ch1.xhtml", CH1_XHTML),
        ("OEBPS/text/ch2.xhtml", CH2_XHTML),
        ("OEBPS/text/ch3.xhtml", CH3_XHTML),
        ("OEBPS/css/style.css", STYLE_CSS),
        ("OEBPS/css/shared.css", SHARED_CSS),
        ("OEBPS/images/cover.jpg", "not really a jpeg"),
        ("OEBPS/text/images/cover.jpg", "page-relative jpeg"),
    ])
}
