mod common;

use epub_render::container::{ContainerError, EbookContainer};
use epub_render::urls::UrlContext;

fn urls() -> UrlContext {
    UrlContext::new("book1", "tok")
}

#[test]
fn pages_follow_spine_order() {
    let book = common::basic_book();
    let container = EbookContainer::parse(book.path(), &urls()).unwrap();

    assert_eq!("3.0", container.epub_version);
    assert_eq!("OEBPS", container.package_dir);
    assert_eq!(3, container.page_count());
    let ids: Vec<&str> = container.pages.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(vec!["ch1", "ch2", "ch3"], ids);
    assert_eq!("OEBPS/text/ch1.xhtml", container.pages[0].path);
}

#[test]
fn manifest_partitioned_into_stylesheets_and_resources() {
    let book = common::basic_book();
    let container = EbookContainer::parse(book.path(), &urls()).unwrap();

    assert_eq!(2, container.stylesheets.len());
    let style = container.stylesheet_by_path("OEBPS/css/style.css").unwrap();
    assert!(style.style.contains(".abs-page-content{color:red}"));
    assert!(style.style.contains("@import \"OEBPS/css/shared.css\";"));

    assert_eq!(1, container.resources.len());
    let cover = &container.resources[0];
    assert_eq!("OEBPS/images/cover.jpg", cover.item.path);
    assert_eq!("cover.jpg", cover.file_name);
    assert_eq!("image/jpeg", cover.item.media_type);
}

#[test]
fn unmatched_spine_idref_is_skipped() {
    let opf = common::CONTENT_OPF.replace(
        "<itemref idref=\"ch2\"/>",
        "<itemref idref=\"ghost\"/>",
    );
    let book = common::build_epub(&[
        ("META-INF/container.xml", common::CONTAINER_XML),
        ("OEBPS/content.opf", &opf),
        ("OEBPS/text/ch1.xhtml", common::CH1_XHTML),
        ("OEBPS/text/ch3.xhtml", common::CH3_XHTML),
        ("OEBPS/css/style.css", common::STYLE_CSS),
        ("OEBPS/css/shared.css", common::SHARED_CSS),
    ]);

    let container = EbookContainer::parse(book.path(), &urls()).unwrap();
    let ids: Vec<&str> = container.pages.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(vec!["ch1", "ch3"], ids);
    // ch2 stays in the manifest leftovers, not in the page list
    assert!(container.resources.iter().any(|r| r.item.id == "ch2"));
}

#[test]
fn unrewritable_stylesheet_is_dropped() {
    let book = common::build_epub(&[
        ("META-INF/container.xml", common::CONTAINER_XML),
        ("OEBPS/content.opf", common::CONTENT_OPF),
        ("OEBPS/text/ch1.xhtml", common::CH1_XHTML),
        ("OEBPS/text/ch2.xhtml", common::CH2_XHTML),
        ("OEBPS/text/ch3.xhtml", common::CH3_XHTML),
        ("OEBPS/css/style.css", "p{color:red"),
        ("OEBPS/css/shared.css", common::SHARED_CSS),
    ]);

    let container = EbookContainer::parse(book.path(), &urls()).unwrap();
    assert_eq!(3, container.page_count());
    assert_eq!(1, container.stylesheets.len());
    assert!(container.stylesheet_by_path("OEBPS/css/style.css").is_none());
}

#[test]
fn missing_container_xml_is_malformed() {
    let book = common::build_epub(&[("OEBPS/content.opf", common::CONTENT_OPF)]);
    let err = EbookContainer::parse(book.path(), &urls()).unwrap_err();
    assert!(matches!(err, ContainerError::MalformedContainer(_)));
}

#[test]
fn unreadable_rootfile_is_missing_package_document() {
    let book = common::build_epub(&[("META-INF/container.xml", common::CONTAINER_XML)]);
    let err = EbookContainer::parse(book.path(), &urls()).unwrap_err();
    match err {
        ContainerError::MissingPackageDocument(path) => {
            assert_eq!("OEBPS/content.opf", path);
        }
        other => panic!("expected MissingPackageDocument, got {other:?}"),
    }
}

#[test]
fn book_info_facade() {
    let book = common::basic_book();
    let container = EbookContainer::parse(book.path(), &urls()).unwrap();

    let info = container.book_info(Some("Fixture Book".to_string()));
    assert_eq!(Some("Fixture Book".to_string()), info.title);
    assert_eq!(3, info.pages);
}

#[test]
fn read_resource_streams_bytes_with_media_type() {
    let book = common::basic_book();
    let container = EbookContainer::parse(book.path(), &urls()).unwrap();

    let (bytes, media_type) = container.read_resource("OEBPS/images/cover.jpg").unwrap();
    assert_eq!(b"not really a jpeg".as_slice(), bytes.as_slice());
    assert_eq!(Some("image/jpeg".to_string()), media_type);

    // entries outside the manifest still stream, just without a type
    let (bytes, media_type) = container
        .read_resource("OEBPS/text/images/cover.jpg")
        .unwrap();
    assert_eq!(b"page-relative jpeg".as_slice(), bytes.as_slice());
    assert_eq!(None, media_type);

    assert!(container.read_resource("OEBPS/nope.png").is_err());
}
