//! End-to-end retrieval of files written to a temporary directory.

use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;

use asset_retriever::{
    Asset, AssetRetrieveError, AssetRetriever, Format, FormatHints, FormatSpecification,
    MediaType, ReadError, Resource,
};
use tempfile::TempDir;
use url::Url;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

fn zip_archive(entries: &[(&str, &[u8])], options: SimpleFileOptions) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (path, data) in entries {
        if path.ends_with('/') {
            writer.add_directory(*path, options).unwrap();
        } else {
            writer.start_file(*path, options).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

fn deflated() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn write_file(directory: &TempDir, name: &str, data: &[u8]) -> Url {
    let path = directory.path().join(name);
    std::fs::write(&path, data).unwrap();
    Url::from_file_path(&path).unwrap()
}

async fn retrieve(url: &Url) -> Result<Asset, AssetRetrieveError> {
    AssetRetriever::default()
        .retrieve(url, FormatHints::new())
        .await
}

#[tokio::test]
async fn test_epub_file() {
    let directory = tempfile::tempdir().unwrap();
    let data = zip_archive(
        &[
            ("mimetype", b"application/epub+zip"),
            ("META-INF/", b""),
            ("META-INF/container.xml", b"<container/>"),
            ("OEBPS/chapter1.xhtml", b"<html>Call me Ishmael.</html>"),
        ],
        deflated(),
    );
    // The extension says nothing: the content decides
    let url = write_file(&directory, "download.bin", &data);

    let asset = retrieve(&url).await.unwrap();
    assert_eq!(&Format::epub(), asset.format());

    let container = asset.container().unwrap();
    assert_eq!(Some(&url), container.source_url());
    let paths: Vec<&str> = container.entries().iter().map(|e| e.as_str()).collect();
    assert_eq!(
        vec!["META-INF/container.xml", "OEBPS/chapter1.xhtml", "mimetype"],
        paths
    );

    let chapter = container.get_path("OEBPS/chapter1.xhtml").unwrap();
    assert_eq!(b"Call me".to_vec(), chapter.read(Some(6..13)).await.unwrap());
    assert!(container.get_path("OEBPS/missing.xhtml").is_none());
}

#[tokio::test]
async fn test_scenario_archive() {
    let directory = tempfile::tempdir().unwrap();
    let a_txt: &[u8] = b"0123456789";
    let c_txt: &[u8] = b"cccccccccccccccccccc";

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    writer.start_file("a.txt", stored).unwrap();
    writer.write_all(a_txt).unwrap();
    writer.add_directory("b/", stored).unwrap();
    writer.start_file("b/c.txt", deflated()).unwrap();
    writer.write_all(c_txt).unwrap();
    let data = writer.finish().unwrap().into_inner();
    let url = write_file(&directory, "scenario.zip", &data);

    let asset = retrieve(&url).await.unwrap();
    assert_eq!(&Format::zip(), asset.format());
    let container = asset.container().unwrap();
    let paths: Vec<&str> = container.entries().iter().map(|e| e.as_str()).collect();
    assert_eq!(vec!["a.txt", "b/c.txt"], paths);

    let a = container.get_path("a.txt").unwrap();
    assert_eq!(a_txt.to_vec(), a.read(None).await.unwrap());
    assert_eq!(a_txt[2..5].to_vec(), a.read(Some(2..5)).await.unwrap());

    let c = container.get_path("b/c.txt").unwrap();
    let properties = c.properties().await.unwrap();
    let entry = properties.archive_entry.unwrap();
    assert!(entry.is_entry_compressed);
    assert!(entry.entry_length < c_txt.len() as u64);
    assert_eq!(c_txt.to_vec(), c.read(None).await.unwrap());
}

#[tokio::test]
async fn test_zip64_records() {
    let directory = tempfile::tempdir().unwrap();
    let options = deflated().large_file(true);
    let data = zip_archive(&[("big/one.txt", b"one"), ("big/two.txt", b"two")], options);
    let url = write_file(&directory, "zip64.zip", &data);

    let asset = retrieve(&url).await.unwrap();
    let container = asset.container().unwrap();
    let two = container.get_path("big/two.txt").unwrap();
    assert_eq!(Some(3), two.estimated_length().await.unwrap());
    assert_eq!(b"two".to_vec(), two.read(None).await.unwrap());
}

#[tokio::test]
async fn test_pdf_with_explicit_media_type() {
    let directory = tempfile::tempdir().unwrap();
    let url = write_file(&directory, "report", b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n");

    let asset = AssetRetriever::default()
        .retrieve_with_media_type(&url, MediaType::PDF)
        .await
        .unwrap();
    assert!(!asset.is_container());
    assert_eq!(&Format::pdf(), asset.format());

    let resource = asset.resource().unwrap();
    assert_eq!(Some(15), resource.estimated_length().await.unwrap());
}

#[tokio::test]
async fn test_html_document() {
    let directory = tempfile::tempdir().unwrap();
    let url = write_file(
        &directory,
        "index",
        b"<!DOCTYPE html>\n<html lang=\"en\"><head><title>Moby Dick</title></head></html>",
    );

    let format = AssetRetriever::default()
        .sniff_format(&url, FormatHints::new())
        .await
        .unwrap();
    assert!(format.conforms_to(&FormatSpecification::HTML));
    assert_eq!(MediaType::HTML, format.media_type.to_string());
}

#[tokio::test]
async fn test_url_extension_is_a_hint() {
    let directory = tempfile::tempdir().unwrap();
    // Content no sniffer recognizes, but the name gives it away
    let url = write_file(&directory, "cover.png", b"truncated image");

    let asset = retrieve(&url).await.unwrap();
    assert!(asset.format().conforms_to(&FormatSpecification::BITMAP));

    // The same bytes under an unknown name are not supported
    let url = write_file(&directory, "cover", b"truncated image");
    assert!(matches!(
        retrieve(&url).await,
        Err(AssetRetrieveError::FormatNotSupported)
    ));
}

#[tokio::test]
async fn test_missing_file_is_an_access_error() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("nowhere.epub");
    let url = Url::from_file_path(&path).unwrap();

    let result = retrieve(&url).await;
    assert!(matches!(
        result,
        Err(AssetRetrieveError::Reading(ReadError::Access(_)))
    ));
}

#[tokio::test]
async fn test_sniffing_twice_gives_the_same_format() {
    let directory = tempfile::tempdir().unwrap();
    let data = zip_archive(&[("01.mp3", b"ID3"), ("02.mp3", b"ID3")], deflated());
    let url = write_file(&directory, "book.zip", &data);

    let retriever = AssetRetriever::default();
    let first = retriever.sniff_format(&url, FormatHints::new()).await.unwrap();
    let second = retriever.sniff_format(&url, FormatHints::new()).await.unwrap();
    assert_eq!(first, second);
    assert!(first.conforms_to(&FormatSpecification::INFORMAL_AUDIOBOOK));
}

#[tokio::test]
async fn test_entries_read_their_full_length() {
    let directory = tempfile::tempdir().unwrap();
    let large: Vec<u8> = (0..100_000u32).map(|i| (i % 7) as u8).collect();
    let data = zip_archive(
        &[("small.txt", b"small"), ("large.bin", &large[..]), ("empty.txt", b"")],
        deflated(),
    );
    let url = write_file(&directory, "lengths.zip", &data);

    let asset = retrieve(&url).await.unwrap();
    let container = asset.container().unwrap();
    for url in container.entries() {
        let resource: Arc<dyn Resource> = container.get(url).unwrap();
        let length = resource.estimated_length().await.unwrap().unwrap();
        assert_eq!(length as usize, resource.read(None).await.unwrap().len(), "{url}");
    }
}

#[tokio::test]
async fn test_local_paths_become_file_urls() {
    let directory = tempfile::tempdir().unwrap();
    let url = write_file(&directory, "Moby Dick.pdf", b"%PDF-1.4");
    let path = url.to_file_path().unwrap();
    assert!(Path::new(&path).exists());

    let asset = retrieve(&url).await.unwrap();
    assert_eq!(&Format::pdf(), asset.format());
}
