use base64::Engine;
use image::{ImageFormat, RgbImage};
use previous_images::decode::{DecodePipeline, FileDecodePipeline};
use previous_images::{CacheConfig, MetadataField, PreviousImagesManager, RequestKind};

use std::io::Cursor;
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

// JPEG 2x1 with an EXIF block (orientation tag only), base64 encoded.
const EXIF_JPEG: &str = concat!(
    "/9j/4AAQSkZJRgABAQAAAQABAAD/4QAiRXhpZgAATU0AKgAAAAgAAQESAAMAAAABAAYAAAAAAAD/2wBDAAgGBgcGBQgHBwcJCQgKDBQNDAsLDBkSEw8UHRofHh0aHBwgJC4nICIsIxwcKDcpLDAxNDQ0Hyc5PTgyPC4zNDL/",
    "2wBDAQkJCQwLDBgNDRgyIRwhMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjL/wAARCAABAAIDASIAAhEBAxEB/8QAHwAAAQUBAQEBAQEAAAAAAAAAAAECAwQFBgcICQoL/8QAtRAAAgEDAwIEAwUFBAQAAAF9AQIDAAQRBRIhMUEGE1FhByJxFDKBkaEII0KxwRVS0fAkM2JyggkKFhcYGRolJicoKSo0NTY3ODk6Q0RFRkdISUpTVFVWV1hZWmNkZWZnaGlqc3R1dnd4eXqDhIWGh4iJipKTlJWWl5iZmqKjpKWmp6ipqrKztLW2t7i5usLDxMXGx8jJytLT1NXW19jZ2uHi4+Tl5ufo6erx8vP09fb3+Pn6/8QAHwEAAwEBAQEBAQEBAQAAAAAAAAECAwQFBgcICQoL/8QAtREAAgECBAQDBAcFBAQAAQJ3AAECAxEEBSExBhJBUQdhcRMiMoEIFEKRobHBCSMzUvAVYnLRChYkNOEl8RcYGRomJygpKjU2Nzg5OkNERUZHSElKU1RVVldYWVpjZGVmZ2hpanN0dXZ3eHl6goOEhYaHiImKkpOUlZaXmJmaoqOkpaanqKmqsrO0tba3uLm6wsPExcbHyMnK0tPU1dbX2Nna4uPk5ebn6Onq8vP09fb3+Pn6/9oADAMBAAIRAxEAPwDi6KKK+ZP3E//Z"
);

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
    let img = RgbImage::from_pixel(width, height, image::Rgb([200, 100, 50]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, out.into_inner()).unwrap();
    path
}

#[test]
fn reads_and_decodes_a_real_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "capture.png", 4, 2);

    let pipeline = FileDecodePipeline;
    let bytes = pipeline.load_bytes(&path).unwrap();
    let decoded = pipeline.decode(&bytes).unwrap();
    assert_eq!((decoded.width, decoded.height), (4, 2));
    assert_eq!(decoded.pixels.len(), 4 * 2 * 3);
    assert_eq!(&decoded.pixels[..3], &[200, 100, 50]);
}

#[test]
fn exif_jpeg_without_capture_tags_yields_empty_metadata() {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(EXIF_JPEG)
        .unwrap();

    let pipeline = FileDecodePipeline;
    let decoded = pipeline.decode(&bytes).unwrap();
    assert_eq!((decoded.width, decoded.height), (2, 1));

    // EXIF block present, but none of the capture-settings tags are.
    let metadata = pipeline.extract_metadata(&bytes);
    for field in MetadataField::ALL {
        assert_eq!(metadata.get(field), None);
    }
}

#[test]
fn manager_round_trip_with_the_filesystem_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "img_0001.png", 3, 3);

    let manager = PreviousImagesManager::new(CacheConfig::default()).unwrap();
    manager.add_new_image(&path);

    let (tx, rx) = mpsc::channel();
    manager.request(RequestKind::Last, None, move |record| {
        let _ = tx.send(record);
    });

    let record = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("timeout waiting for decode of real file");
    assert_eq!(record.filename(), path);
    let payload = record.payload().unwrap();
    assert_eq!((payload.width, payload.height), (3, 3));
    assert!(payload.metadata.is_empty());
}

#[test]
fn missing_file_leaves_the_record_unavailable() {
    let manager = PreviousImagesManager::new(CacheConfig::default()).unwrap();
    manager.add_new_image("/nonexistent/img_9999.jpg");

    let (tx, rx) = mpsc::channel();
    manager.request(RequestKind::Last, None, move |record| {
        let _ = tx.send(record);
    });
    assert!(
        rx.recv_timeout(Duration::from_millis(500)).is_err(),
        "no callback may fire for a file that cannot be read"
    );
    assert!(manager.images_available());
}
