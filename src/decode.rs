//! Decode pipeline: file bytes in, pixels and metadata out.
//!
//! The manager only consumes the [`DecodePipeline`] trait; it is always
//! invoked from the background worker, never from a caller's thread.
//! [`FileDecodePipeline`] is the production implementation backed by the
//! `image` and `kamadak-exif` crates.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use tracing::trace;

use crate::error::Result;
use crate::record::{Metadata, MetadataField};

/// Decoded pixel data, RGB8, three bytes per pixel.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Synchronous, stateless decode steps consumed by the cache manager.
pub trait DecodePipeline: Send + Sync {
    /// Reads the raw file bytes for `path`.
    fn load_bytes(&self, path: &Path) -> Result<Vec<u8>>;

    /// Decodes image bytes to RGB8 pixel data.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage>;

    /// Extracts the metadata fields from the image bytes. Best effort:
    /// fields whose EXIF tags are missing stay unset, and an image without
    /// any EXIF block yields empty metadata.
    fn extract_metadata(&self, bytes: &[u8]) -> Metadata;
}

/// EXIF tag backing each [`MetadataField`], in `MetadataField::ALL` order.
const FIELD_TAGS: [(MetadataField, exif::Tag); 6] = [
    (MetadataField::Aperture, exif::Tag::ApertureValue),
    (MetadataField::ShutterSpeed, exif::Tag::ShutterSpeedValue),
    (MetadataField::Iso, exif::Tag::PhotographicSensitivity),
    (MetadataField::FocalLength, exif::Tag::FocalLength),
    (MetadataField::FlashFired, exif::Tag::Flash),
    (MetadataField::DateTime, exif::Tag::DateTimeOriginal),
];

/// Production pipeline reading from the filesystem.
#[derive(Debug, Default)]
pub struct FileDecodePipeline;

impl DecodePipeline for FileDecodePipeline {
    fn load_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(path)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage> {
        let img = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()? // sniff based on content
            .decode()?;
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        Ok(DecodedImage {
            width,
            height,
            pixels: rgb.into_raw(),
        })
    }

    fn extract_metadata(&self, bytes: &[u8]) -> Metadata {
        let mut metadata = Metadata::default();
        let mut cursor = Cursor::new(bytes);
        let Ok(exif_data) = exif::Reader::new().read_from_container(&mut cursor) else {
            trace!("no exif block found");
            return metadata;
        };

        for (field, tag) in FIELD_TAGS {
            if let Some(entry) = exif_data.get_field(tag, exif::In::PRIMARY) {
                let text = entry.display_value().with_unit(&exif_data).to_string();
                metadata.set(field, text);
            }
        }
        metadata
    }
}
