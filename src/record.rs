//! Cached representation of one previously captured image.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

/// Number of metadata fields; matches the variants of [`MetadataField`].
pub const METADATA_FIELD_COUNT: usize = 6;

/// The closed set of per-image metadata fields shown in the previous-images
/// view, each backed by one EXIF tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataField {
    /// Aperture setting used for the shot.
    Aperture,
    /// Shutter speed.
    ShutterSpeed,
    /// ISO setting.
    Iso,
    /// Focal length.
    FocalLength,
    /// Whether the flash fired.
    FlashFired,
    /// Date/time the image was taken.
    DateTime,
}

impl MetadataField {
    pub const ALL: [Self; METADATA_FIELD_COUNT] = [
        Self::Aperture,
        Self::ShutterSpeed,
        Self::Iso,
        Self::FocalLength,
        Self::FlashFired,
        Self::DateTime,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Fixed-size set of metadata texts, indexed by [`MetadataField`].
///
/// Extraction is best effort: a field whose EXIF tag is missing simply stays
/// unset, which is not an error.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    texts: [Option<String>; METADATA_FIELD_COUNT],
}

impl Metadata {
    pub fn get(&self, field: MetadataField) -> Option<&str> {
        self.texts[field.index()].as_deref()
    }

    pub fn set(&mut self, field: MetadataField, text: String) {
        self.texts[field.index()] = Some(text);
    }

    pub fn is_empty(&self) -> bool {
        self.texts.iter().all(Option::is_none)
    }
}

/// Load state of an [`ImageRecord`]. Transitions are one-way:
/// `Pending -> Loaded` or `Pending -> Failed`, exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoadState {
    Pending = 0,
    Loaded = 1,
    /// The decode attempt failed; the record will never load. Not retried.
    Failed = 2,
}

impl LoadState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Loaded,
            2 => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// Decoded image data plus metadata, present only once a record is `Loaded`.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub width: u32,
    pub height: u32,
    /// RGB8 pixel data, three bytes per pixel, rows top to bottom.
    pub pixels: Vec<u8>,
    pub metadata: Metadata,
}

impl ImagePayload {
    /// Bytes of pixel data this payload keeps resident.
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

/// Stable identity of a record within one manager, assigned at append time.
///
/// Navigation compares ids rather than positions, so handles stay valid while
/// the list grows underneath them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(u64);

impl RecordId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// One previously captured image: filename, load state, and (once loaded)
/// pixels and metadata.
///
/// The payload is written exactly once, by the background worker, before the
/// state flag is released to `Loaded`; afterwards it is immutable and safe to
/// read from any thread.
#[derive(Debug)]
pub struct ImageRecord {
    id: RecordId,
    filename: PathBuf,
    state: AtomicU8,
    payload: OnceLock<ImagePayload>,
}

/// Shared read-only handle to an [`ImageRecord`].
pub type RecordHandle = Arc<ImageRecord>;

impl ImageRecord {
    pub(crate) fn new(id: RecordId, filename: PathBuf) -> RecordHandle {
        Arc::new(Self {
            id,
            filename,
            state: AtomicU8::new(LoadState::Pending as u8),
            payload: OnceLock::new(),
        })
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn state(&self) -> LoadState {
        LoadState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == LoadState::Loaded
    }

    /// The decoded payload, or `None` while the record is not `Loaded`.
    pub fn payload(&self) -> Option<&ImagePayload> {
        if self.is_loaded() {
            self.payload.get()
        } else {
            None
        }
    }

    /// Metadata text for one field, or `None` when the record is not loaded
    /// or the image carried no such EXIF tag.
    pub fn info_text(&self, field: MetadataField) -> Option<&str> {
        self.payload().and_then(|p| p.metadata.get(field))
    }

    /// Publishes the decoded payload and moves the state to `Loaded`.
    pub(crate) fn publish(&self, payload: ImagePayload) {
        // The worker decodes each record at most once, so the slot is free.
        let _ = self.payload.set(payload);
        self.state.store(LoadState::Loaded as u8, Ordering::Release);
    }

    pub(crate) fn mark_failed(&self) {
        self.state.store(LoadState::Failed as u8, Ordering::Release);
    }
}
