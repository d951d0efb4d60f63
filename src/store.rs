//! Append-only ordered store of image records.

use std::path::PathBuf;

use crate::record::{ImageRecord, RecordHandle, RecordId};

/// How a target record is selected relative to a reference image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// The most recently added image; needs no reference.
    Last,
    /// The image added immediately before the reference.
    Previous,
    /// The image added immediately after the reference.
    Next,
}

/// Ordered collection of previously captured images, insertion order =
/// capture order. Records are only ever appended; navigation is resolved
/// against this order regardless of which records have finished loading.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<RecordHandle>,
    next_id: u64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `Pending` record for `filename` and appends it.
    pub fn append(&mut self, filename: PathBuf) -> RecordHandle {
        let id = RecordId::new(self.next_id);
        self.next_id += 1;
        let record = ImageRecord::new(id, filename);
        self.records.push(record.clone());
        record
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_first(&self, record: &ImageRecord) -> bool {
        self.records.first().is_some_and(|r| r.id() == record.id())
    }

    pub fn is_last(&self, record: &ImageRecord) -> bool {
        self.records.last().is_some_and(|r| r.id() == record.id())
    }

    /// Resolves a navigation request to a record, or `None` when the store is
    /// empty, the reference is unknown, or the request walks past an end of
    /// the list.
    pub fn navigate(
        &self,
        kind: RequestKind,
        reference: Option<&ImageRecord>,
    ) -> Option<RecordHandle> {
        match kind {
            RequestKind::Last => self.records.last().cloned(),
            RequestKind::Previous => {
                let position = self.position_of(reference?)?;
                if position == 0 {
                    return None; // already at start
                }
                self.records.get(position - 1).cloned()
            }
            RequestKind::Next => {
                let position = self.position_of(reference?)?;
                self.records.get(position + 1).cloned()
            }
        }
    }

    fn position_of(&self, reference: &ImageRecord) -> Option<usize> {
        self.records.iter().position(|r| r.id() == reference.id())
    }
}
