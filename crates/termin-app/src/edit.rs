// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{DatasetId, DatasetMode, Entry, EntryId, EntryUpdate};

/// Operator-editable fields of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditBuffer {
    pub comment: String,
    pub ok: bool,
}

impl From<&Entry> for EditBuffer {
    fn from(entry: &Entry) -> Self {
        Self {
            comment: entry.comment.clone(),
            ok: entry.ok,
        }
    }
}

/// One open entry with its pending edits. The session remembers the dataset
/// and mode it was opened under so a commit targets the same record even if
/// nothing else changes in between.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    dataset: DatasetId,
    mode: DatasetMode,
    entry: Entry,
    buffer: EditBuffer,
    error: Option<String>,
}

impl EditSession {
    pub fn new(dataset: DatasetId, mode: DatasetMode, entry: Entry) -> Self {
        let buffer = EditBuffer::from(&entry);
        Self {
            dataset,
            mode,
            entry,
            buffer,
            error: None,
        }
    }

    pub fn id(&self) -> &EntryId {
        &self.entry.id
    }

    pub fn dataset(&self) -> &DatasetId {
        &self.dataset
    }

    pub const fn mode(&self) -> DatasetMode {
        self.mode
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    pub fn details(&self) -> Vec<(String, String)> {
        self.entry.details()
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.buffer.comment = comment.into();
    }

    pub fn push_comment_char(&mut self, ch: char) {
        self.buffer.comment.push(ch);
    }

    pub fn pop_comment_char(&mut self) {
        self.buffer.comment.pop();
    }

    pub fn set_ok(&mut self, ok: bool) {
        self.buffer.ok = ok;
    }

    pub fn toggle_ok(&mut self) {
        self.buffer.ok = !self.buffer.ok;
    }

    pub fn is_dirty(&self) -> bool {
        self.buffer != EditBuffer::from(&self.entry)
    }

    pub fn update(&self) -> EntryUpdate {
        EntryUpdate {
            comment: self.buffer.comment.clone(),
            ok: self.buffer.ok,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }
}
