// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{DatasetId, EditSession, Entry, QueryState, Statistics};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TableStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(String),
    /// The active mode has no datasets. Not an error.
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// What the last applied responses produced. Never feeds back into the query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisplayState {
    pub catalog: Vec<DatasetId>,
    pub dataset: Option<DatasetId>,
    pub rows: Vec<Entry>,
    pub total: u64,
    pub statistics: Statistics,
    pub statistics_error: Option<String>,
    pub table: TableStatus,
    pub notice: Option<Notice>,
    pub busy: Option<DatasetId>,
}

impl DisplayState {
    pub(crate) fn clear_results(&mut self) {
        self.rows.clear();
        self.total = 0;
        self.statistics = Statistics::default();
        self.statistics_error = None;
    }
}

/// Borrowed input for rendering.
#[derive(Debug, Clone, Copy)]
pub struct ViewModel<'a> {
    pub query: &'a QueryState,
    pub display: &'a DisplayState,
    pub session: Option<&'a EditSession>,
}
