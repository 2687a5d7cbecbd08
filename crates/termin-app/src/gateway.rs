// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;

use crate::{
    ConfigKey, DatasetId, DatasetMode, Entry, EntryId, EntryPage, EntryUpdate, FilterSet,
    Settings, SortState, Statistics,
};

/// Remote data source behind the controller.
pub trait EntryGateway {
    fn list_entries(&self, query: &ListQuery) -> Result<EntryPage>;
    fn statistics(&self, dataset: &DatasetId, mode: DatasetMode) -> Result<Statistics>;
    fn get_entry(&self, dataset: &DatasetId, id: &EntryId, mode: DatasetMode) -> Result<Entry>;
    fn put_entry(
        &self,
        dataset: &DatasetId,
        id: &EntryId,
        mode: DatasetMode,
        update: &EntryUpdate,
    ) -> Result<()>;
    fn list_datasets(&self, mode: DatasetMode) -> Result<Vec<DatasetId>>;
    /// Long-running; callers run it off the event loop.
    fn trigger_import(&self, dataset: &DatasetId, mode: DatasetMode) -> Result<()>;
    fn switch_mode(&self, mode: DatasetMode) -> Result<()>;
    fn get_settings(&self) -> Result<Settings>;
    fn put_settings(&self, settings: &Settings) -> Result<()>;
    fn get_config(&self) -> Result<Settings>;
    fn put_config(&self, key: ConfigKey, value: &str) -> Result<()>;
}

/// Snapshot of everything a list call depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub dataset: DatasetId,
    pub mode: DatasetMode,
    pub page: usize,
    pub page_size: usize,
    pub sort: SortState,
    pub filters: FilterSet,
}

impl ListQuery {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("mode".to_owned(), self.mode.as_str().to_owned()),
            ("page".to_owned(), self.page.to_string()),
            ("page_size".to_owned(), self.page_size.to_string()),
            ("sort_by".to_owned(), self.sort.field.as_str().to_owned()),
            (
                "sort_order".to_owned(),
                self.sort.direction.as_str().to_owned(),
            ),
        ];
        pairs.extend(self.filters.query_pairs());
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadRequest {
    Rows {
        request_id: u64,
        query: ListQuery,
    },
    Statistics {
        request_id: u64,
        dataset: DatasetId,
        mode: DatasetMode,
    },
}

impl LoadRequest {
    pub const fn request_id(&self) -> u64 {
        match self {
            Self::Rows { request_id, .. } | Self::Statistics { request_id, .. } => *request_id,
        }
    }

    pub fn execute<G: EntryGateway + ?Sized>(&self, gateway: &G) -> LoadOutcome {
        match self {
            Self::Rows { request_id, query } => LoadOutcome::Rows {
                request_id: *request_id,
                result: gateway.list_entries(query).map_err(|error| format!("{error:#}")),
            },
            Self::Statistics {
                request_id,
                dataset,
                mode,
            } => LoadOutcome::Statistics {
                request_id: *request_id,
                result: gateway
                    .statistics(dataset, *mode)
                    .map_err(|error| format!("{error:#}")),
            },
        }
    }
}

// Errors are flattened to text so outcomes can cross thread boundaries and be
// compared in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Rows {
        request_id: u64,
        result: std::result::Result<EntryPage, String>,
    },
    Statistics {
        request_id: u64,
        result: std::result::Result<Statistics, String>,
    },
}

impl LoadOutcome {
    pub const fn request_id(&self) -> u64 {
        match self {
            Self::Rows { request_id, .. } | Self::Statistics { request_id, .. } => *request_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub dataset: DatasetId,
    pub mode: DatasetMode,
}

impl ImportRequest {
    pub fn execute<G: EntryGateway + ?Sized>(&self, gateway: &G) -> ImportOutcome {
        ImportOutcome {
            dataset: self.dataset.clone(),
            mode: self.mode,
            result: gateway
                .trigger_import(&self.dataset, self.mode)
                .map_err(|error| format!("{error:#}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub dataset: DatasetId,
    pub mode: DatasetMode,
    pub result: std::result::Result<(), String>,
}
