// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::{
    Column, ConfigKey, DatasetId, DatasetMode, DisplayState, EditSession, EntryGateway, EntryId,
    ImportOutcome, ImportRequest, ListQuery, LoadOutcome, LoadRequest, MODE_SETTING_KEY, Notice,
    QueryState, Settings, SpecialFilter, TableStatus, ValidationError, ViewModel, parse_period,
    total_pages,
};

/// Owns the query state and reconciles it with the remote data source.
///
/// Operator actions mutate the query and hand back the loads that bring the
/// display up to date. Loads may run anywhere; their outcomes come back
/// through [`Controller::apply`], which only accepts the most recent request
/// of each kind. A failed rows load puts the query back to what the table
/// last showed, so repeating the action retries it.
pub struct Controller<G> {
    gateway: G,
    query: QueryState,
    confirmed: Option<QueryState>,
    display: DisplayState,
    session: Option<EditSession>,
    next_request_id: u64,
    latest_rows: Option<u64>,
    latest_statistics: Option<u64>,
}

impl<G: EntryGateway> Controller<G> {
    pub fn new(gateway: G, page_size: usize) -> Self {
        Self {
            gateway,
            query: QueryState::new(page_size, DatasetMode::default()),
            confirmed: None,
            display: DisplayState::default(),
            session: None,
            next_request_id: 0,
            latest_rows: None,
            latest_statistics: None,
        }
    }

    /// Read the persisted mode, fetch its catalog and load the first dataset.
    pub fn start(&mut self) -> Result<Vec<LoadRequest>> {
        self.start_at(None)
    }

    /// Like [`Controller::start`], but load `preferred` when the catalog
    /// lists it.
    pub fn start_at(&mut self, preferred: Option<DatasetId>) -> Result<Vec<LoadRequest>> {
        let mode = match self.gateway.get_settings() {
            Ok(settings) => settings
                .get(MODE_SETTING_KEY)
                .and_then(|value| DatasetMode::parse(value))
                .unwrap_or_default(),
            Err(error) => {
                warn!(error = %format!("{error:#}"), "settings unavailable, using default mode");
                self.display.notice = Some(Notice::error(format!("load settings: {error:#}")));
                DatasetMode::default()
            }
        };
        info!(mode = mode.as_str(), "starting session");
        self.query.reset_for_mode(mode);
        self.refresh_catalog(preferred)
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut EditSession> {
        self.session.as_mut()
    }

    pub fn view(&self) -> ViewModel<'_> {
        ViewModel {
            query: &self.query,
            display: &self.display,
            session: self.session.as_ref(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.display.busy.is_some()
    }

    pub fn has_pending_loads(&self) -> bool {
        self.latest_rows.is_some() || self.latest_statistics.is_some()
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.display.total, self.query.page_size)
    }

    pub fn set_filter(&mut self, column: Column, value: &str) -> Result<Vec<LoadRequest>> {
        self.ensure_idle()?;
        self.checkpoint();
        if !self.query.set_filter(column, value) {
            bail!("column {} cannot be filtered", column.label());
        }
        Ok(self.issue_loads())
    }

    pub fn toggle_special_filter(&mut self, filter: SpecialFilter) -> Result<Vec<LoadRequest>> {
        self.ensure_idle()?;
        self.checkpoint();
        self.query.set_special_filter(filter);
        Ok(self.issue_loads())
    }

    pub fn set_sort(&mut self, column: Column) -> Result<Vec<LoadRequest>> {
        self.ensure_idle()?;
        self.checkpoint();
        self.query.set_sort(column);
        Ok(self.issue_loads())
    }

    pub fn reset_filters(&mut self) -> Result<Vec<LoadRequest>> {
        self.ensure_idle()?;
        self.checkpoint();
        self.query.reset();
        Ok(self.issue_loads())
    }

    /// Move to `page`, clamped to the known page range. Staying on the
    /// current page issues nothing.
    pub fn set_page(&mut self, page: usize) -> Result<Vec<LoadRequest>> {
        self.ensure_idle()?;
        let page = page.clamp(1, self.total_pages().max(1));
        if page == self.query.page {
            return Ok(Vec::new());
        }
        self.checkpoint();
        self.query.set_page(page);
        Ok(self.issue_loads())
    }

    pub fn next_page(&mut self) -> Result<Vec<LoadRequest>> {
        self.set_page(self.query.page.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> Result<Vec<LoadRequest>> {
        self.set_page(self.query.page.saturating_sub(1))
    }

    pub fn first_page(&mut self) -> Result<Vec<LoadRequest>> {
        self.set_page(1)
    }

    pub fn last_page(&mut self) -> Result<Vec<LoadRequest>> {
        self.set_page(self.total_pages())
    }

    /// Re-fetch the catalog and reload the active dataset.
    pub fn reload(&mut self) -> Result<Vec<LoadRequest>> {
        self.ensure_idle()?;
        let dataset = self.display.dataset.clone();
        self.refresh_catalog(dataset)
    }

    pub fn select_dataset(&mut self, dataset: &DatasetId) -> Result<Vec<LoadRequest>> {
        self.ensure_idle()?;
        self.ensure_no_session()?;
        if !self.display.catalog.contains(dataset) {
            bail!(
                "dataset {dataset} is not available in {} mode",
                self.query.mode.label()
            );
        }
        debug!(dataset = %dataset, "selecting dataset");
        self.display.dataset = Some(dataset.clone());
        self.confirmed = None;
        self.query.reset();
        Ok(self.issue_loads())
    }

    /// Step through the catalog, wrapping at either end.
    pub fn cycle_dataset(&mut self, forward: bool) -> Result<Vec<LoadRequest>> {
        let catalog = &self.display.catalog;
        if catalog.is_empty() {
            return Ok(Vec::new());
        }
        let position = self
            .display
            .dataset
            .as_ref()
            .and_then(|current| catalog.iter().position(|id| id == current))
            .unwrap_or(0);
        let next = if forward {
            (position + 1) % catalog.len()
        } else {
            (position + catalog.len() - 1) % catalog.len()
        };
        let target = catalog[next].clone();
        if Some(&target) == self.display.dataset.as_ref() {
            return Ok(Vec::new());
        }
        self.select_dataset(&target)
    }

    /// Switch the dataset namespace.
    ///
    /// The mode flips before the server is told. If persisting fails the flip
    /// is undone and nothing else changes; otherwise filters and page reset
    /// and the new mode's catalog is loaded.
    pub fn switch_mode(&mut self, mode: DatasetMode) -> Result<Vec<LoadRequest>> {
        self.ensure_idle()?;
        self.ensure_no_session()?;
        let previous = self.query.mode;
        if mode == previous {
            return Ok(Vec::new());
        }

        self.query.mode = mode;
        info!(from = previous.as_str(), to = mode.as_str(), "switching dataset mode");
        if let Err(error) = self.gateway.switch_mode(mode) {
            self.query.mode = previous;
            let error = error.context(format!("switch to {} mode", mode.label()));
            warn!(error = %format!("{error:#}"), "mode switch rolled back");
            self.display.notice = Some(Notice::error(format!("{error:#}")));
            return Err(error);
        }

        self.query.reset_for_mode(mode);
        let dataset = self.display.dataset.clone();
        self.refresh_catalog(dataset)
    }

    /// Accept a finished load. Outcomes that are not the latest request of
    /// their kind are dropped. May return a follow-up request.
    pub fn apply(&mut self, outcome: LoadOutcome) -> Vec<LoadRequest> {
        match outcome {
            LoadOutcome::Rows { request_id, result } => {
                if self.latest_rows != Some(request_id) {
                    debug!(request_id, "dropping stale rows response");
                    return Vec::new();
                }
                self.latest_rows = None;
                match result {
                    Ok(page) => {
                        let last = total_pages(page.total, self.query.page_size);
                        if self.query.page > 1 && self.query.page > last {
                            info!(
                                page = self.query.page,
                                last,
                                "page out of range, returning to first page"
                            );
                            self.query.page = 1;
                            self.display.total = page.total;
                            let Some(dataset) = self.display.dataset.clone() else {
                                return Vec::new();
                            };
                            return vec![self.rows_request(dataset)];
                        }
                        debug!(request_id, rows = page.rows.len(), total = page.total, "rows loaded");
                        self.confirmed = None;
                        self.display.rows = page.rows;
                        self.display.total = page.total;
                        self.display.table = TableStatus::Ready;
                    }
                    Err(message) => {
                        warn!(request_id, error = %message, "rows failed to load");
                        if let Some(previous) = self.confirmed.take() {
                            debug!(page = previous.page, "restoring query of the shown table");
                            self.query = previous;
                        }
                        self.display.rows.clear();
                        self.display.table = TableStatus::Failed(message);
                    }
                }
            }
            LoadOutcome::Statistics { request_id, result } => {
                if self.latest_statistics != Some(request_id) {
                    debug!(request_id, "dropping stale statistics response");
                    return Vec::new();
                }
                self.latest_statistics = None;
                match result {
                    Ok(statistics) => {
                        self.display.statistics = statistics;
                        self.display.statistics_error = None;
                    }
                    Err(message) => {
                        warn!(request_id, error = %message, "statistics failed to load");
                        self.display.statistics_error = Some(message);
                    }
                }
            }
        }
        Vec::new()
    }

    /// Execute loads against the owned gateway until nothing is left to
    /// fetch. Used where blocking is acceptable.
    pub fn run_loads(&mut self, requests: Vec<LoadRequest>) {
        let mut pending = requests;
        while !pending.is_empty() {
            let mut follow_up = Vec::new();
            for request in pending {
                let outcome = request.execute(&self.gateway);
                follow_up.extend(self.apply(outcome));
            }
            pending = follow_up;
        }
    }

    pub fn open_entry(&mut self, id: &EntryId) -> Result<()> {
        self.ensure_idle()?;
        if let Some(session) = &self.session {
            bail!("entry {} is already open", session.id());
        }
        let Some(dataset) = self.display.dataset.clone() else {
            bail!("no dataset selected");
        };
        let mode = self.query.mode;
        let entry = match self.gateway.get_entry(&dataset, id, mode) {
            Ok(entry) => entry,
            Err(error) => {
                let error = error.context(format!("load entry {id}"));
                self.display.notice = Some(Notice::error(format!("{error:#}")));
                return Err(error);
            }
        };
        debug!(dataset = %dataset, entry = %id, "entry opened");
        self.session = Some(EditSession::new(dataset, mode, entry));
        Ok(())
    }

    /// Save the open entry. A failure keeps the session and its edits.
    pub fn commit_entry(&mut self) -> Result<Vec<LoadRequest>> {
        self.ensure_idle()?;
        let Some(session) = self.session.as_mut() else {
            bail!("no entry is open");
        };
        let update = session.update();
        if let Err(error) = self
            .gateway
            .put_entry(session.dataset(), session.id(), session.mode(), &update)
        {
            let error = error.context(format!("save entry {}", session.id()));
            warn!(error = %format!("{error:#}"), "entry commit failed");
            session.set_error(Some(format!("{error:#}")));
            return Err(error);
        }

        let id = session.id().clone();
        self.session = None;
        info!(entry = %id, "entry saved");
        self.display.notice = Some(Notice::info(format!("saved entry {id}")));
        Ok(self.issue_loads())
    }

    /// Discard the open entry without contacting the server.
    pub fn cancel_entry(&mut self) -> bool {
        let closed = self.session.take().is_some();
        if closed {
            debug!("entry edit cancelled");
        }
        closed
    }

    /// Validate an operator-typed period and mark the controller busy.
    /// Nothing changes when validation fails.
    pub fn begin_import(&mut self, input: &str) -> Result<ImportRequest> {
        self.ensure_idle()?;
        self.ensure_no_session()?;
        let dataset = parse_period(input)?;
        info!(dataset = %dataset, mode = self.query.mode.as_str(), "import started");
        self.display.busy = Some(dataset.clone());
        Ok(ImportRequest {
            dataset,
            mode: self.query.mode,
        })
    }

    pub fn finish_import(&mut self, outcome: ImportOutcome) -> Result<Vec<LoadRequest>> {
        if self.display.busy.take().is_none() {
            bail!("no import in progress");
        }
        let ImportOutcome {
            dataset,
            mode,
            result,
        } = outcome;
        if let Err(message) = result {
            warn!(dataset = %dataset, error = %message, "import failed");
            self.display.notice = Some(Notice::error(format!("import {dataset}: {message}")));
            return Ok(Vec::new());
        }

        info!(dataset = %dataset, "import finished");
        self.display.notice = Some(Notice::info(format!(
            "imported {dataset} into {}",
            mode.label()
        )));
        if mode != self.query.mode {
            return Ok(Vec::new());
        }
        if self.display.dataset.as_ref() != Some(&dataset) {
            self.query.reset();
        }
        self.refresh_catalog(Some(dataset))
    }

    pub fn dismiss_notice(&mut self) {
        self.display.notice = None;
    }

    pub fn load_config(&self) -> Result<Settings> {
        self.gateway.get_config().context("load server configuration")
    }

    pub fn save_config(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        self.ensure_idle()?;
        let value = value.trim();
        if value.is_empty() {
            return Err(ValidationError::EmptyConfigValue(key.as_str()).into());
        }
        if let Err(error) = self.gateway.put_config(key, value) {
            let error = error.context(format!("save {}", key.as_str()));
            self.display.notice = Some(Notice::error(format!("{error:#}")));
            return Err(error);
        }
        info!(key = key.as_str(), "configuration saved");
        self.display.notice = Some(Notice::info(format!("saved {}", key.label())));
        Ok(())
    }

    fn ensure_idle(&self) -> Result<()> {
        if let Some(dataset) = &self.display.busy {
            bail!("import of {dataset} in progress");
        }
        Ok(())
    }

    fn ensure_no_session(&self) -> Result<()> {
        if let Some(session) = &self.session {
            bail!("close entry {} first", session.id());
        }
        Ok(())
    }

    fn refresh_catalog(&mut self, preferred: Option<DatasetId>) -> Result<Vec<LoadRequest>> {
        self.invalidate_loads();
        self.confirmed = None;
        let mode = self.query.mode;
        let catalog = match self.gateway.list_datasets(mode) {
            Ok(catalog) => catalog,
            Err(error) => {
                let error = error.context(format!("load {} datasets", mode.label()));
                warn!(error = %format!("{error:#}"), "catalog failed to load");
                self.display.catalog.clear();
                self.display.dataset = None;
                self.display.clear_results();
                self.display.table = TableStatus::Failed(format!("{error:#}"));
                return Err(error);
            }
        };

        debug!(mode = mode.as_str(), datasets = catalog.len(), "catalog loaded");
        let selected = preferred
            .filter(|id| catalog.contains(id))
            .or_else(|| catalog.first().cloned());
        self.display.catalog = catalog;
        self.display.dataset = selected;
        if self.display.dataset.is_none() {
            self.display.clear_results();
            self.display.table = TableStatus::NoData;
            return Ok(Vec::new());
        }
        Ok(self.issue_loads())
    }

    /// Remember the query the table reflects before the first unconfirmed
    /// change to it.
    fn checkpoint(&mut self) {
        if self.confirmed.is_none() {
            self.confirmed = Some(self.query.clone());
        }
    }

    fn invalidate_loads(&mut self) {
        self.latest_rows = None;
        self.latest_statistics = None;
    }

    fn next_id(&mut self) -> u64 {
        self.next_request_id += 1;
        self.next_request_id
    }

    fn list_query(&self, dataset: DatasetId) -> ListQuery {
        ListQuery {
            dataset,
            mode: self.query.mode,
            page: self.query.page,
            page_size: self.query.page_size,
            sort: self.query.sort,
            filters: self.query.filters.clone(),
        }
    }

    fn rows_request(&mut self, dataset: DatasetId) -> LoadRequest {
        let request_id = self.next_id();
        self.latest_rows = Some(request_id);
        self.display.table = TableStatus::Loading;
        debug!(request_id, page = self.query.page, "requesting rows");
        LoadRequest::Rows {
            request_id,
            query: self.list_query(dataset),
        }
    }

    fn issue_loads(&mut self) -> Vec<LoadRequest> {
        let Some(dataset) = self.display.dataset.clone() else {
            return Vec::new();
        };
        let rows = self.rows_request(dataset.clone());
        let request_id = self.next_id();
        self.latest_statistics = Some(request_id);
        vec![
            rows,
            LoadRequest::Statistics {
                request_id,
                dataset,
                mode: self.query.mode,
            },
        ]
    }
}
