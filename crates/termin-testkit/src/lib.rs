// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use termin_app::{
    ConfigKey, DatasetId, DatasetMode, Entry, EntryGateway, EntryId, EntryPage, EntryUpdate,
    ListQuery, MODE_SETTING_KEY, Settings, SortDirection, SpecialFilter, Statistics,
};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const REPORT_TYPES: [&str; 4] = ["A", "AK", "B", "K"];
const SOURCES: [&str; 3] = ["portal", "sftp", "mail"];

pub const DEMO_PERIODS: [(&str, usize); 2] = [("202405", 47), ("202404", 23)];
pub const IMPORTED_ENTRY_COUNT: usize = 30;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Deterministic report row for `period`.
///
/// Types cycle through `A`, `AK`, `B`, `K`, so a substring filter of `A`
/// matches half the rows. Every fifth row has no matching import and every
/// tenth row starting at index 5 was rejected.
pub fn sample_entry(period: &DatasetId, index: usize) -> Entry {
    let seed = period
        .as_str()
        .bytes()
        .fold(index as u64, |acc, byte| acc.wrapping_mul(31).wrapping_add(u64::from(byte)));
    let mut rng = DeterministicRng::new(seed);
    let year = period.as_str().get(..4).unwrap_or("2024");
    let month = period.as_str().get(4..6).unwrap_or("01");

    let missing = index % 5 == 0;
    let mut extra = BTreeMap::new();
    extra.insert(
        "quelle".to_owned(),
        Value::String(SOURCES[rng.int_n(SOURCES.len())].to_owned()),
    );
    extra.insert(
        "meldungen".to_owned(),
        Value::from(1 + rng.int_n(40) as u64),
    );

    Entry {
        id: EntryId::new(format!("{}-{index:04}", period.as_str())),
        datei: format!("BMI_{}_{index:04}.xml", period.as_str()),
        erstellt: format!(
            "{year}-{month}-{:02} {:02}:{:02}",
            1 + index % 28,
            6 + rng.int_n(12),
            rng.int_n(60)
        ),
        melder_id: format!("{}", 100_000 + rng.int_n(900_000)),
        typ: REPORT_TYPES[index % REPORT_TYPES.len()].to_owned(),
        import_found: !missing,
        rejected_import_found: missing && index % 10 == 5,
        ok: false,
        comment: String::new(),
        last_updated: None,
        extra,
    }
}

pub fn sample_entries(period: &DatasetId, count: usize) -> Vec<Entry> {
    (0..count).map(|index| sample_entry(period, index)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    ListEntries,
    Statistics,
    GetEntry,
    PutEntry,
    ListDatasets,
    TriggerImport,
    SwitchMode,
    GetSettings,
    PutSettings,
    GetConfig,
    PutConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    ListEntries(ListQuery),
    Statistics {
        dataset: DatasetId,
        mode: DatasetMode,
    },
    GetEntry {
        dataset: DatasetId,
        id: EntryId,
        mode: DatasetMode,
    },
    PutEntry {
        dataset: DatasetId,
        id: EntryId,
        mode: DatasetMode,
        update: EntryUpdate,
    },
    ListDatasets(DatasetMode),
    TriggerImport {
        dataset: DatasetId,
        mode: DatasetMode,
    },
    SwitchMode(DatasetMode),
    GetSettings,
    PutSettings(Settings),
    GetConfig,
    PutConfig {
        key: ConfigKey,
        value: String,
    },
}

impl GatewayCall {
    pub const fn operation(&self) -> Operation {
        match self {
            Self::ListEntries(_) => Operation::ListEntries,
            Self::Statistics { .. } => Operation::Statistics,
            Self::GetEntry { .. } => Operation::GetEntry,
            Self::PutEntry { .. } => Operation::PutEntry,
            Self::ListDatasets(_) => Operation::ListDatasets,
            Self::TriggerImport { .. } => Operation::TriggerImport,
            Self::SwitchMode(_) => Operation::SwitchMode,
            Self::GetSettings => Operation::GetSettings,
            Self::PutSettings(_) => Operation::PutSettings,
            Self::GetConfig => Operation::GetConfig,
            Self::PutConfig { .. } => Operation::PutConfig,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    datasets: BTreeMap<(DatasetMode, DatasetId), Vec<Entry>>,
    settings: Settings,
    config: Settings,
    calls: Vec<GatewayCall>,
    failures: BTreeMap<Operation, String>,
}

impl MemoryState {
    fn record(&mut self, call: GatewayCall) -> Result<()> {
        let operation = call.operation();
        self.calls.push(call);
        if let Some(message) = self.failures.get(&operation) {
            bail!("{message}");
        }
        Ok(())
    }

    fn rows(&self, mode: DatasetMode, dataset: &DatasetId) -> Result<&Vec<Entry>> {
        self.datasets
            .get(&(mode, dataset.clone()))
            .ok_or_else(|| anyhow!("dataset {dataset} not found in {} mode", mode.as_str()))
    }
}

/// In-memory [`EntryGateway`] that records every call.
///
/// Clones share state, so a test can hand one clone to a controller and
/// inspect the recorded calls through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Two WPI periods and an empty eMISO catalog.
    pub fn demo() -> Self {
        let mut gateway = Self::new();
        for (period, count) in DEMO_PERIODS {
            let dataset = DatasetId::new(period);
            let entries = sample_entries(&dataset, count);
            gateway = gateway.with_dataset(DatasetMode::Wpi, dataset, entries);
        }
        gateway
            .with_setting(MODE_SETTING_KEY, DatasetMode::Wpi.as_str())
            .with_config(ConfigKey::ImportCutDate, "20240101")
            .with_config(ConfigKey::AuthFilePath, "/etc/termin/auth.json")
    }

    pub fn with_dataset(self, mode: DatasetMode, dataset: DatasetId, entries: Vec<Entry>) -> Self {
        self.lock().datasets.insert((mode, dataset), entries);
        self
    }

    pub fn with_setting(self, key: &str, value: &str) -> Self {
        self.lock().settings.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn with_config(self, key: ConfigKey, value: &str) -> Self {
        self.lock()
            .config
            .insert(key.as_str().to_owned(), value.to_owned());
        self
    }

    /// Make every later call of `operation` fail with `message`.
    pub fn fail(&self, operation: Operation, message: &str) {
        self.lock().failures.insert(operation, message.to_owned());
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.clone()
    }

    pub fn calls_of(&self, operation: Operation) -> Vec<GatewayCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn persisted_mode(&self) -> Option<DatasetMode> {
        self.lock()
            .settings
            .get(MODE_SETTING_KEY)
            .and_then(|value| DatasetMode::parse(value))
    }

    pub fn entry(&self, mode: DatasetMode, dataset: &DatasetId, id: &EntryId) -> Option<Entry> {
        self.lock()
            .datasets
            .get(&(mode, dataset.clone()))
            .and_then(|rows| rows.iter().find(|entry| &entry.id == id).cloned())
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn matches_query(entry: &Entry, query: &ListQuery) -> bool {
    let columns_match = query.filters.columns().all(|(column, needle)| {
        entry
            .cell_text(column)
            .to_lowercase()
            .contains(&needle.to_lowercase())
    });
    let special_matches = match query.filters.special() {
        Some(SpecialFilter::MissingFiles) => !entry.import_found,
        Some(SpecialFilter::RejectedFiles) => entry.rejected_import_found,
        None => true,
    };
    columns_match && special_matches
}

impl EntryGateway for MemoryGateway {
    fn list_entries(&self, query: &ListQuery) -> Result<EntryPage> {
        let mut state = self.lock();
        state.record(GatewayCall::ListEntries(query.clone()))?;
        let mut rows: Vec<Entry> = state
            .rows(query.mode, &query.dataset)?
            .iter()
            .filter(|entry| matches_query(entry, query))
            .cloned()
            .collect();
        rows.sort_by_key(|entry| entry.cell_text(query.sort.field));
        if query.sort.direction == SortDirection::Desc {
            rows.reverse();
        }

        let total = rows.len() as u64;
        let offset = query.page.saturating_sub(1).saturating_mul(query.page_size);
        let rows = rows.into_iter().skip(offset).take(query.page_size).collect();
        Ok(EntryPage { rows, total })
    }

    fn statistics(&self, dataset: &DatasetId, mode: DatasetMode) -> Result<Statistics> {
        let mut state = self.lock();
        state.record(GatewayCall::Statistics {
            dataset: dataset.clone(),
            mode,
        })?;
        let rows = state.rows(mode, dataset)?;
        let total = rows.len() as u64;
        let missing_count = rows.iter().filter(|entry| !entry.import_found).count() as u64;
        let missing_percentage = if total == 0 {
            0.0
        } else {
            (missing_count as f64 / total as f64 * 10_000.0).round() / 100.0
        };
        Ok(Statistics {
            missing_count,
            missing_percentage,
            total: Some(total),
        })
    }

    fn get_entry(&self, dataset: &DatasetId, id: &EntryId, mode: DatasetMode) -> Result<Entry> {
        let mut state = self.lock();
        state.record(GatewayCall::GetEntry {
            dataset: dataset.clone(),
            id: id.clone(),
            mode,
        })?;
        state
            .rows(mode, dataset)?
            .iter()
            .find(|entry| &entry.id == id)
            .cloned()
            .ok_or_else(|| anyhow!("entry {id} not found in {dataset}"))
    }

    fn put_entry(
        &self,
        dataset: &DatasetId,
        id: &EntryId,
        mode: DatasetMode,
        update: &EntryUpdate,
    ) -> Result<()> {
        let mut state = self.lock();
        state.record(GatewayCall::PutEntry {
            dataset: dataset.clone(),
            id: id.clone(),
            mode,
            update: update.clone(),
        })?;
        let entry = state
            .datasets
            .get_mut(&(mode, dataset.clone()))
            .and_then(|rows| rows.iter_mut().find(|entry| &entry.id == id))
            .ok_or_else(|| anyhow!("entry {id} not found in {dataset}"))?;
        entry.comment = update.comment.clone();
        entry.ok = update.ok;
        entry.last_updated = OffsetDateTime::now_utc().format(&Rfc3339).ok();
        Ok(())
    }

    fn list_datasets(&self, mode: DatasetMode) -> Result<Vec<DatasetId>> {
        let mut state = self.lock();
        state.record(GatewayCall::ListDatasets(mode))?;
        Ok(state
            .datasets
            .keys()
            .rev()
            .filter(|(candidate, _)| *candidate == mode)
            .map(|(_, dataset)| dataset.clone())
            .collect())
    }

    fn trigger_import(&self, dataset: &DatasetId, mode: DatasetMode) -> Result<()> {
        let mut state = self.lock();
        state.record(GatewayCall::TriggerImport {
            dataset: dataset.clone(),
            mode,
        })?;
        state
            .datasets
            .entry((mode, dataset.clone()))
            .or_insert_with(|| sample_entries(dataset, IMPORTED_ENTRY_COUNT));
        Ok(())
    }

    fn switch_mode(&self, mode: DatasetMode) -> Result<()> {
        let mut state = self.lock();
        state.record(GatewayCall::SwitchMode(mode))?;
        state
            .settings
            .insert(MODE_SETTING_KEY.to_owned(), mode.as_str().to_owned());
        Ok(())
    }

    fn get_settings(&self) -> Result<Settings> {
        let mut state = self.lock();
        state.record(GatewayCall::GetSettings)?;
        Ok(state.settings.clone())
    }

    fn put_settings(&self, settings: &Settings) -> Result<()> {
        let mut state = self.lock();
        state.record(GatewayCall::PutSettings(settings.clone()))?;
        state
            .settings
            .extend(settings.iter().map(|(key, value)| (key.clone(), value.clone())));
        Ok(())
    }

    fn get_config(&self) -> Result<Settings> {
        let mut state = self.lock();
        state.record(GatewayCall::GetConfig)?;
        Ok(state.config.clone())
    }

    fn put_config(&self, key: ConfigKey, value: &str) -> Result<()> {
        let mut state = self.lock();
        state.record(GatewayCall::PutConfig {
            key,
            value: value.to_owned(),
        })?;
        state
            .config
            .insert(key.as_str().to_owned(), value.to_owned());
        Ok(())
    }
}
