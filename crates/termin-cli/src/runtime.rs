// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use termin_app::{
    ConfigKey, Controller, DatasetId, DatasetMode, Entry, EntryGateway, EntryId, EntryPage,
    EntryUpdate, ListQuery, MODE_SETTING_KEY, Settings, Statistics, TableStatus, render,
    render_markup,
};
use termin_remote::Client;
use termin_testkit::MemoryGateway;
use tracing::info;

use crate::config::Config;

/// The gateway the session talks to.
#[derive(Debug, Clone)]
pub enum Backend {
    Http(Client),
    Demo(MemoryGateway),
}

impl Backend {
    pub fn connect(config: &Config, demo: bool) -> Result<Self> {
        if demo {
            info!("using in-memory demo gateway");
            return Ok(Self::Demo(MemoryGateway::demo()));
        }
        let client = Client::new(config.base_url(), config.timeout()?)
            .context("invalid [server] config; fix base_url or timeout")?
            .with_import_timeout(config.import_timeout()?);
        info!(base_url = client.base_url(), "using report server");
        Ok(Self::Http(client))
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Http(client) => client.base_url().to_owned(),
            Self::Demo(_) => "demo data".to_owned(),
        }
    }

    fn inner(&self) -> &dyn EntryGateway {
        match self {
            Self::Http(client) => client,
            Self::Demo(memory) => memory,
        }
    }
}

impl EntryGateway for Backend {
    fn list_entries(&self, query: &ListQuery) -> Result<EntryPage> {
        self.inner().list_entries(query)
    }

    fn statistics(&self, dataset: &DatasetId, mode: DatasetMode) -> Result<Statistics> {
        self.inner().statistics(dataset, mode)
    }

    fn get_entry(&self, dataset: &DatasetId, id: &EntryId, mode: DatasetMode) -> Result<Entry> {
        self.inner().get_entry(dataset, id, mode)
    }

    fn put_entry(
        &self,
        dataset: &DatasetId,
        id: &EntryId,
        mode: DatasetMode,
        update: &EntryUpdate,
    ) -> Result<()> {
        self.inner().put_entry(dataset, id, mode, update)
    }

    fn list_datasets(&self, mode: DatasetMode) -> Result<Vec<DatasetId>> {
        self.inner().list_datasets(mode)
    }

    fn trigger_import(&self, dataset: &DatasetId, mode: DatasetMode) -> Result<()> {
        self.inner().trigger_import(dataset, mode)
    }

    fn switch_mode(&self, mode: DatasetMode) -> Result<()> {
        self.inner().switch_mode(mode)
    }

    fn get_settings(&self) -> Result<Settings> {
        self.inner().get_settings()
    }

    fn put_settings(&self, settings: &Settings) -> Result<()> {
        self.inner().put_settings(settings)
    }

    fn get_config(&self) -> Result<Settings> {
        self.inner().get_config()
    }

    fn put_config(&self, key: ConfigKey, value: &str) -> Result<()> {
        self.inner().put_config(key, value)
    }
}

/// Reachability check for `--check`: the persisted mode and its catalog.
pub fn check<G: EntryGateway>(gateway: &G) -> Result<String> {
    let settings = gateway.get_settings().context("load server settings")?;
    let mode = settings
        .get(MODE_SETTING_KEY)
        .and_then(|value| DatasetMode::parse(value))
        .unwrap_or_default();
    let catalog = gateway
        .list_datasets(mode)
        .with_context(|| format!("load {} datasets", mode.label()))?;
    Ok(format!(
        "{} mode, {} dataset(s) available",
        mode.label(),
        catalog.len()
    ))
}

/// Load page 1 of `dataset` in the persisted mode and return its markup.
pub fn print_page<G: EntryGateway>(gateway: G, page_size: usize, dataset: &str) -> Result<String> {
    let dataset = DatasetId::new(dataset.trim());
    let mut controller = Controller::new(gateway, page_size);
    let requests = controller.start_at(Some(dataset.clone()))?;
    if controller.display().dataset.as_ref() != Some(&dataset) {
        bail!(
            "dataset {dataset} is not available in {} mode",
            controller.query().mode.label()
        );
    }
    controller.run_loads(requests);

    if let TableStatus::Failed(message) = &controller.display().table {
        bail!("load {dataset}: {message}");
    }
    Ok(render_markup(&render(&controller.view())))
}
