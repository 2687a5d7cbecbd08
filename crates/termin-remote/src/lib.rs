// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use termin_app::{
    ConfigKey, DatasetId, DatasetMode, Entry, EntryGateway, EntryId, EntryPage, EntryUpdate,
    ListQuery, Settings, Statistics, display_value,
};
use tracing::debug;
use url::Url;

/// Blocking HTTP gateway to the report server.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    import_timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("server.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("server.base_url {base_url:?} is not a valid URL"))?;
        if parsed.cannot_be_a_base() {
            bail!("server.base_url {base_url:?} cannot carry API paths");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            import_timeout: timeout,
            http,
        })
    }

    /// Imports scrape upstream portals and routinely outlive the normal
    /// request timeout.
    pub fn with_import_timeout(mut self, timeout: Duration) -> Self {
        self.import_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn import_timeout(&self) -> Duration {
        self.import_timeout
    }

    fn endpoint(&self, segments: &[&str], query: &[(String, String)]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).context("parse server.base_url")?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("server.base_url cannot carry API paths"))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn send(&self, method: &str, url: &Url, request: RequestBuilder) -> Result<Response> {
        debug!(method, path = url.path(), query = url.query().unwrap_or(""), "gateway request");
        let response = request
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(response)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(String, String)],
        what: &str,
    ) -> Result<T> {
        let url = self.endpoint(segments, query)?;
        let response = self.send("GET", &url, self.http.get(url.clone()))?;
        response.json().with_context(|| format!("decode {what}"))
    }

    fn mutate<B: Serialize + ?Sized>(
        &self,
        request: RequestBuilder,
        method: &str,
        url: &Url,
        body: &B,
        what: &str,
    ) -> Result<()> {
        let response = self.send(method, url, request.json(body))?;
        let envelope: MutationResponse = response
            .json()
            .with_context(|| format!("decode {what} response"))?;
        envelope.into_result(what)
    }
}

fn mode_query(mode: DatasetMode) -> Vec<(String, String)> {
    vec![("mode".to_owned(), mode.as_str().to_owned())]
}

impl EntryGateway for Client {
    fn list_entries(&self, query: &ListQuery) -> Result<EntryPage> {
        self.get_json(
            &["api", "data", query.dataset.as_str()],
            &query.query_pairs(),
            "entry list",
        )
    }

    fn statistics(&self, dataset: &DatasetId, mode: DatasetMode) -> Result<Statistics> {
        self.get_json(
            &["api", "statistics", dataset.as_str()],
            &mode_query(mode),
            "statistics",
        )
    }

    fn get_entry(&self, dataset: &DatasetId, id: &EntryId, mode: DatasetMode) -> Result<Entry> {
        let entry: Option<Entry> = self.get_json(
            &["api", "entry", dataset.as_str(), id.as_str()],
            &mode_query(mode),
            "entry",
        )?;
        entry.ok_or_else(|| anyhow!("entry {id} not found in {dataset}"))
    }

    fn put_entry(
        &self,
        dataset: &DatasetId,
        id: &EntryId,
        mode: DatasetMode,
        update: &EntryUpdate,
    ) -> Result<()> {
        let url = self.endpoint(
            &["api", "entry", dataset.as_str(), id.as_str()],
            &mode_query(mode),
        )?;
        self.mutate(self.http.put(url.clone()), "PUT", &url, update, "entry update")
    }

    fn list_datasets(&self, mode: DatasetMode) -> Result<Vec<DatasetId>> {
        self.get_json(&["api", "termins"], &mode_query(mode), "dataset catalog")
    }

    fn trigger_import(&self, dataset: &DatasetId, mode: DatasetMode) -> Result<()> {
        let url = self.endpoint(&["api", "update"], &[])?;
        let request = self.http.post(url.clone()).timeout(self.import_timeout);
        self.mutate(
            request,
            "POST",
            &url,
            &ImportBody {
                termin: dataset.as_str(),
                mode: mode.as_str(),
            },
            "import",
        )
    }

    fn switch_mode(&self, mode: DatasetMode) -> Result<()> {
        let url = self.endpoint(&["api", "switch_statistics"], &[])?;
        self.mutate(
            self.http.post(url.clone()),
            "POST",
            &url,
            &SwitchBody {
                statistics: mode.as_str(),
            },
            "mode switch",
        )
    }

    fn get_settings(&self) -> Result<Settings> {
        let raw: BTreeMap<String, Value> = self.get_json(&["api", "settings"], &[], "settings")?;
        Ok(flatten_map(raw))
    }

    fn put_settings(&self, settings: &Settings) -> Result<()> {
        let url = self.endpoint(&["api", "settings"], &[])?;
        self.mutate(self.http.put(url.clone()), "PUT", &url, settings, "settings update")
    }

    fn get_config(&self) -> Result<Settings> {
        let raw: BTreeMap<String, Value> =
            self.get_json(&["api", "config"], &[], "configuration")?;
        Ok(flatten_map(raw))
    }

    fn put_config(&self, key: ConfigKey, value: &str) -> Result<()> {
        let url = self.endpoint(&["api", "config", key.as_str()], &[])?;
        self.mutate(
            self.http.put(url.clone()),
            "PUT",
            &url,
            &ConfigBody { value },
            "configuration update",
        )
    }
}

fn flatten_map(raw: BTreeMap<String, Value>) -> Settings {
    raw.into_iter()
        .map(|(key, value)| (key, display_value(&value)))
        .collect()
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- is the report server running? ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<MutationResponse>(body)
        && let Some(error) = parsed.error
        && !error.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), error);
    }

    if body.len() < 100 && !body.contains('{') && !body.contains('<') {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct MutationResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

impl MutationResponse {
    fn into_result(self, what: &str) -> Result<()> {
        if self.success {
            return Ok(());
        }
        match self.error {
            Some(error) if !error.is_empty() => bail!("{what} failed: {error}"),
            _ => bail!("{what} failed: server reported no success"),
        }
    }
}

#[derive(Debug, Serialize)]
struct ImportBody<'a> {
    termin: &'a str,
    mode: &'a str,
}

#[derive(Debug, Serialize)]
struct SwitchBody<'a> {
    statistics: &'a str,
}

#[derive(Debug, Serialize)]
struct ConfigBody<'a> {
    value: &'a str,
}
