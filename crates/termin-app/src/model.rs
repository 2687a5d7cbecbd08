// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::ids::*;

/// Settings map key holding the persisted dataset mode.
pub const MODE_SETTING_KEY: &str = "statistics";

/// Detail fields that are either editable or owned by the server.
pub const DETAIL_EXCLUDED_FIELDS: [&str; 4] = ["comment", "ok", "last_updated", "id2"];

pub type Settings = BTreeMap<String, String>;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DatasetMode {
    #[default]
    Wpi,
    Emiso,
}

impl DatasetMode {
    pub const ALL: [Self; 2] = [Self::Wpi, Self::Emiso];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wpi => "wpi",
            Self::Emiso => "emiso",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "wpi" => Some(Self::Wpi),
            "emiso" => Some(Self::Emiso),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Wpi => "WPI",
            Self::Emiso => "eMISO",
        }
    }

    pub const fn other(self) -> Self {
        match self {
            Self::Wpi => Self::Emiso,
            Self::Emiso => Self::Wpi,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Column {
    Datei,
    Erstellt,
    MelderId,
    Typ,
    ImportFound,
    Ok,
}

impl Column {
    pub const ALL: [Self; 6] = [
        Self::Datei,
        Self::Erstellt,
        Self::MelderId,
        Self::Typ,
        Self::ImportFound,
        Self::Ok,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Datei => "datei",
            Self::Erstellt => "erstellt",
            Self::MelderId => "melder_id",
            Self::Typ => "typ",
            Self::ImportFound => "import_found",
            Self::Ok => "ok",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "datei" => Some(Self::Datei),
            "erstellt" => Some(Self::Erstellt),
            "melder_id" => Some(Self::MelderId),
            "typ" => Some(Self::Typ),
            "import_found" => Some(Self::ImportFound),
            "ok" => Some(Self::Ok),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Datei => "file",
            Self::Erstellt => "created",
            Self::MelderId => "reporter",
            Self::Typ => "type",
            Self::ImportFound => "import",
            Self::Ok => "ok",
        }
    }

    /// Flag columns render as marks and take no substring filter.
    pub const fn is_filterable(self) -> bool {
        matches!(
            self,
            Self::Datei | Self::Erstellt | Self::MelderId | Self::Typ
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfigKey {
    ImportCutDate,
    AuthFilePath,
}

impl ConfigKey {
    pub const ALL: [Self; 2] = [Self::ImportCutDate, Self::AuthFilePath];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ImportCutDate => "IMPORT_CUT_DATE",
            Self::AuthFilePath => "AUTH_FILE_PATH",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "IMPORT_CUT_DATE" => Some(Self::ImportCutDate),
            "AUTH_FILE_PATH" => Some(Self::AuthFilePath),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ImportCutDate => "import cut date",
            Self::AuthFilePath => "auth file path",
        }
    }
}

/// One row of a remote dataset.
///
/// Fields the client does not know about are kept in `extra` so the detail
/// view can list the complete record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "id2")]
    pub id: EntryId,
    #[serde(default, deserialize_with = "text_field")]
    pub datei: String,
    #[serde(default, deserialize_with = "text_field")]
    pub erstellt: String,
    #[serde(default, deserialize_with = "text_field")]
    pub melder_id: String,
    #[serde(default, deserialize_with = "text_field")]
    pub typ: String,
    #[serde(default, deserialize_with = "flag_field")]
    pub import_found: bool,
    #[serde(default, deserialize_with = "flag_field")]
    pub rejected_import_found: bool,
    #[serde(default, deserialize_with = "flag_field")]
    pub ok: bool,
    #[serde(default, deserialize_with = "text_field")]
    pub comment: String,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Entry {
    pub fn cell_text(&self, column: Column) -> String {
        match column {
            Column::Datei => self.datei.clone(),
            Column::Erstellt => self.erstellt.clone(),
            Column::MelderId => self.melder_id.clone(),
            Column::Typ => self.typ.clone(),
            Column::ImportFound => self.import_found.to_string(),
            Column::Ok => self.ok.to_string(),
        }
    }

    /// Every read-only field of the record, sorted by field name.
    pub fn details(&self) -> Vec<(String, String)> {
        let mut fields = BTreeMap::new();
        fields.insert("datei".to_owned(), self.datei.clone());
        fields.insert("erstellt".to_owned(), self.erstellt.clone());
        fields.insert("melder_id".to_owned(), self.melder_id.clone());
        fields.insert("typ".to_owned(), self.typ.clone());
        fields.insert("import_found".to_owned(), self.import_found.to_string());
        fields.insert(
            "rejected_import_found".to_owned(),
            self.rejected_import_found.to_string(),
        );
        for (key, value) in &self.extra {
            fields.insert(key.clone(), display_value(value));
        }
        fields
            .into_iter()
            .filter(|(key, _)| !DETAIL_EXCLUDED_FIELDS.contains(&key.as_str()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryUpdate {
    pub comment: String,
    pub ok: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntryPage {
    #[serde(rename = "data")]
    pub rows: Vec<Entry>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Statistics {
    #[serde(default)]
    pub missing_count: u64,
    #[serde(default)]
    pub missing_percentage: f64,
    #[serde(default)]
    pub total: Option<u64>,
}

pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn text_field<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(display_value(&value))
}

// SQLite-backed servers send booleans as 0/1 or NULL.
fn flag_field<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(false),
        Value::Bool(flag) => Ok(flag),
        Value::Number(number) => Ok(number.as_f64().is_some_and(|value| value != 0.0)),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "no" => Ok(false),
            "1" | "true" | "yes" => Ok(true),
            other => Err(D::Error::custom(format!("invalid flag value {other:?}"))),
        },
        other => Err(D::Error::custom(format!("invalid flag value {other}"))),
    }
}
