// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::{Month, OffsetDateTime};

use crate::DatasetId;

pub const PERIOD_LAYOUT: &str = "YYYYMM";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidPeriod(String),
    InvalidPeriodMonth(String),
    EmptyConfigValue(&'static str),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPeriod(input) => write!(
                f,
                "invalid period {input:?}; use six digits {PERIOD_LAYOUT}, for example 202405"
            ),
            Self::InvalidPeriodMonth(input) => {
                write!(f, "invalid period {input:?}; month must be 01-12")
            }
            Self::EmptyConfigValue(key) => write!(f, "{key} must not be empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Parse an operator-typed dataset identifier.
pub fn parse_period(input: &str) -> ValidationResult<DatasetId> {
    let trimmed = input.trim();
    if trimmed.len() != 6 || !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(ValidationError::InvalidPeriod(trimmed.to_owned()));
    }

    let month: u8 = trimmed[4..]
        .parse()
        .map_err(|_| ValidationError::InvalidPeriod(trimmed.to_owned()))?;
    Month::try_from(month).map_err(|_| ValidationError::InvalidPeriodMonth(trimmed.to_owned()))?;
    Ok(DatasetId::new(trimmed))
}

pub fn current_period(now: OffsetDateTime) -> DatasetId {
    DatasetId::new(format!("{:04}{:02}", now.year(), u8::from(now.month())))
}
