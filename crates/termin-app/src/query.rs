// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use crate::{Column, DatasetMode, SortDirection};

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Server-side status restrictions. At most one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpecialFilter {
    MissingFiles,
    RejectedFiles,
}

impl SpecialFilter {
    pub const ALL: [Self; 2] = [Self::MissingFiles, Self::RejectedFiles];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingFiles => "missing_files",
            Self::RejectedFiles => "rejected_files",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::MissingFiles => "missing",
            Self::RejectedFiles => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSet {
    columns: BTreeMap<Column, String>,
    special: Option<SpecialFilter>,
}

impl FilterSet {
    /// Set a substring filter; an empty value removes it. Returns false for
    /// columns that take no substring filter.
    pub fn set_column(&mut self, column: Column, value: &str) -> bool {
        if !column.is_filterable() {
            return false;
        }
        if value.is_empty() {
            self.columns.remove(&column);
        } else {
            self.columns.insert(column, value.to_owned());
        }
        true
    }

    pub fn column(&self, column: Column) -> Option<&str> {
        self.columns.get(&column).map(String::as_str)
    }

    pub fn columns(&self) -> impl Iterator<Item = (Column, &str)> {
        self.columns
            .iter()
            .map(|(column, value)| (*column, value.as_str()))
    }

    /// Toggle a special filter. Activating one replaces the other.
    pub fn toggle_special(&mut self, filter: SpecialFilter) -> Option<SpecialFilter> {
        self.special = if self.special == Some(filter) {
            None
        } else {
            Some(filter)
        };
        self.special
    }

    pub const fn special(&self) -> Option<SpecialFilter> {
        self.special
    }

    pub fn is_special_active(&self, filter: SpecialFilter) -> bool {
        self.special == Some(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.special.is_none()
    }

    pub fn clear(&mut self) {
        self.columns.clear();
        self.special = None;
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .columns
            .iter()
            .map(|(column, value)| (column.as_str().to_owned(), value.clone()))
            .collect();
        if let Some(special) = self.special {
            pairs.push((special.as_str().to_owned(), "true".to_owned()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub field: Column,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            field: Column::Datei,
            direction: SortDirection::Asc,
        }
    }
}

impl SortState {
    /// Same field flips direction; another field starts ascending.
    pub fn toggle(&mut self, field: Column) {
        if self.field == field {
            self.direction = self.direction.flipped();
        } else {
            self.field = field;
            self.direction = SortDirection::Asc;
        }
    }

    pub fn direction_for(&self, field: Column) -> Option<SortDirection> {
        (self.field == field).then_some(self.direction)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub page: usize,
    pub page_size: usize,
    pub sort: SortState,
    pub filters: FilterSet,
    pub mode: DatasetMode,
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DatasetMode::default())
    }
}

impl QueryState {
    pub fn new(page_size: usize, mode: DatasetMode) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            sort: SortState::default(),
            filters: FilterSet::default(),
            mode,
        }
    }

    pub fn set_filter(&mut self, column: Column, value: &str) -> bool {
        let applied = self.filters.set_column(column, value);
        if applied {
            self.page = 1;
        }
        applied
    }

    pub fn set_special_filter(&mut self, filter: SpecialFilter) -> Option<SpecialFilter> {
        self.page = 1;
        self.filters.toggle_special(filter)
    }

    pub fn set_sort(&mut self, field: Column) {
        self.sort.toggle(field);
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn reset(&mut self) {
        self.filters.clear();
        self.page = 1;
    }

    pub fn reset_for_mode(&mut self, mode: DatasetMode) {
        self.reset();
        self.mode = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterSet, QueryState, SortState, SpecialFilter};
    use crate::{Column, DatasetMode, SortDirection};

    #[test]
    fn special_filters_replace_each_other() {
        let mut filters = FilterSet::default();
        filters.toggle_special(SpecialFilter::MissingFiles);
        filters.toggle_special(SpecialFilter::RejectedFiles);

        assert_eq!(filters.special(), Some(SpecialFilter::RejectedFiles));
        assert!(!filters.is_special_active(SpecialFilter::MissingFiles));
        assert_eq!(
            filters.query_pairs(),
            vec![("rejected_files".to_owned(), "true".to_owned())]
        );
    }

    #[test]
    fn toggling_active_special_filter_clears_it() {
        let mut filters = FilterSet::default();
        filters.toggle_special(SpecialFilter::MissingFiles);
        assert_eq!(filters.toggle_special(SpecialFilter::MissingFiles), None);
        assert!(filters.is_empty());
    }

    #[test]
    fn column_filters_combine_with_special_filter() {
        let mut filters = FilterSet::default();
        assert!(filters.set_column(Column::Typ, "A"));
        assert!(filters.set_column(Column::Datei, "x "));
        filters.toggle_special(SpecialFilter::MissingFiles);

        assert_eq!(
            filters.query_pairs(),
            vec![
                ("datei".to_owned(), "x ".to_owned()),
                ("typ".to_owned(), "A".to_owned()),
                ("missing_files".to_owned(), "true".to_owned()),
            ]
        );
    }

    #[test]
    fn empty_value_removes_column_filter() {
        let mut filters = FilterSet::default();
        filters.set_column(Column::MelderId, "12");
        filters.set_column(Column::MelderId, "");
        assert_eq!(filters.column(Column::MelderId), None);
        assert!(filters.is_empty());
    }

    #[test]
    fn flag_columns_reject_substring_filters() {
        let mut filters = FilterSet::default();
        assert!(!filters.set_column(Column::Ok, "true"));
        assert!(filters.is_empty());
    }

    #[test]
    fn sort_toggle_flips_then_resets_on_new_field() {
        let mut sort = SortState::default();
        sort.toggle(Column::Datei);
        assert_eq!(sort.direction, SortDirection::Desc);

        sort.toggle(Column::Typ);
        assert_eq!(sort.field, Column::Typ);
        assert_eq!(sort.direction, SortDirection::Asc);
        assert_eq!(sort.direction_for(Column::Datei), None);
        assert_eq!(sort.direction_for(Column::Typ), Some(SortDirection::Asc));
    }

    #[test]
    fn filter_changes_return_to_first_page() {
        let mut query = QueryState::new(20, DatasetMode::Wpi);
        query.set_page(4);
        query.set_filter(Column::Typ, "A");
        assert_eq!(query.page, 1);

        query.set_page(3);
        query.set_special_filter(SpecialFilter::RejectedFiles);
        assert_eq!(query.page, 1);
    }

    #[test]
    fn reset_clears_filters_and_page_from_any_state() {
        let mut query = QueryState::new(20, DatasetMode::Wpi);
        query.set_filter(Column::Datei, "abc");
        query.set_special_filter(SpecialFilter::MissingFiles);
        query.set_page(7);
        query.set_sort(Column::Typ);

        query.reset();
        assert!(query.filters.is_empty());
        assert_eq!(query.page, 1);
        assert!(!query.filters.is_special_active(SpecialFilter::MissingFiles));
        assert!(!query.filters.is_special_active(SpecialFilter::RejectedFiles));
        assert_eq!(query.sort.field, Column::Typ);
    }

    #[test]
    fn page_size_and_page_never_drop_below_one() {
        let mut query = QueryState::new(0, DatasetMode::Emiso);
        assert_eq!(query.page_size, 1);
        query.set_page(0);
        assert_eq!(query.page, 1);
    }
}
