// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{
    Column, DatasetId, DatasetMode, EntryId, Notice, PageWindow, PERIOD_LAYOUT, SortDirection,
    SpecialFilter, TableStatus, ViewModel, total_pages,
};

pub const MARK_YES: &str = "\u{2713}";
pub const MARK_NO: &str = "\u{2717}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub column: Column,
    pub label: &'static str,
    pub filter: Option<String>,
    pub sort: Option<SortDirection>,
    pub filterable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowCell {
    Text(String),
    Flag(bool),
}

impl RowCell {
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Flag(true) => MARK_YES,
            Self::Flag(false) => MARK_NO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: EntryId,
    pub cells: Vec<RowCell>,
    pub missing: bool,
    pub rejected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenBody {
    Loading,
    Rows(Vec<RowView>),
    /// A loaded page with no matching rows.
    Empty,
    Message(String),
    NoData { call_to_action: String },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Summary {
    pub total: u64,
    pub missing_count: u64,
    pub missing_percentage: f64,
    pub dataset_total: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditView {
    pub id: EntryId,
    pub details: Vec<(String, String)>,
    pub comment: String,
    pub ok: bool,
    pub dirty: bool,
    pub error: Option<String>,
}

/// Everything needed to draw one frame, independent of the output medium.
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    pub mode: DatasetMode,
    pub dataset: Option<DatasetId>,
    pub catalog: Vec<DatasetId>,
    pub header: Vec<HeaderCell>,
    pub body: ScreenBody,
    pub pager: PageWindow,
    pub current_page: usize,
    pub total_pages: usize,
    pub summary: Summary,
    pub special_filters: Vec<(SpecialFilter, bool)>,
    pub notice: Option<Notice>,
    pub busy: Option<String>,
    pub edit: Option<EditView>,
}

pub fn call_to_action(mode: DatasetMode) -> String {
    match mode {
        DatasetMode::Wpi => format!(
            "No WPI periods imported yet. Import a period ({PERIOD_LAYOUT}) to load WPI reports."
        ),
        DatasetMode::Emiso => format!(
            "No eMISO periods imported yet. Import a period ({PERIOD_LAYOUT}) to load eMISO reports."
        ),
    }
}

pub fn render(view: &ViewModel<'_>) -> Screen {
    let query = view.query;
    let display = view.display;

    let header = Column::ALL
        .into_iter()
        .map(|column| HeaderCell {
            column,
            label: column.label(),
            filter: query.filters.column(column).map(str::to_owned),
            sort: query.sort.direction_for(column),
            filterable: column.is_filterable(),
        })
        .collect();

    let body = match &display.table {
        TableStatus::Idle | TableStatus::Loading => ScreenBody::Loading,
        TableStatus::Failed(message) => ScreenBody::Message(message.clone()),
        TableStatus::NoData => ScreenBody::NoData {
            call_to_action: call_to_action(query.mode),
        },
        TableStatus::Ready if display.rows.is_empty() => ScreenBody::Empty,
        TableStatus::Ready => ScreenBody::Rows(
            display
                .rows
                .iter()
                .map(|entry| RowView {
                    id: entry.id.clone(),
                    cells: Column::ALL
                        .into_iter()
                        .map(|column| match column {
                            Column::ImportFound => RowCell::Flag(entry.import_found),
                            Column::Ok => RowCell::Flag(entry.ok),
                            _ => RowCell::Text(entry.cell_text(column)),
                        })
                        .collect(),
                    missing: !entry.import_found,
                    rejected: entry.rejected_import_found,
                })
                .collect(),
        ),
    };

    let pager = match display.table {
        TableStatus::Ready => PageWindow::compute(display.total, query.page_size, query.page),
        _ => PageWindow::default(),
    };

    let summary = Summary {
        total: display.total,
        missing_count: display.statistics.missing_count,
        missing_percentage: display.statistics.missing_percentage,
        dataset_total: display.statistics.total,
        error: display.statistics_error.clone(),
    };

    let edit = view.session.map(|session| EditView {
        id: session.id().clone(),
        details: session.details(),
        comment: session.buffer().comment.clone(),
        ok: session.buffer().ok,
        dirty: session.is_dirty(),
        error: session.error().map(str::to_owned),
    });

    Screen {
        mode: query.mode,
        dataset: display.dataset.clone(),
        catalog: display.catalog.clone(),
        header,
        body,
        pager,
        current_page: query.page,
        total_pages: total_pages(display.total, query.page_size),
        summary,
        special_filters: SpecialFilter::ALL
            .into_iter()
            .map(|filter| (filter, query.filters.is_special_active(filter)))
            .collect(),
        notice: display.notice.clone(),
        busy: display
            .busy
            .as_ref()
            .map(|dataset| format!("importing {dataset}")),
        edit,
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// HTML fragment for a rendered screen. Every server-sourced string passes
/// through [`escape_html`].
pub fn render_markup(screen: &Screen) -> String {
    let mut out = String::new();
    let dataset = screen
        .dataset
        .as_ref()
        .map(|id| escape_html(id.as_str()))
        .unwrap_or_default();
    out.push_str(&format!(
        "<section class=\"termin\" data-mode=\"{}\" data-dataset=\"{dataset}\">\n",
        screen.mode.as_str()
    ));

    out.push_str("<ul class=\"catalog\">");
    for id in &screen.catalog {
        let class = if screen.dataset.as_ref() == Some(id) {
            " class=\"active\""
        } else {
            ""
        };
        out.push_str(&format!("<li{class}>{}</li>", escape_html(id.as_str())));
    }
    out.push_str("</ul>\n");

    out.push_str(&format!(
        "<div class=\"summary\"><span class=\"total\">{}</span> <span class=\"missing\">{}</span> <span class=\"missing-percentage\">{}%</span></div>\n",
        screen.summary.total, screen.summary.missing_count, screen.summary.missing_percentage
    ));

    out.push_str("<table>\n<thead><tr>");
    for cell in &screen.header {
        let sort = match cell.sort {
            Some(direction) => format!(" class=\"active-sort {}\"", direction.as_str()),
            None => String::new(),
        };
        let filter = match &cell.filter {
            Some(value) => format!(" data-filter=\"{}\"", escape_html(value)),
            None => String::new(),
        };
        out.push_str(&format!(
            "<th data-column=\"{}\"{sort}{filter}>{}</th>",
            cell.column.as_str(),
            cell.label
        ));
    }
    out.push_str("</tr></thead>\n<tbody>\n");

    let columns = screen.header.len().max(1);
    match &screen.body {
        ScreenBody::Loading => out.push_str(&format!(
            "<tr class=\"loading\"><td colspan=\"{columns}\">loading</td></tr>\n"
        )),
        ScreenBody::Empty => out.push_str(&format!(
            "<tr class=\"empty\"><td colspan=\"{columns}\">no matching entries</td></tr>\n"
        )),
        ScreenBody::Message(message) => out.push_str(&format!(
            "<tr class=\"error\"><td colspan=\"{columns}\">{}</td></tr>\n",
            escape_html(message)
        )),
        ScreenBody::NoData { call_to_action } => out.push_str(&format!(
            "<tr class=\"no-data\"><td colspan=\"{columns}\">{}</td></tr>\n",
            escape_html(call_to_action)
        )),
        ScreenBody::Rows(rows) => {
            for row in rows {
                let mut classes = Vec::new();
                if row.missing {
                    classes.push("missing-file");
                }
                if row.rejected {
                    classes.push("rejected-file");
                }
                let class = if classes.is_empty() {
                    String::new()
                } else {
                    format!(" class=\"{}\"", classes.join(" "))
                };
                out.push_str(&format!(
                    "<tr{class} data-id=\"{}\">",
                    escape_html(row.id.as_str())
                ));
                for cell in &row.cells {
                    match cell {
                        RowCell::Text(text) => {
                            out.push_str(&format!("<td>{}</td>", escape_html(text)));
                        }
                        RowCell::Flag(flag) => out.push_str(&format!(
                            "<td class=\"flag {}\">{}</td>",
                            if *flag { "yes" } else { "no" },
                            cell.text()
                        )),
                    }
                }
                out.push_str("</tr>\n");
            }
        }
    }
    out.push_str("</tbody>\n</table>\n");

    if !screen.pager.is_empty() {
        out.push_str("<nav class=\"pagination\"><ul>");
        let prev = if screen.pager.has_prev { "" } else { " disabled" };
        out.push_str(&format!("<li class=\"page-item{prev}\">&laquo;</li>"));
        for page in &screen.pager.pages {
            let active = if *page == screen.current_page {
                " active"
            } else {
                ""
            };
            out.push_str(&format!("<li class=\"page-item{active}\">{page}</li>"));
        }
        let next = if screen.pager.has_next { "" } else { " disabled" };
        out.push_str(&format!("<li class=\"page-item{next}\">&raquo;</li>"));
        out.push_str("</ul></nav>\n");
    }

    out.push_str("</section>\n");
    out
}
