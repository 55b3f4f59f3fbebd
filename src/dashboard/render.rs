//! Text and JSON renderings of a dashboard model.
//!
//! `render()` produces the fixed-width table shown on a terminal;
//! `snapshot()` produces the machine-readable equivalent for `--json`.

#![allow(missing_docs)]

use std::fmt::Write as _;

use serde::Serialize;

use super::model::{DashboardKind, DashboardModel, RowActions};
use crate::model::record::RequestRecord;
use crate::model::status::Status;
use crate::view::list::Facets;
use crate::view::query::FilterState;

const DESCRIPTION_WIDTH: usize = 40;

// ──────────────────── text ────────────────────

/// Render the current page, pager, and filter line as plain text.
#[must_use]
pub fn render(model: &DashboardModel) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", model.kind.title());
    let _ = writeln!(out, "{}", filter_line(model.kind, &model.filters));

    if model.loading {
        out.push_str("Loading...\n");
        return out;
    }

    let view = model.view();
    if view.page.is_empty() {
        let _ = writeln!(out, "{}", model.kind.empty_message());
        return out;
    }

    let rows: Vec<Vec<String>> = view
        .page
        .iter()
        .map(|record| row_cells(model, record))
        .collect();
    let headers = headers(model.kind);
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    push_row(&mut out, headers.iter().map(|h| (*h).to_string()), &widths);
    let rule: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    let _ = writeln!(out, "{}", "-".repeat(rule));
    for row in rows {
        push_row(&mut out, row.into_iter(), &widths);
    }

    if view.total_pages > 1 {
        let _ = writeln!(
            out,
            "Page {} of {} ({} matching)",
            model.filters.page, view.total_pages, view.filtered_count
        );
    }
    out
}

fn headers(kind: DashboardKind) -> Vec<&'static str> {
    match kind {
        DashboardKind::Admin => vec![
            "ID",
            "Category",
            "Description",
            "Created On",
            "Updated On",
            "Created By",
            "Status",
            "Actions",
        ],
        DashboardKind::User => vec![
            "ID",
            "Category",
            "Description",
            "Created On",
            "Updated On",
            "Status",
            "Actions",
        ],
    }
}

fn row_cells(model: &DashboardModel, record: &RequestRecord) -> Vec<String> {
    let mut cells = vec![
        record.id.to_string(),
        record.category.clone(),
        truncate(&record.description, DESCRIPTION_WIDTH),
        model.zone.display_day(record.created_at.as_ref()),
        model.zone.display_day(record.updated_at.as_ref()),
    ];
    if model.kind == DashboardKind::Admin {
        cells.push(record.created_by.clone());
    }
    cells.push(record.status.label());
    cells.push(actions_cell(&model.row_actions(record)));
    cells
}

fn actions_cell(actions: &RowActions) -> String {
    if actions.can_delete {
        return "delete".to_string();
    }
    if actions.status_targets.is_empty() {
        return "-".to_string();
    }
    let targets: Vec<&str> = actions.status_targets.iter().map(|s| s.as_str()).collect();
    format!("set: {}", targets.join("|"))
}

fn push_row(out: &mut String, cells: impl Iterator<Item = String>, widths: &[usize]) {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    let _ = writeln!(out, "{}", line.join("  ").trim_end());
}

fn filter_line(kind: DashboardKind, filters: &FilterState) -> String {
    let mut parts = vec![format!(
        "status={}",
        filters.status.map_or("all", Status::as_str)
    )];
    if kind == DashboardKind::Admin {
        parts.push(format!(
            "category={}",
            filters.category.as_deref().unwrap_or("all")
        ));
        parts.push(format!(
            "created_by={}",
            filters.created_by.as_deref().unwrap_or("all")
        ));
    }
    parts.push(format!(
        "date={}",
        filters
            .created_on
            .map_or_else(|| "any".to_string(), |d| d.format("%Y-%m-%d").to_string())
    ));
    parts.push(format!("sort={}", filters.sort_order.label()));
    format!("Filters: {}", parts.join(" "))
}

/// Cut to `max` characters, ending in `...` when shortened.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

// ──────────────────── json ────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSnapshot<'a> {
    #[serde(flatten)]
    pub record: &'a RequestRecord,
    pub status_label: String,
    pub created_on: String,
    pub updated_on: String,
    pub actions: RowActions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot<'a> {
    pub dashboard: DashboardKind,
    pub filters: &'a FilterState,
    pub page_size: usize,
    pub total_pages: usize,
    pub filtered_count: usize,
    pub rows: Vec<RowSnapshot<'a>>,
    pub facets: Facets,
}

/// Serializable view of the current page.
#[must_use]
pub fn snapshot(model: &DashboardModel) -> DashboardSnapshot<'_> {
    let view = model.view();
    let rows = view
        .page
        .into_iter()
        .map(|record| RowSnapshot {
            record,
            status_label: record.status.label(),
            created_on: model.zone.display_day(record.created_at.as_ref()),
            updated_on: model.zone.display_day(record.updated_at.as_ref()),
            actions: model.row_actions(record),
        })
        .collect();
    DashboardSnapshot {
        dashboard: model.kind,
        filters: &model.filters,
        page_size: model.page_size,
        total_pages: view.total_pages,
        filtered_count: view.filtered_count,
        rows,
        facets: view.facets,
    }
}
