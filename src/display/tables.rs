//! Table formatting utilities for structured output.

use std::collections::BTreeMap;

use comfy_table::{
    Attribute, Cell, CellAlignment, Color, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_FULL,
};

use crate::context::ServiceStats;
use crate::storage::{CompactionReport, SearchHit};

/// Builder for creating formatted tables.
pub struct TableBuilder {
    table: Table,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    /// Create a new table builder.
    pub fn new() -> Self {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.apply_modifier(UTF8_ROUND_CORNERS);
        Self { table }
    }

    /// Set the table headers.
    pub fn set_headers(mut self, headers: Vec<&str>) -> Self {
        let header_cells: Vec<Cell> = headers
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect();
        self.table.set_header(header_cells);
        self
    }

    /// Add a row to the table.
    pub fn add_row(mut self, row: Vec<String>) -> Self {
        self.table.add_row(row);
        self
    }

    /// Build and return the formatted table.
    pub fn build(self) -> String {
        self.table.to_string()
    }
}

/// Ranked search results.
pub fn create_hits_table(hits: &[SearchHit]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.apply_modifier(UTF8_ROUND_CORNERS);

    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Item").add_attribute(Attribute::Bold),
        Cell::new("Name").add_attribute(Attribute::Bold),
        Cell::new("Category").add_attribute(Attribute::Bold),
        Cell::new("Owner").add_attribute(Attribute::Bold),
        Cell::new("Similarity").add_attribute(Attribute::Bold),
    ]);

    for (rank, hit) in hits.iter().enumerate() {
        let color = if hit.similarity >= 0.8 {
            Color::Green
        } else if hit.similarity >= 0.5 {
            Color::Yellow
        } else {
            Color::Reset
        };
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&hit.metadata.item_id),
            Cell::new(&hit.metadata.name),
            Cell::new(&hit.metadata.category),
            Cell::new(&hit.metadata.owner),
            Cell::new(format!("{:.4}", hit.similarity))
                .fg(color)
                .set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

/// One section per outfit category.
pub fn create_outfit_tables(outfit: &BTreeMap<String, Vec<SearchHit>>) -> String {
    let mut output = String::new();
    for (category, hits) in outfit {
        output.push_str(&format!("{category} ({})\n", hits.len()));
        if hits.is_empty() {
            output.push_str("  no matching items\n\n");
        } else {
            output.push_str(&create_hits_table(hits));
            output.push_str("\n\n");
        }
    }
    output
}

/// Index and service statistics.
pub fn create_stats_table(stats: &ServiceStats) -> String {
    let index = &stats.index;
    let mut builder = TableBuilder::new()
        .set_headers(vec!["Metric", "Value"])
        .add_row(vec!["Live items".into(), index.live_items.to_string()])
        .add_row(vec!["Total slots".into(), index.total_slots.to_string()])
        .add_row(vec!["Orphaned slots".into(), index.orphaned_slots.to_string()])
        .add_row(vec!["Dimension".into(), index.dimension.to_string()])
        .add_row(vec!["Unique owners".into(), index.unique_owners.to_string()])
        .add_row(vec!["Model".into(), stats.model.clone()])
        .add_row(vec![
            "Record store".into(),
            if stats.records_configured {
                "configured".into()
            } else {
                "not configured".into()
            },
        ]);

    for (category, count) in &index.categories {
        builder = builder.add_row(vec![format!("  {category}"), count.to_string()]);
    }
    if let Some(location) = &index.location {
        builder = builder.add_row(vec!["Location".into(), location.display().to_string()]);
    }

    builder.build()
}

/// Before/after slot counts of a compaction.
pub fn create_compaction_table(report: &CompactionReport) -> String {
    TableBuilder::new()
        .set_headers(vec!["Slots before", "Slots after", "Reclaimed"])
        .add_row(vec![
            report.slots_before.to_string(),
            report.slots_after.to_string(),
            report.reclaimed.to_string(),
        ])
        .build()
}
