use std::path::Path;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use indicatif::HumanBytes;
use ja_store::{ConversionReport, TableDimensions};

use crate::types::StatusReport;

pub fn print_conversion_summary(report: &ConversionReport) {
    println!("Output: {}", report.output.display());
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Source"),
        header_cell("Columns"),
        header_cell("Rows"),
        header_cell("Chunks"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Right);
    let mut total_chunks = 0usize;
    for summary in &report.tables {
        total_chunks += summary.chunks;
        table.add_row(vec![
            table_cell(&summary.table),
            Cell::new(file_name(&summary.source)),
            Cell::new(summary.columns),
            count_cell(summary.rows),
            Cell::new(summary.chunks),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell(HumanBytes(report.database_bytes)),
        dim_cell("-"),
        Cell::new(report.total_rows()).add_attribute(Attribute::Bold),
        Cell::new(total_chunks).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
}

pub fn print_table_dimensions(
    database: &Path,
    dimensions: &[TableDimensions],
    renamed: &[(String, String)],
    missing: &[String],
) {
    println!("Database: {}", database.display());
    for (from, to) in renamed {
        println!("Renamed: {from} -> {to}");
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Rows"),
        header_cell("Columns"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for dims in dimensions {
        table.add_row(vec![
            table_cell(&dims.name),
            count_cell(dims.rows),
            Cell::new(dims.columns),
        ]);
    }
    for name in missing {
        table.add_row(vec![
            Cell::new(name).fg(Color::Red),
            Cell::new("missing")
                .fg(Color::Red)
                .add_attribute(Attribute::Bold),
            dim_cell("-"),
        ]);
    }
    println!("{table}");
}

pub fn print_status(status: &StatusReport) {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.add_row(vec![key_cell("Cache"), Cell::new(status.cache_dir.display())]);
    table.add_row(vec![key_cell("Algorithm"), Cell::new(status.algorithm)]);
    table.add_row(vec![key_cell("Original"), path_cell(status.original.as_deref())]);
    table.add_row(vec![key_cell("Slim"), path_cell(status.slim.as_deref())]);
    table.add_row(vec![key_cell("Slim exists"), flag_cell(status.slim_exists, Color::Green)]);
    table.add_row(vec![
        key_cell("Original changed"),
        flag_cell(status.original_changed, Color::Yellow),
    ]);
    table.add_row(vec![
        key_cell("Slim changed"),
        flag_cell(status.slim_changed, Color::Yellow),
    ]);
    let reason = if status.needs_reprocessing {
        Cell::new(&status.reason)
            .fg(Color::Yellow)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new(&status.reason)
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    };
    table.add_row(vec![key_cell("Status"), reason]);
    println!("{table}");
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn key_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn table_cell(name: &str) -> Cell {
    Cell::new(name)
        .fg(Color::Blue)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: u64) -> Cell {
    if count > 0 {
        Cell::new(count)
    } else {
        dim_cell(count)
    }
}

fn flag_cell(value: bool, color: Color) -> Cell {
    if value {
        Cell::new("yes").fg(color)
    } else {
        dim_cell("no")
    }
}

fn path_cell(path: Option<&Path>) -> Cell {
    match path {
        Some(path) => Cell::new(path.display()),
        None => dim_cell("-"),
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
