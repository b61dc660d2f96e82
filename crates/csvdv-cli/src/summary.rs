//! Tables printed after `run` and `check`.

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use csvdv_ingest::{ParserConfig, RunSummary, SkippedLine};

/// Longest line content shown in the skipped-lines table.
const CONTENT_PREVIEW_CHARS: usize = 60;

pub fn print_run_summary(summary: &RunSummary) {
    eprintln!("{}", run_summary_table(summary));
    if !summary.skipped.is_empty() {
        eprintln!("{}", skipped_lines_table(&summary.skipped));
    }
}

pub fn print_schema(config: &ParserConfig) {
    println!("{}", schema_table(config));
}

pub fn run_summary_table(summary: &RunSummary) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Metric"), header_cell("Count")]);
    apply_summary_table_style(&mut table);
    table.add_row(vec![Cell::new("Files"), Cell::new(summary.files)]);
    table.add_row(vec![Cell::new("Records"), Cell::new(summary.records)]);
    table.add_row(vec![
        Cell::new("Skipped lines"),
        count_cell(summary.skipped_count() as u64, Color::Red),
    ]);
    table.add_row(vec![
        Cell::new("Defaults applied"),
        count_cell(summary.defaults_applied, Color::Yellow),
    ]);
    table.add_row(vec![
        Cell::new("Extra columns discarded"),
        count_cell(summary.extra_columns_discarded, Color::Yellow),
    ]);
    align_column(&mut table, 1, CellAlignment::Right);
    table
}

pub fn skipped_lines_table(skipped: &[SkippedLine]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("File"),
        header_cell("Line"),
        header_cell("Reason"),
        header_cell("Content"),
    ]);
    apply_summary_table_style(&mut table);
    for line in skipped {
        table.add_row(vec![
            dim_cell(line.file_index + 1),
            Cell::new(line.line_number),
            Cell::new(&line.reason).fg(Color::Red),
            dim_cell(preview(&line.line)),
        ]);
    }
    align_column(&mut table, 1, CellAlignment::Right);
    table
}

pub fn schema_table(config: &ParserConfig) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Column"),
        header_cell("Type"),
        header_cell("Format"),
        header_cell("Default"),
    ]);
    apply_summary_table_style(&mut table);
    for column in config.schema.iter() {
        let format = match config.timestamp_parser(column.index) {
            Some(parser) => Cell::new(format!("{} ({})", parser.format(), parser.timezone())),
            None => dim_cell("-"),
        };
        let default = match config.default_values.get(&column.name) {
            Some(default) => match &default.default_value {
                Some(literal) => Cell::new(format!("{} {literal}", default.kind.as_str())),
                None => Cell::new(default.kind.as_str()),
            },
            None => dim_cell("-"),
        };
        table.add_row(vec![
            dim_cell(column.index),
            Cell::new(&column.name).add_attribute(Attribute::Bold),
            Cell::new(column.column_type.as_str()),
            format,
            default,
        ]);
    }
    table
}

fn preview(line: &str) -> String {
    if line.chars().count() <= CONTENT_PREVIEW_CHARS {
        return line.to_string();
    }
    let mut short: String = line.chars().take(CONTENT_PREVIEW_CHARS).collect();
    short.push('…');
    short
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn count_cell(count: u64, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
