use std::collections::BTreeMap;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use bids_core::SkippedSeries;
use bids_model::{LabelSpec, MappingTable, RuleSet, SemanticType};

use crate::types::{MapOutcome, PlannedSeries};

const TYPE_COUNT: usize = SemanticType::ALL.len();

/// Series counts for one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectCounts {
    pub subject: String,
    pub sessions: usize,
    /// Indexed like [`SemanticType::ALL`].
    pub by_type: [usize; TYPE_COUNT],
}

impl SubjectCounts {
    pub fn total(&self) -> usize {
        self.by_type.iter().sum()
    }
}

/// Per-subject counts in subject-id order.
pub fn subject_counts(table: &MappingTable) -> Vec<SubjectCounts> {
    let mut subjects: BTreeMap<&str, (Vec<&str>, [usize; TYPE_COUNT])> =
        BTreeMap::new();
    for record in table.records() {
        let subject = record.subject_id.as_deref().unwrap_or_default();
        let (sessions, by_type) = subjects.entry(subject).or_default();
        let session = record.session_id.as_deref().unwrap_or_default();
        if !sessions.contains(&session) {
            sessions.push(session);
        }
        if let Some(index) = SemanticType::ALL
            .iter()
            .position(|kind| *kind == record.classification.semantic_type)
        {
            by_type[index] += 1;
        }
    }
    subjects
        .into_iter()
        .map(|(subject, (sessions, by_type))| SubjectCounts {
            subject: subject.to_string(),
            sessions: sessions.len(),
            by_type,
        })
        .collect()
}

pub fn print_map_summary(outcome: &MapOutcome) {
    println!("DICOM root: {}", outcome.dicom_dir.display());
    match &outcome.output {
        Some(path) => println!("Mapping table: {}", path.display()),
        None => println!("Mapping table: not written (dry run)"),
    }
    println!(
        "Series: {} discovered, {} mapped, {} skipped ({} workers)",
        outcome.discovered(),
        outcome.table.len(),
        outcome.skipped.len(),
        outcome.workers
    );
    if !outcome.table.is_empty() {
        println!("{}", subject_table(&outcome.table));
    }
    if !outcome.skipped.is_empty() {
        println!();
        println!("Skipped:");
        println!("{}", skipped_table(&outcome.skipped));
    }
}

pub fn subject_table(table: &MappingTable) -> Table {
    let counts = subject_counts(table);
    let mut header = vec![header_cell("Subject"), header_cell("Sessions")];
    header.extend(SemanticType::ALL.iter().map(|kind| header_cell(kind.as_str())));
    header.push(header_cell("Series"));

    let mut out = Table::new();
    out.set_header(header);
    apply_summary_table_style(&mut out);
    for index in 1..=TYPE_COUNT + 2 {
        align_column(&mut out, index, CellAlignment::Right);
    }

    let mut totals = [0usize; TYPE_COUNT];
    let mut total_sessions = 0usize;
    for subject in &counts {
        total_sessions += subject.sessions;
        let mut row = vec![
            Cell::new(&subject.subject)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(subject.sessions),
        ];
        for (index, count) in subject.by_type.iter().enumerate() {
            totals[index] += count;
            row.push(count_cell(*count));
        }
        row.push(Cell::new(subject.total()));
        out.add_row(row);
    }

    let mut total_row = vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(total_sessions).add_attribute(Attribute::Bold),
    ];
    total_row.extend(
        totals
            .iter()
            .map(|count| count_cell(*count).add_attribute(Attribute::Bold)),
    );
    total_row.push(Cell::new(table.len()).add_attribute(Attribute::Bold));
    out.add_row(total_row);
    out
}

pub fn skipped_table(skipped: &[SkippedSeries]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Series"), header_cell("Reason")]);
    apply_table_style(&mut table);
    for series in skipped {
        table.add_row(vec![
            Cell::new(series.locator.as_str()),
            Cell::new(series.reason.to_string()).fg(Color::Yellow),
        ]);
    }
    table
}

pub fn heuristics_table(ruleset: &RuleSet) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Type"),
        header_cell("#"),
        header_cell("Field"),
        header_cell("Include"),
        header_cell("Exclude"),
        header_cell("Modality"),
        header_cell("Task"),
        header_cell("Acq"),
        header_cell("Rec"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for group in ruleset.groups() {
        for (index, rule) in group.rules.iter().enumerate() {
            table.add_row(vec![
                Cell::new(group.semantic_type.as_str())
                    .fg(Color::Blue)
                    .add_attribute(Attribute::Bold),
                Cell::new(index),
                Cell::new(rule.header_field.name()),
                Cell::new(rule.include.join(", ")),
                terms_cell(&rule.exclude),
                Cell::new(&rule.modality),
                label_cell(rule.task.as_ref()),
                label_cell(rule.acq.as_ref()),
                label_cell(rule.rec.as_ref()),
            ]);
        }
    }
    table
}

pub fn print_plan(planned: &[PlannedSeries]) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Series"), header_cell("Output")]);
    apply_table_style(&mut table);
    for series in planned {
        let target = match &series.target {
            Ok(path) => Cell::new(path.display()),
            Err(message) => Cell::new(message).fg(Color::Red),
        };
        table.add_row(vec![Cell::new(&series.scan_dir), target]);
    }
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
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

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize) -> Cell {
    if count == 0 {
        dim_cell(count)
    } else {
        Cell::new(count)
    }
}

fn terms_cell(terms: &[String]) -> Cell {
    if terms.is_empty() {
        dim_cell("-")
    } else {
        Cell::new(terms.join(", "))
    }
}

fn label_cell(label: Option<&LabelSpec>) -> Cell {
    match label {
        Some(LabelSpec::Fixed(label)) => Cell::new(label),
        Some(LabelSpec::Pattern(pattern)) => Cell::new(format!("/{pattern}/")).fg(Color::Magenta),
        None => dim_cell("-"),
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
