//! Dispatch table row parser.
//!
//! The dispatch page is a single `<table>` in which each incident is a
//! `<tr id="row_N">` whose cells carry `class="active"` while the incident
//! is open. Cells have no headers and the column set differs between feed
//! variants (with or without an alarm level), so rows are read positionally:
//! the parser walks the document in order and tracks which column the next
//! piece of non-blank text belongs to.

use scraper::node::{Element, Text};
use scraper::{ElementRef, Html, Node};
use sea_fires_feed_models::{RawRow, RowSchema};

/// `id` prefix marking an incident row.
const ROW_ID_PREFIX: &str = "row_";

/// `class` value carried by the cells of an open incident.
const ACTIVE_CLASS: &str = "active";

/// Cell count of a row without the level column.
const COMPACT_CELLS: usize = 5;

/// Cell count of a row with the level column.
const LEVELED_CELLS: usize = 6;

/// The column the next captured text belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    /// Outside a row, or inside a suppressed one.
    None,
    Time,
    Id,
    Level,
    Units,
    Location,
    Type,
}

impl Column {
    /// The column after this one. `Type` is terminal.
    const fn next(self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Time => Self::Id,
            Self::Id => Self::Level,
            Self::Level => Self::Units,
            Self::Units => Self::Location,
            Self::Location | Self::Type => Self::Type,
        }
    }
}

/// Pending work while walking the document tree.
enum Step<'a> {
    Enter(ElementRef<'a>),
    Leave(ElementRef<'a>),
    Text(&'a Text),
}

/// Single-pass scanner turning a dispatch page into [`RawRow`]s.
///
/// A parser can be reused: every call to [`RowParser::feed`] discards the
/// rows and any half-read row left over from the previous document.
#[derive(Debug)]
pub struct RowParser {
    next_column: Column,
    cells: Vec<String>,
    rows: Vec<RawRow>,
}

impl Default for RowParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RowParser {
    /// Creates an empty parser.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_column: Column::None,
            cells: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Parses `document`, replacing any rows read from a previous document.
    ///
    /// Returns the active rows in document order.
    pub fn feed(&mut self, document: &str) -> &[RawRow] {
        self.next_column = Column::None;
        self.cells.clear();
        self.rows.clear();

        let html = Html::parse_document(document);
        self.walk(html.root_element());

        log::debug!("Parsed {} active row(s)", self.rows.len());
        &self.rows
    }

    /// Rows read from the most recent document.
    #[must_use]
    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    /// Takes the rows read from the most recent document, leaving the
    /// parser empty.
    #[must_use]
    pub fn take_rows(&mut self) -> Vec<RawRow> {
        std::mem::take(&mut self.rows)
    }

    /// Visits the tree in document order without recursing, so nesting
    /// depth is bounded by the heap rather than the call stack.
    fn walk(&mut self, root: ElementRef<'_>) {
        let mut pending = vec![Step::Enter(root)];

        while let Some(step) = pending.pop() {
            match step {
                Step::Enter(element) => {
                    self.start_tag(element.value());
                    pending.push(Step::Leave(element));
                    for child in element.children().rev() {
                        match child.value() {
                            Node::Text(text) => pending.push(Step::Text(text)),
                            Node::Element(_) => {
                                if let Some(child) = ElementRef::wrap(child) {
                                    pending.push(Step::Enter(child));
                                }
                            }
                            _ => {}
                        }
                    }
                }
                Step::Leave(element) => self.end_tag(element.value().name()),
                Step::Text(text) => self.text(text),
            }
        }
    }

    fn start_tag(&mut self, element: &Element) {
        match element.name() {
            "tr" => {
                if element
                    .attr("id")
                    .is_some_and(|id| id.starts_with(ROW_ID_PREFIX))
                {
                    self.cells.clear();
                    self.next_column = Column::Time;
                }
            }
            "td" if self.next_column != Column::None => {
                if element.attr("class").is_some_and(|c| c != ACTIVE_CLASS) {
                    // Closed incident; nothing else in this row is read.
                    self.cells.clear();
                    self.next_column = Column::None;
                }
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, name: &str) {
        if name != "tr" || self.next_column == Column::None {
            return;
        }

        let cells = std::mem::take(&mut self.cells);
        if let Some(row) = assemble_row(cells) {
            self.rows.push(row);
        }
        self.next_column = Column::None;
    }

    fn text(&mut self, text: &str) {
        if self.next_column == Column::None {
            return;
        }

        let text = text.trim();
        if text.is_empty() {
            return;
        }

        if self.next_column == Column::Type && self.cells.len() >= LEVELED_CELLS {
            log::trace!("Ignoring trailing row text {text:?}");
            return;
        }

        self.cells.push(text.to_string());
        self.next_column = self.next_column.next();
    }
}

/// Builds a row from its captured cells, choosing the layout by cell count.
///
/// Returns `None` for rows with fewer than five cells.
fn assemble_row(cells: Vec<String>) -> Option<RawRow> {
    match cells.len() {
        COMPACT_CELLS => {
            let [timestamp_text, id, units_text, location_text, type_text] =
                <[String; COMPACT_CELLS]>::try_from(cells).ok()?;
            Some(RawRow {
                id,
                timestamp_text,
                units_text,
                location_text,
                type_text,
                schema: RowSchema::Compact,
            })
        }
        LEVELED_CELLS => {
            let [timestamp_text, id, level, units_text, location_text, type_text] =
                <[String; LEVELED_CELLS]>::try_from(cells).ok()?;
            let level = level.parse().unwrap_or_else(|_| {
                log::debug!("Row {id} has non-numeric level {level:?}, using 0");
                0
            });
            Some(RawRow {
                id,
                timestamp_text,
                units_text,
                location_text,
                type_text,
                schema: RowSchema::Leveled { level },
            })
        }
        n => {
            log::debug!("Dropping malformed row with {n} cell(s): {cells:?}");
            None
        }
    }
}

/// Parses `document` with a fresh [`RowParser`].
#[must_use]
pub fn parse_rows(document: &str) -> Vec<RawRow> {
    let mut parser = RowParser::new();
    parser.feed(document);
    parser.take_rows()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &str) -> String {
        format!("<html><body><table>{rows}</table></body></html>")
    }

    fn active_row(n: u32, cells: &[&str]) -> String {
        let cells: String = cells
            .iter()
            .map(|c| format!("<td class=\"active\">{c}</td>"))
            .collect();
        format!("<tr id=\"row_{n}\">{cells}</tr>\n")
    }

    #[test]
    fn parses_leveled_rows_in_document_order() {
        let doc = table(&format!(
            "{}{}",
            active_row(
                1,
                &[
                    "12/25/2022 01:15:30 PM",
                    "F220001",
                    "1",
                    "E1 M32",
                    "3rd Ave / Pine St",
                    "Aid Response"
                ]
            ),
            active_row(
                2,
                &[
                    "12/25/2022 01:20:00 PM",
                    "F220002",
                    "2",
                    "E17 L9",
                    "1200 Broadway",
                    "Fire in Building"
                ]
            ),
        ));

        let rows = parse_rows(&doc);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "F220001");
        assert_eq!(rows[0].timestamp_text, "12/25/2022 01:15:30 PM");
        assert_eq!(rows[0].schema, RowSchema::Leveled { level: 1 });
        assert_eq!(rows[0].units_text, "E1 M32");
        assert_eq!(rows[0].location_text, "3rd Ave / Pine St");
        assert_eq!(rows[0].type_text, "Aid Response");
        assert_eq!(rows[1].id, "F220002");
        assert_eq!(rows[1].level(), 2);
        assert_eq!(rows[1].type_text, "Fire in Building");
    }

    #[test]
    fn five_cells_are_compact_rows() {
        let doc = table(&active_row(
            1,
            &[
                "1/2/2023 9:05:00 AM",
                "F230010",
                "E5",
                "Rainier Ave S",
                "Medic Response",
            ],
        ));

        let rows = parse_rows(&doc);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].schema, RowSchema::Compact);
        assert_eq!(rows[0].level(), 0);
        assert_eq!(rows[0].units_text, "E5");
        assert_eq!(rows[0].location_text, "Rainier Ave S");
        assert_eq!(rows[0].type_text, "Medic Response");
    }

    #[test]
    fn single_field_row_is_dropped() {
        let doc = r#"<tr id="row_1"><td class="active">only-one-field</td></tr>"#;
        assert!(parse_rows(doc).is_empty());
        assert!(parse_rows(&table(doc)).is_empty());
    }

    #[test]
    fn short_rows_are_dropped_without_affecting_neighbours() {
        let doc = table(&format!(
            "{}{}",
            active_row(1, &["a", "b", "c", "d"]),
            active_row(2, &["t", "id2", "u", "loc", "type"]),
        ));

        let rows = parse_rows(&doc);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "id2");
    }

    #[test]
    fn inactive_rows_are_suppressed() {
        let doc = table(concat!(
            r#"<tr id="row_1"><td class="closed">t</td><td class="active">id1</td>"#,
            r#"<td class="active">1</td><td class="active">E1</td>"#,
            r#"<td class="active">loc</td><td class="active">type</td></tr>"#,
            r#"<tr id="row_2"><td class="active">t</td><td class="active">id2</td>"#,
            r#"<td class="active">E2</td><td class="active">loc</td>"#,
            r#"<td class="active">type</td></tr>"#,
        ));

        let rows = parse_rows(&doc);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "id2");
    }

    #[test]
    fn rows_without_prefixed_id_are_ignored() {
        let doc = table(concat!(
            r#"<tr id="header"><td class="active">Date</td><td>Incident</td>"#,
            r"<td>Level</td><td>Units</td><td>Location</td><td>Type</td></tr>",
            r#"<tr><td class="active">t</td><td>i</td><td>u</td><td>l</td><td>y</td></tr>"#,
        ));
        assert!(parse_rows(&doc).is_empty());
    }

    #[test]
    fn blank_text_is_not_a_field() {
        let doc = table(concat!(
            "<tr id=\"row_1\">\n  <td class=\"active\">t</td>\n  <td class=\"active\">   </td>\n",
            "  <td class=\"active\">id</td><td class=\"active\">E1</td>\n",
            "  <td class=\"active\">loc</td><td class=\"active\">type</td>\n</tr>",
        ));

        let rows = parse_rows(&doc);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].schema, RowSchema::Compact);
        assert_eq!(rows[0].id, "id");
    }

    #[test]
    fn trailing_text_after_type_is_ignored() {
        let doc = table(&active_row(
            1,
            &["t", "id", "1", "E1", "loc", "Aid Response", "(more)", "(even more)"],
        ));

        let rows = parse_rows(&doc);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].type_text, "Aid Response");
    }

    #[test]
    fn non_numeric_level_defaults_to_zero() {
        let doc = table(&active_row(1, &["t", "id", "?", "E1", "loc", "type"]));
        let rows = parse_rows(&doc);
        assert_eq!(rows[0].schema, RowSchema::Leveled { level: 0 });
    }

    #[test]
    fn feed_resets_between_documents() {
        let mut parser = RowParser::new();
        let first = table(&active_row(1, &["t", "first", "u", "loc", "type"]));
        let second = table(&active_row(1, &["t", "second", "u", "loc", "type"]));

        assert_eq!(parser.feed(&first).len(), 1);
        let rows = parser.feed(&second);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "second");

        assert!(parser.feed("<html></html>").is_empty());
        assert!(parser.rows().is_empty());
    }

    #[test]
    fn suppressed_cells_do_not_leak_into_next_row() {
        let doc = table(concat!(
            r#"<tr id="row_1"><td class="active">t</td><td class="active">id1</td>"#,
            r#"<td class="closed">u</td><td>loc</td><td>type</td></tr>"#,
            r#"<tr id="row_2"><td class="active">t2</td><td class="active">id2</td>"#,
            r#"<td class="active">u</td><td class="active">loc</td>"#,
            r#"<td class="active">type</td></tr>"#,
        ));

        let rows = parse_rows(&doc);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp_text, "t2");
        assert_eq!(rows[0].id, "id2");
    }

    #[test]
    fn nested_markup_text_is_captured_per_node() {
        let doc = table(concat!(
            r#"<tr id="row_7"><td class="active">t</td>"#,
            r#"<td class="active"><a href="/inc/7">F7</a></td>"#,
            r#"<td class="active"><span>E1 E2</span></td>"#,
            r#"<td class="active">loc</td><td class="active">type</td></tr>"#,
        ));

        let rows = parse_rows(&doc);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "F7");
        assert_eq!(rows[0].units_text, "E1 E2");
    }

    #[test]
    fn deeply_nested_document_is_walked() {
        const DEPTH: usize = 10_000;
        let doc = format!(
            "<html><body>{}<table>{}</table>{}</body></html>",
            "<div>".repeat(DEPTH),
            active_row(1, &["t", "deep", "u", "loc", "type"]),
            "</div>".repeat(DEPTH),
        );

        let rows = parse_rows(&doc);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "deep");
    }
}
