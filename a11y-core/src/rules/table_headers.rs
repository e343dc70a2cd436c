//! WCAG 1.3.1 Info and Relationships (Level A): data table headers.

use anyhow::Result;

use super::{fix_targets, Rule};
use crate::dom::{Document, NodeId};
use crate::types::{ComplianceLevel, Severity, Violation};

static_selector!(TABLES, "table");

const RULE_ID: &str = "1.3.1-table-headers";

const LAYOUT_CLASSES: &[&str] = &["layout", "layout-table", "presentational", "non-data"];

pub struct TableHeadersRule;

impl Rule for TableHeadersRule {
    fn id(&self) -> &str {
        RULE_ID
    }

    fn description(&self) -> &str {
        "Data tables must identify their header cells"
    }

    fn criterion(&self) -> &str {
        "1.3.1 Info and Relationships"
    }

    fn level(&self) -> ComplianceLevel {
        ComplianceLevel::A
    }

    fn evaluate(&self, document: &Document) -> Result<Vec<Violation>> {
        let mut violations = Vec::new();

        for table in document.select(&TABLES) {
            let grid = TableGrid::read(document, table);
            if grid.is_layout(document, table) {
                continue;
            }

            let header_cells = grid.header_cells(document);
            if header_cells.is_empty() && grid.thead_rows == 0 {
                violations.push(
                    Violation::new(
                        RULE_ID,
                        "missing-headers",
                        document,
                        table,
                        Severity::Serious,
                        "Data table has no header cells",
                    )
                    .with_remediation("Mark the header row with <th scope=\"col\"> cells")
                    .fixable(),
                );
            }

            for th in &header_cells {
                if document.non_empty_attr(*th, "scope").is_none() {
                    violations.push(
                        Violation::new(
                            RULE_ID,
                            "missing-scope",
                            document,
                            *th,
                            Severity::Moderate,
                            "Table header cell lacks a scope attribute",
                        )
                        .with_remediation("Add scope=\"col\" or scope=\"row\" to the header cell")
                        .fixable(),
                    );
                }
            }

            if !header_cells.is_empty() && grid.is_complex(document, table) {
                let associated = grid
                    .cells
                    .iter()
                    .any(|cell| document.tag(*cell) == Some("td") && document.has_attr(*cell, "headers"));
                if !associated {
                    violations.push(
                        Violation::new(
                            RULE_ID,
                            "complex-without-headers",
                            document,
                            table,
                            Severity::Serious,
                            "Complex table does not associate data cells with headers",
                        )
                        .with_remediation("Give header cells ids and reference them from data cells with headers=\"...\""),
                    );
                }
            }

            for th in &header_cells {
                if document.text(*th).is_empty() {
                    violations.push(
                        Violation::new(
                            RULE_ID,
                            "empty-header",
                            document,
                            *th,
                            Severity::Moderate,
                            "Table header cell is empty",
                        )
                        .with_remediation("Give the header cell text describing its row or column"),
                    );
                }
            }
        }

        Ok(violations)
    }

    fn can_auto_fix(&self) -> bool {
        true
    }

    fn apply_fixes(&self, document: &mut Document, violations: &[Violation]) -> Result<usize> {
        let mut fixed = 0;

        for table in fix_targets(document, violations, "missing-headers") {
            let grid = TableGrid::read(document, table);
            if !grid.header_cells(document).is_empty() {
                continue;
            }
            let Some(first_row) = grid.rows.first() else {
                continue;
            };
            for (index, cell) in row_cells(document, *first_row).into_iter().enumerate() {
                if document.tag(cell) != Some("td") {
                    continue;
                }
                document.rename(cell, "th");
                document.set_attr(cell, "scope", "col");
                if document.text(cell).is_empty() {
                    let text = document.create_text(&format!("Column {}", index + 1));
                    document.append_child(cell, text);
                }
                fixed += 1;
            }
        }

        for th in fix_targets(document, violations, "missing-scope") {
            if document.non_empty_attr(th, "scope").is_some() {
                continue;
            }
            let scope = infer_scope(document, th);
            document.set_attr(th, "scope", scope);
            fixed += 1;
        }

        Ok(fixed)
    }
}

/// Rows and cells that belong to one table, excluding nested tables.
struct TableGrid {
    rows: Vec<NodeId>,
    cells: Vec<NodeId>,
    thead_rows: usize,
}

impl TableGrid {
    fn read(document: &Document, table: NodeId) -> Self {
        let rows: Vec<NodeId> = document
            .descendant_elements(table)
            .into_iter()
            .filter(|el| document.tag(*el) == Some("tr") && nearest_table(document, *el) == Some(table))
            .collect();
        let cells = rows
            .iter()
            .flat_map(|row| row_cells(document, *row))
            .collect();
        let thead_rows = rows
            .iter()
            .filter(|row| in_thead(document, **row))
            .count();
        Self {
            rows,
            cells,
            thead_rows,
        }
    }

    fn header_cells(&self, document: &Document) -> Vec<NodeId> {
        self.cells
            .iter()
            .copied()
            .filter(|cell| document.tag(*cell) == Some("th"))
            .collect()
    }

    fn is_layout(&self, document: &Document, table: NodeId) -> bool {
        if matches!(document.attr(table, "role"), Some("presentation" | "none")) {
            return true;
        }
        if LAYOUT_CLASSES.iter().any(|c| document.has_class(table, c)) {
            return true;
        }
        if let Some(parent) = document.parent_element(table) {
            if document.has_class(parent, "layout") || document.has_class(parent, "non-data") {
                return true;
            }
        }
        self.cells.len() <= 2 && self.header_cells(document).is_empty()
    }

    fn is_complex(&self, document: &Document, table: NodeId) -> bool {
        let spans = self.cells.iter().any(|cell| {
            ["rowspan", "colspan"].iter().any(|attr| {
                document
                    .non_empty_attr(*cell, attr)
                    .is_some_and(|value| value != "1")
            })
        });
        if spans || self.thead_rows > 1 {
            return true;
        }

        let column_headers = self.rows.first().is_some_and(|row| {
            row_cells(document, *row)
                .iter()
                .any(|cell| document.tag(*cell) == Some("th"))
        });
        let row_headers = self.rows.iter().skip(1).any(|row| {
            row_cells(document, *row)
                .first()
                .is_some_and(|cell| document.tag(*cell) == Some("th"))
        });
        if column_headers && row_headers {
            return true;
        }

        let has_caption = document
            .element_children(table)
            .iter()
            .any(|child| document.tag(*child) == Some("caption"));
        if has_caption {
            return true;
        }

        let widest = self
            .rows
            .iter()
            .map(|row| row_cells(document, *row).len())
            .max()
            .unwrap_or(0);
        self.rows.len() >= 10 && widest >= 6
    }
}

fn nearest_table(document: &Document, node: NodeId) -> Option<NodeId> {
    document
        .ancestors(node)
        .find(|ancestor| document.tag(*ancestor) == Some("table"))
}

fn in_thead(document: &Document, row: NodeId) -> bool {
    document
        .ancestors(row)
        .take_while(|ancestor| document.tag(*ancestor) != Some("table"))
        .any(|ancestor| document.tag(ancestor) == Some("thead"))
}

fn row_cells(document: &Document, row: NodeId) -> Vec<NodeId> {
    document
        .element_children(row)
        .into_iter()
        .filter(|cell| document.is_tag(*cell, &["td", "th"]))
        .collect()
}

/// Header rows (in `thead`, or made only of `th`) give `col`; the first
/// cell of any other row is a row header.
fn infer_scope(document: &Document, th: NodeId) -> &'static str {
    let Some(row) = document.parent_element(th) else {
        return "col";
    };
    let cells = row_cells(document, row);
    let header_row = in_thead(document, row)
        || cells.iter().all(|cell| document.tag(*cell) == Some("th"));
    if header_row {
        "col"
    } else if cells.first() == Some(&th) {
        "row"
    } else {
        "col"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checks(markup: &str) -> Vec<String> {
        TableHeadersRule
            .evaluate(&Document::parse(markup))
            .unwrap()
            .iter()
            .map(|v| v.check().to_string())
            .collect()
    }

    const PLAIN_TABLE: &str = "<table><tr><td>Name</td><td>Age</td></tr><tr><td>Ann</td><td>31</td></tr></table>";

    #[test]
    fn test_missing_headers() {
        assert_eq!(checks(PLAIN_TABLE), vec!["missing-headers"]);
    }

    #[test]
    fn test_layout_tables_are_skipped() {
        assert!(checks("<table role='presentation'><tr><td>a</td><td>b</td><td>c</td></tr></table>").is_empty());
        assert!(checks("<table class='layout'><tr><td>a</td><td>b</td><td>c</td></tr></table>").is_empty());
        assert!(checks("<table><tr><td>a</td><td>b</td></tr></table>").is_empty());
    }

    #[test]
    fn test_scope_and_empty_headers() {
        let markup = "<table><thead><tr><th scope='col'>Name</th><th></th></tr></thead><tbody><tr><td>a</td><td>b</td></tr></tbody></table>";
        assert_eq!(checks(markup), vec!["missing-scope", "empty-header"]);
    }

    #[test]
    fn test_complex_table_needs_headers_attribute() {
        let markup = "<table><tr><th scope='col'>Q</th><th scope='col'>Sales</th></tr><tr><th scope='row'>Q1</th><td colspan='2'>10</td></tr></table>";
        assert_eq!(checks(markup), vec!["complex-without-headers"]);

        let associated = "<table><tr><th id='q' scope='col'>Q</th><th id='s' scope='col'>Sales</th></tr><tr><th id='q1' scope='row'>Q1</th><td headers='q1 s'>10</td></tr></table>";
        assert!(checks(associated).is_empty());
    }

    fn grid(rows: usize, columns: usize) -> String {
        let header: String = (1..=columns).map(|c| format!("<th scope='col'>C{c}</th>")).collect();
        let body: String = (1..rows)
            .map(|r| {
                let cells: String = (1..=columns).map(|c| format!("<td>{r}.{c}</td>")).collect();
                format!("<tr>{cells}</tr>")
            })
            .collect();
        format!("<table><tr>{header}</tr>{body}</table>")
    }

    #[test]
    fn test_large_table_is_complex() {
        assert_eq!(checks(&grid(10, 6)), vec!["complex-without-headers"]);
        assert!(checks(&grid(9, 6)).is_empty());
        assert!(checks(&grid(10, 5)).is_empty());
    }

    #[test]
    fn test_multiple_thead_rows_make_table_complex() {
        let single = "<table><thead><tr><th scope='col'>Region</th><th scope='col'>Sales</th></tr></thead>\
                      <tbody><tr><td>North</td><td>10</td></tr></tbody></table>";
        assert!(checks(single).is_empty());

        let double = "<table><thead><tr><th scope='col'>Region</th><th scope='col'>Sales</th></tr>\
                      <tr><td></td><th scope='col'>2024</th></tr></thead>\
                      <tbody><tr><td>North</td><td>10</td></tr></tbody></table>";
        assert_eq!(checks(double), vec!["complex-without-headers"]);
    }

    #[test]
    fn test_nested_table_cells_belong_to_nested_table() {
        let markup = "<table><tr><th scope='col'>Outer</th><th scope='col'>B</th></tr><tr><td>x</td><td><table><tr><td>1</td><td>2</td></tr><tr><td>3</td><td>4</td></tr></table></td></tr></table>";
        assert_eq!(checks(markup), vec!["missing-headers"]);
    }

    #[test]
    fn test_fix_promotes_first_row() {
        let doc = Document::parse("<table><tr><td>Name</td><td></td></tr><tr><td>Ann</td><td>31</td></tr></table>");
        let violations = TableHeadersRule.evaluate(&doc).unwrap();
        let mut working = doc.clone();

        assert_eq!(TableHeadersRule.apply_fixes(&mut working, &violations).unwrap(), 2);
        assert_eq!(TableHeadersRule.apply_fixes(&mut working, &violations).unwrap(), 0);
        let html = working.to_html();
        assert!(html.contains(r#"<th scope="col">Name</th><th scope="col">Column 2</th>"#));
        assert!(TableHeadersRule.evaluate(&working).unwrap().is_empty());
    }

    #[test]
    fn test_fix_infers_scope() {
        let doc = Document::parse("<table><tr><th>Name</th><th>Age</th></tr><tr><th>Ann</th><td>31</td></tr></table>");
        let violations = TableHeadersRule.evaluate(&doc).unwrap();
        let mut working = doc.clone();
        assert_eq!(TableHeadersRule.apply_fixes(&mut working, &violations).unwrap(), 3);

        let scopes: Vec<_> = working
            .elements_by_tag("th")
            .into_iter()
            .map(|th| working.attr(th, "scope").unwrap_or_default().to_string())
            .collect();
        assert_eq!(scopes, vec!["col", "col", "row"]);
    }
}
