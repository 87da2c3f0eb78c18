//! Tabular query results.

use serde_json::Value;

use crate::engine::EngineError;

/// Selected variables × rows. A variable left unbound in a row is `None`.
///
/// Tables are values: transforms build new tables instead of mutating.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl ResultTable {
    /// Build a table; each row is padded or cut to the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// The "no results" stand-in returned after transport failure.
    pub fn empty_sentinel() -> Self {
        Self::new(vec!["nothing".to_string()], Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, column: usize) -> impl Iterator<Item = Option<&str>> {
        self.rows
            .iter()
            .map(move |row| row.get(column).and_then(|v| v.as_deref()))
    }

    /// Decode SPARQL 1.1 JSON results (`head.vars` + `results.bindings`).
    ///
    /// ASK results become a one-cell `boolean` table.
    pub fn from_sparql_json(v: &Value) -> Result<Self, EngineError> {
        if let Some(b) = v.get("boolean").and_then(|b| b.as_bool()) {
            return Ok(Self::new(
                vec!["boolean".to_string()],
                vec![vec![Some(b.to_string())]],
            ));
        }

        let vars = v
            .get("head")
            .and_then(|h| h.get("vars"))
            .and_then(|vars| vars.as_array())
            .ok_or_else(|| EngineError::InvalidResponse("missing head.vars".to_string()))?;
        let columns: Vec<String> = vars
            .iter()
            .filter_map(|x| x.as_str().map(str::to_string))
            .collect();

        let bindings = v
            .get("results")
            .and_then(|r| r.get("bindings"))
            .and_then(|b| b.as_array())
            .ok_or_else(|| EngineError::InvalidResponse("missing results.bindings".to_string()))?;

        let rows = bindings
            .iter()
            .map(|binding| {
                columns
                    .iter()
                    .map(|var| {
                        binding
                            .get(var)
                            .and_then(|cell| cell.get("value"))
                            .and_then(|value| value.as_str())
                            .map(str::to_string)
                    })
                    .collect()
            })
            .collect();

        Ok(Self::new(columns, rows))
    }

    /// Pipe-table markdown, one line per row, no index column.
    pub fn to_markdown(&self) -> String {
        self.to_markdown_with(|s| s.to_string())
    }

    /// Markdown with a per-cell display mapping (e.g. IRI shortening).
    pub fn to_markdown_with(&self, display: impl Fn(&str) -> String) -> String {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|v| escape_cell(&v.as_deref().map(&display).unwrap_or_default()))
                    .collect()
            })
            .collect();
        let headers: Vec<String> = self.columns.iter().map(|c| escape_cell(c)).collect();

        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                cells
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(h.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        push_row(&mut out, &headers, &widths);
        out.push('\n');
        out.push('|');
        for w in &widths {
            out.push(':');
            out.push_str(&"-".repeat(w + 1));
            out.push('|');
        }
        for row in &cells {
            out.push('\n');
            push_row(&mut out, row, &widths);
        }
        out
    }
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\r', '\n'], " ")
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    out.push('|');
    for (cell, w) in cells.iter().zip(widths) {
        out.push(' ');
        out.push_str(cell);
        out.push_str(&" ".repeat(w - cell.chars().count()));
        out.push_str(" |");
    }
}
