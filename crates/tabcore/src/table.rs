//! Tabular results passed between tools.
//!
//! A [`Table`] serializes in a split layout (`columns`, `index`, `data`) so
//! the API layer can hand it to a client without knowing its shape.

use crate::{TableError, Value};
use serde::{Deserialize, Serialize};

/// Inferred type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every non-null cell is a number.
    Numeric,
    /// At least one non-null cell is text.
    Text,
    /// No non-null cells at all.
    Empty,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    index: Vec<Value>,
    data: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            index: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Appends a row labelled with the next positional index.
    ///
    /// Short rows are padded with nulls; long rows are truncated.
    pub fn push_row(&mut self, row: Vec<Value>) {
        let label = Value::from(self.data.len());
        self.push_labelled_row(label, row);
    }

    pub fn push_labelled_row(&mut self, label: impl Into<Value>, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.index.push(label.into());
        self.data.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index(&self) -> &[Value] {
        &self.index
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.data
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.data.len(), self.columns.len())
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, position: usize) -> impl Iterator<Item = &Value> + '_ {
        self.data.iter().filter_map(move |row| row.get(position))
    }

    pub fn column_kind(&self, position: usize) -> ColumnKind {
        let mut kind = ColumnKind::Empty;
        for cell in self.column(position) {
            match cell {
                Value::Null => {}
                Value::Integer(_) | Value::Float(_) => kind = ColumnKind::Numeric,
                Value::Text(_) => return ColumnKind::Text,
            }
        }
        kind
    }

    /// Parses delimited text with a header row.
    ///
    /// Fields may be wrapped in double quotes; a doubled quote inside a quoted
    /// field is a literal quote. Blank lines are skipped.
    pub fn from_delimited(text: &str, separator: char) -> Result<Self, TableError> {
        let records = split_records(text, separator)?;
        let mut records = records.into_iter();

        let (_, header) = records.next().ok_or(TableError::MissingHeader)?;
        let mut table = Table::new(header.into_iter().map(|h| h.trim().to_string()).collect());
        let expected = table.columns.len();

        for (line, fields) in records {
            if fields.len() != expected {
                return Err(TableError::RaggedRow {
                    line,
                    expected,
                    found: fields.len(),
                });
            }
            table.push_row(fields.iter().map(|f| Value::parse(f)).collect());
        }

        Ok(table)
    }
}

fn split_records(text: &str, separator: char) -> Result<Vec<(usize, Vec<String>)>, TableError> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    // Set once any field of the current record was quoted, so `""` is data.
    let mut quoted = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                quoted = true;
            }
            '\r' => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                if quoted || !(fields.len() == 1 && fields[0].is_empty()) {
                    records.push((record_line, std::mem::take(&mut fields)));
                }
                fields.clear();
                quoted = false;
                line += 1;
                record_line = line;
            }
            c if c == separator => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(TableError::UnterminatedQuote(record_line));
    }
    if quoted || !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push((record_line, fields));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_typed_cells() {
        let table = Table::from_delimited("name,age,score\nada,36,1.5\nbob,,2\n", ',').unwrap();

        assert_eq!(table.columns(), ["name", "age", "score"]);
        assert_eq!(table.shape(), (2, 3));
        assert_eq!(
            table.rows()[0],
            vec![Value::from("ada"), Value::Integer(36), Value::Float(1.5)]
        );
        assert_eq!(table.rows()[1][1], Value::Null);
        assert_eq!(table.index(), [Value::Integer(0), Value::Integer(1)]);
    }

    #[test]
    fn quoted_fields_keep_separators_and_quotes() {
        let text = "city,note\n\"Paris, FR\",\"say \"\"hi\"\"\"\n";
        let table = Table::from_delimited(text, ',').unwrap();

        assert_eq!(table.rows()[0][0], Value::from("Paris, FR"));
        assert_eq!(table.rows()[0][1], Value::from("say \"hi\""));
    }

    #[test]
    fn ragged_rows_are_rejected_with_their_line() {
        let err = Table::from_delimited("a,b\n1,2\n3\n", ',').unwrap_err();
        assert_eq!(
            err,
            TableError::RaggedRow {
                line: 3,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn blank_lines_and_crlf_are_tolerated() {
        let table = Table::from_delimited("a\tb\r\n1\t2\r\n\r\n3\t4", '\t').unwrap();
        assert_eq!(table.shape(), (2, 2));
        assert_eq!(table.rows()[1], vec![Value::Integer(3), Value::Integer(4)]);
    }

    #[test]
    fn quoted_empty_field_is_a_row() {
        let table = Table::from_delimited("name\n\"\"\nbob\n\n\"\"", ',').unwrap();
        assert_eq!(table.shape(), (3, 1));
        assert_eq!(table.rows()[0], vec![Value::Null]);
        assert_eq!(table.rows()[1], vec![Value::from("bob")]);
    }

    #[test]
    fn empty_input_has_no_header() {
        assert_eq!(Table::from_delimited("", ','), Err(TableError::MissingHeader));
    }

    #[test]
    fn column_kinds_ignore_nulls() {
        let table = Table::from_delimited("n,t,e\n1,x,\n,2,\n", ',').unwrap();
        assert_eq!(table.column_kind(0), ColumnKind::Numeric);
        assert_eq!(table.column_kind(1), ColumnKind::Text);
        assert_eq!(table.column_kind(2), ColumnKind::Empty);
    }

    #[test]
    fn serializes_in_split_layout() {
        let mut table = Table::new(vec!["a".to_string()]);
        table.push_row(vec![Value::Integer(1)]);

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json, serde_json::json!({"columns": ["a"], "index": [0], "data": [[1]]}));
    }
}
