//! In-memory table model handed from the resolver to downstream consumers.
//!
//! A [`Table`] is an ordered list of column names plus rows of optional
//! [`Value`] cells; `None` is a null cell. Column and row order are never
//! changed implicitly, so writing a table back to CSV reproduces the
//! in-memory order exactly.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
        }
    }

    /// Numeric view of the cell; text is parsed leniently after trimming.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

pub type Row = Vec<Option<Value>>;

/// Null or whitespace-only cells count as missing.
pub fn is_missing(cell: &Option<Value>) -> bool {
    cell.as_ref().is_none_or(Value::is_blank)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// Builds a table from decoded text records; empty strings become nulls.
    pub fn from_text_rows(headers: Vec<String>, records: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = records
            .into_iter()
            .map(|record| {
                let mut row: Row = record
                    .into_iter()
                    .map(|cell| if cell.is_empty() { None } else { Some(Value::Text(cell)) })
                    .collect();
                row.resize(width, None);
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_ref()
    }

    /// Appends a column; rows shorter than `values` are not extended.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<Option<Value>>) {
        self.headers.push(name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }

    /// Keeps only the columns whose index satisfies `keep`, preserving order.
    pub fn retain_columns<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize, &str) -> bool,
    {
        let mask: Vec<bool> = self
            .headers
            .iter()
            .enumerate()
            .map(|(idx, name)| keep(idx, name))
            .collect();
        let mut idx = 0;
        self.headers.retain(|_| {
            let keep = mask[idx];
            idx += 1;
            keep
        });
        for row in &mut self.rows {
            let mut idx = 0;
            row.retain(|_| {
                let keep = mask.get(idx).copied().unwrap_or(false);
                idx += 1;
                keep
            });
        }
    }

    pub fn text_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.as_ref().map(Value::as_display).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}
