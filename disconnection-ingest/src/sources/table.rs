use time::Date;

/// A single cell as read from a source file.
///
/// CSV sources only produce `Empty` and `Text`; spreadsheets also carry
/// native numbers and dates.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(Date),
}

impl Cell {
    pub fn text<S: Into<String>>(s: S) -> Self {
        let s = s.into();
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric value of the cell, or `None` if it is missing or not a number.
    pub fn to_f64(&self) -> Option<f64> {
        let v = match self {
            Cell::Number(v) => *v,
            Cell::Text(s) => s.trim().parse::<f64>().ok()?,
            Cell::Empty | Cell::Date(_) => return None,
        };
        if v.is_nan() {
            None
        } else {
            Some(v)
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("missing column '{0}'")]
pub struct MissingColumn(pub String);

/// Header names plus rows of cells, as materialized from one source file.
///
/// Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut cells: Vec<Cell>) {
        cells.resize(self.headers.len(), Cell::Empty);
        self.rows.push(cells);
    }

    pub fn column_index(&self, name: &str) -> Result<usize, MissingColumn> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| MissingColumn(name.to_string()))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_coercion_turns_garbage_into_none() {
        assert_eq!(Cell::text("42").to_f64(), Some(42.0));
        assert_eq!(Cell::text(" 3.5 ").to_f64(), Some(3.5));
        assert_eq!(Cell::Number(7.0).to_f64(), Some(7.0));
        assert_eq!(Cell::text("n/a").to_f64(), None);
        assert_eq!(Cell::text("1,234").to_f64(), None);
        assert_eq!(Cell::Number(f64::NAN).to_f64(), None);
        assert_eq!(Cell::Empty.to_f64(), None);
    }

    #[test]
    fn empty_strings_become_empty_cells() {
        assert_eq!(Cell::text(""), Cell::Empty);
        assert!(Cell::text("  ").is_empty());
    }

    #[test]
    fn rows_are_padded_to_header_width() {
        let mut t = RawTable::new(vec!["a".into(), "b".into(), "c".into()]);
        t.push_row(vec![Cell::text("1")]);
        assert_eq!(t.rows[0], vec![Cell::text("1"), Cell::Empty, Cell::Empty]);
        assert_eq!(t.column_index("c"), Ok(2));
        assert_eq!(t.column_index("d"), Err(MissingColumn("d".into())));
    }
}
