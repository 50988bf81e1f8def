//! Postcode-prefix to telephone-area-code lookup.
//!
//! The reference dataset is a JSON array of spreadsheet rows:
//! `[{"postcode": "LS1 4AP", "telephone area code": "0113"}, ...]`.
//! Only the prefix before the first space is used as the key.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AreaCodeError {
    #[error("failed to read area-code dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("area-code dataset {path} is not a JSON array of rows: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct AreaCodeRow {
    #[serde(default)]
    postcode: Option<Value>,
    #[serde(default, rename = "telephone area code")]
    area_code: Option<Value>,
}

/// Substring before the first space, trimmed and upper-cased.
#[must_use]
pub fn postal_prefix(postal_code: &str) -> String {
    postal_code
        .split(' ')
        .next()
        .unwrap_or_default()
        .trim()
        .to_uppercase()
}

fn cell_text(cell: Option<&Value>) -> String {
    match cell {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_owned(),
        Some(other) => other.to_string(),
    }
}

/// Immutable prefix → area-code table, built once and shared by reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaCodeTable {
    codes: HashMap<String, String>,
}

impl AreaCodeTable {
    /// Builds a table from `(postcode, area code)` pairs. Empty prefixes and
    /// codes are skipped; a later row for the same prefix replaces an earlier one.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let codes = pairs
            .into_iter()
            .filter_map(|(postcode, code)| {
                let prefix = postal_prefix(postcode.as_ref());
                let code = code.as_ref().trim().to_uppercase();
                (!prefix.is_empty() && !code.is_empty()).then_some((prefix, code))
            })
            .collect();
        Self { codes }
    }

    /// Parses the JSON row dataset.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the text is not an array of objects.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let rows: Vec<AreaCodeRow> = serde_json::from_str(text)?;
        Ok(Self::from_pairs(rows.iter().map(|row| {
            (
                cell_text(row.postcode.as_ref()),
                cell_text(row.area_code.as_ref()),
            )
        })))
    }

    /// Reads and parses the dataset at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AreaCodeError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, AreaCodeError> {
        let text = std::fs::read_to_string(path).map_err(|source| AreaCodeError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| AreaCodeError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Loads the dataset, falling back to an empty table with a warning.
    #[must_use]
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(table) => {
                tracing::info!(path = %path.display(), prefixes = table.len(), "area-code table loaded");
                table
            }
            Err(e) => {
                tracing::warn!(error = %e, "area-code enrichment disabled: dataset unavailable");
                Self::default()
            }
        }
    }

    /// Area code for `postal_code`, or `""` when the prefix is unknown.
    #[must_use]
    pub fn lookup(&self, postal_code: &str) -> &str {
        self.codes
            .get(&postal_prefix(postal_code))
            .map_or("", String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postal_prefix_takes_outward_code() {
        assert_eq!(postal_prefix("ls1 4ap"), "LS1");
        assert_eq!(postal_prefix(" M1"), "");
        assert_eq!(postal_prefix("M1"), "M1");
        assert_eq!(postal_prefix(""), "");
    }

    #[test]
    fn lookup_normalizes_both_sides() {
        let table = AreaCodeTable::from_pairs([("ls1", " 0113 "), ("M1 ", "0161")]);
        assert_eq!(table.lookup("LS1 4AP"), "0113");
        assert_eq!(table.lookup("m1 1ae"), "0161");
        assert_eq!(table.lookup("EH1 1YZ"), "");
    }

    #[test]
    fn from_json_reads_sheet_rows_and_skips_blanks() {
        let table = AreaCodeTable::from_json(
            r#"[
                {"postcode": "LS1", "telephone area code": "0113"},
                {"postcode": "", "telephone area code": "0999"},
                {"postcode": "BD1", "telephone area code": ""},
                {"postcode": "AB10", "telephone area code": 1224}
            ]"#,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("AB10 1AA"), "1224");
    }

    #[test]
    fn load_or_empty_tolerates_missing_file() {
        let table = AreaCodeTable::load_or_empty(Path::new("/nonexistent/area-codes.json"));
        assert!(table.is_empty());
        assert_eq!(table.lookup("LS1"), "");
    }
}
