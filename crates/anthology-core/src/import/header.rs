//! CSV header normalization and column lookup.

use std::collections::HashMap;

use anthology_common::{Error, Result};

/// Columns that must be present (after normalization) for an import to
/// start. Column order is not significant and extra columns are ignored.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "title",
    "creator",
    "itemtype",
    "releaseyear",
    "pagecount",
    "isbn13",
    "isbn10",
    "description",
    "coverimage",
    "notes",
];

/// Normalized header: lowercased, trimmed, BOM stripped, mapped to cell
/// positions. Repeated column names keep the first occurrence.
#[derive(Debug)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn parse(record: &csv::StringRecord) -> Result<Self> {
        let mut positions = HashMap::new();
        for (index, cell) in record.iter().enumerate() {
            let cell = if index == 0 {
                cell.trim_start_matches('\u{feff}')
            } else {
                cell
            };
            let name = cell.trim().to_lowercase();
            if !name.is_empty() {
                positions.entry(name).or_insert(index);
            }
        }

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .filter(|column| !positions.contains_key(**column))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(Error::validation(format!(
                "missing required columns: {}",
                missing.join(", ")
            )));
        }
        Ok(HeaderIndex { positions })
    }

    /// Trimmed cell value for `column`, or empty when the row is short or
    /// the column absent.
    pub fn get<'r>(&self, record: &'r csv::StringRecord, column: &str) -> &'r str {
        self.positions
            .get(column)
            .and_then(|&index| record.get(index))
            .map(str::trim)
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cells: &[&str]) -> csv::StringRecord {
        csv::StringRecord::from(cells.to_vec())
    }

    fn full_header() -> csv::StringRecord {
        record(&[
            "title", "creator", "itemType", "releaseYear", "pageCount", "isbn13", "isbn10",
            "description", "coverImage", "notes",
        ])
    }

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let header = HeaderIndex::parse(&record(&[
            " Title ", "CREATOR", "itemtype", "releaseyear", "pagecount", "isbn13", "isbn10",
            "description", "coverimage", "notes",
        ]))
        .unwrap();
        let row = record(&["  Dune  ", "Herbert", "book", "", "", "", "", "", "", ""]);
        assert_eq!(header.get(&row, "title"), "Dune");
        assert_eq!(header.get(&row, "creator"), "Herbert");
    }

    #[test]
    fn test_bom_stripped_from_first_cell() {
        let mut cells = vec!["\u{feff}title"];
        cells.extend_from_slice(&[
            "creator", "itemtype", "releaseyear", "pagecount", "isbn13", "isbn10", "description",
            "coverimage", "notes",
        ]);
        let header = HeaderIndex::parse(&record(&cells)).unwrap();
        let row = record(&["Dune", "", "", "", "", "", "", "", "", ""]);
        assert_eq!(header.get(&row, "title"), "Dune");
    }

    #[test]
    fn test_missing_required_column_fails() {
        let err = HeaderIndex::parse(&record(&["title", "creator", "itemtype"])).unwrap_err();
        assert_eq!(err.http_status(), 422);
        assert!(err.to_string().contains("isbn13"));
    }

    #[test]
    fn test_extra_columns_accepted() {
        let cells = [
            "title", "creator", "itemType", "releaseYear", "pageCount", "isbn13", "isbn10",
            "description", "coverImage", "notes", "someVendorColumn",
        ];
        assert!(HeaderIndex::parse(&record(&cells)).is_ok());
    }

    #[test]
    fn test_short_row_reads_empty() {
        let header = HeaderIndex::parse(&full_header()).unwrap();
        let row = record(&["Only Title"]);
        assert_eq!(header.get(&row, "title"), "Only Title");
        assert_eq!(header.get(&row, "notes"), "");
    }
}
