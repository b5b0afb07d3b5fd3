//! The `company,location` list that seeds a batch run.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{NewsError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRow {
    pub company: String,
    pub location: String,
}

/// Read every non-blank row of a `company,location` CSV.
pub fn read_companies(path: &Path) -> Result<Vec<CompanyRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for row in reader.deserialize::<CompanyRow>() {
        let row = row?;
        if !row.company.is_empty() {
            rows.push(row);
        }
    }
    info!(path = %path.display(), count = rows.len(), "Loaded companies");
    Ok(rows)
}

/// Overwrite `path` with `rows`, creating parent directories.
pub fn write_companies(path: &Path, rows: &[CompanyRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| NewsError::io(parent, e))?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    // Header is written even for an empty list.
    if rows.is_empty() {
        writer.write_record(["company", "location"])?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|e| NewsError::io(path, e))?;
    info!(path = %path.display(), count = rows.len(), "Wrote companies");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_what_it_writes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("input").join("companies.csv");
        let rows = vec![
            CompanyRow {
                company: "GRC Solutions".into(),
                location: "Sydney".into(),
            },
            CompanyRow {
                company: "Smith, Jones & Co".into(),
                location: "Adelaide".into(),
            },
        ];

        write_companies(&path, &rows).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("company,location\n"));
        assert_eq!(read_companies(&path).unwrap(), rows);
    }

    #[test]
    fn skips_blank_names_and_trims() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("companies.csv");
        std::fs::write(&path, "company,location\n Partmax , Melbourne\n,Perth\n").unwrap();

        let rows = read_companies(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].company, "Partmax");
        assert_eq!(rows[0].location, "Melbourne");
    }

    #[test]
    fn missing_file_is_csv_error() {
        let err = read_companies(Path::new("/nonexistent/companies.csv")).unwrap_err();
        assert!(matches!(err, NewsError::Csv(_)));
    }
}
