// 📤 Export - transaction log as JSON or CSV

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ledger::ParkingTransaction;

/// Flat CSV row (RFC 3339 timestamps, empty cells for missing values)
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    plate_number: &'a str,
    slot_label: &'a str,
    entry_time: String,
    exit_time: Option<String>,
    cost: Option<u64>,
    status: &'static str,
}

impl<'a> From<&'a ParkingTransaction> for CsvRow<'a> {
    fn from(tx: &'a ParkingTransaction) -> Self {
        CsvRow {
            id: &tx.id,
            plate_number: &tx.plate_number,
            slot_label: &tx.slot_label,
            entry_time: tx.entry_time.to_rfc3339(),
            exit_time: tx.exit_time.map(|t| t.to_rfc3339()),
            cost: tx.cost,
            status: tx.status.as_str(),
        }
    }
}

pub fn transactions_to_json(transactions: &[ParkingTransaction]) -> Result<String> {
    serde_json::to_string_pretty(transactions).context("Failed to serialize transactions")
}

pub fn transactions_to_csv(transactions: &[ParkingTransaction]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    if transactions.is_empty() {
        // serde only writes the header together with the first record
        wtr.write_record([
            "id",
            "plate_number",
            "slot_label",
            "entry_time",
            "exit_time",
            "cost",
            "status",
        ])?;
    }
    for tx in transactions {
        wtr.serialize(CsvRow::from(tx))
            .context("Failed to write CSV row")?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// Write transactions.json and transactions.csv into `dir`
pub fn export_to_dir(transactions: &[ParkingTransaction], dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory: {:?}", dir))?;

    let json_path = dir.join("transactions.json");
    fs::write(&json_path, transactions_to_json(transactions)?)
        .with_context(|| format!("Failed to write {:?}", json_path))?;

    let csv_path = dir.join("transactions.csv");
    fs::write(&csv_path, transactions_to_csv(transactions)?)
        .with_context(|| format!("Failed to write {:?}", csv_path))?;

    tracing::info!(count = transactions.len(), dir = ?dir, "transactions exported");
    Ok(vec![json_path, csv_path])
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn sample() -> Vec<ParkingTransaction> {
        let entry = Utc.with_ymd_and_hms(2025, 4, 2, 10, 0, 0).unwrap();
        let mut done = ParkingTransaction::open("KSA-1001".to_string(), "A-1".to_string(), entry);
        done.complete(entry + Duration::minutes(3), 30);
        let open = ParkingTransaction::open("KSA-2002".to_string(), "A-2".to_string(), entry);
        vec![done, open]
    }

    #[test]
    fn test_csv_export() {
        let csv = transactions_to_csv(&sample()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "id,plate_number,slot_label,entry_time,exit_time,cost,status");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("KSA-1001,A-1,2025-04-02T10:00:00+00:00,2025-04-02T10:03:00+00:00,30,COMPLETED"));
        assert!(lines[2].ends_with("KSA-2002,A-2,2025-04-02T10:00:00+00:00,,,ACTIVE"));
    }

    #[test]
    fn test_csv_export_empty_has_header() {
        let csv = transactions_to_csv(&[]).unwrap();
        assert_eq!(csv.trim_end(), "id,plate_number,slot_label,entry_time,exit_time,cost,status");
    }

    #[test]
    fn test_json_export() {
        let json = transactions_to_json(&sample()).unwrap();
        let parsed: Vec<ParkingTransaction> = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, sample_with_ids(&parsed));
        assert!(json.contains("\"status\": \"COMPLETED\""));
    }

    // ids are random, so compare everything else
    fn sample_with_ids(parsed: &[ParkingTransaction]) -> Vec<ParkingTransaction> {
        sample()
            .into_iter()
            .zip(parsed)
            .map(|(mut tx, p)| {
                tx.id = p.id.clone();
                tx
            })
            .collect()
    }

    #[test]
    fn test_export_to_dir() {
        let dir = std::env::temp_dir().join(format!("smart-park-export-{}", uuid::Uuid::new_v4()));

        let paths = export_to_dir(&sample(), &dir).unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.exists()));
        fs::remove_dir_all(&dir).unwrap();
    }
}
