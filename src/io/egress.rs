//! Parcel egress - appends completed records to file
//!
//! Records are written in JSONL format (one JSON object per line)
//! to the file specified in config.

use crate::domain::record::ParcelRecord;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info};

/// Egress writer for parcel records
pub struct ParcelEgress {
    file_path: String,
}

impl ParcelEgress {
    pub fn new(file_path: &str) -> Self {
        info!(file_path = %file_path, "egress_initialized");
        Self { file_path: file_path.to_string() }
    }

    /// Append one record. Failures are logged, not propagated.
    pub fn write_record(&self, record: &ParcelRecord) -> bool {
        match self.append_line(&record.to_json()) {
            Ok(()) => {
                info!(
                    parcel_id = %record.parcel_id,
                    barcode_type = %record.recognition_result.barcode_type.as_str(),
                    "parcel_egressed"
                );
                true
            }
            Err(e) => {
                error!(parcel_id = %record.parcel_id, error = %e, "parcel_egress_failed");
                false
            }
        }
    }

    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", line)?;
        debug!(file = %self.file_path, bytes = %line.len(), "egress_written");

        Ok(())
    }
}
