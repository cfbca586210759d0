use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::models::{ScanConfig, ScanResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_time: String,
    pub config: ScanConfig,
    pub result: ScanResult,
}

impl ScanReport {
    pub fn new(config: ScanConfig, result: ScanResult) -> Self {
        Self {
            scan_time: Utc::now().to_rfc3339(),
            config,
            result,
        }
    }
}

pub struct JsonExporter;

impl JsonExporter {
    pub fn export(report: &ScanReport, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        fs::write(path, json).with_context(|| format!("Failed to write to {}", path))?;
        Ok(())
    }

    pub fn load(path: &str) -> Result<ScanReport> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;

        let report: ScanReport = serde_json::from_str(&content)
            .with_context(|| format!("{} is not a uniondump report", path))?;
        Ok(report)
    }
}
