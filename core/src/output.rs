//! Artifact persistence: row-oriented CSV tables and the KPI JSON file.
//!
//! Every full write lands in `<file>.tmp` first and is renamed into place,
//! so a failed run never leaves a half-written table under the final name.

use crate::{
    error::{PipelineError, PipelineResult},
    kpi::{FeatureAdoptionMatrix, KpiReport},
    pipeline::PipelineOutput,
};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    ffi::OsString,
    fs::{self, File, OpenOptions},
    path::{Path, PathBuf},
};

// Column order is part of the file contract. Each list must match the
// field order of the row struct that is serialized under it.
pub const CUSTOMER_COLUMNS: &[&str] = &[
    "customer_id",
    "signup_date",
    "plan_id",
    "current_plan_id",
    "cancel_date",
    "upgrade_date",
    "cac",
];
pub const USAGE_COLUMNS: &[&str] = &["date", "customer_id", "feature", "usage_count"];
pub const REVENUE_COLUMNS: &[&str] = &["date", "customer_id", "mrr", "arr"];
pub const PLAN_COLUMNS: &[&str] = &["plan_id", "plan_name", "monthly_fee"];
pub const TIME_COLUMNS: &[&str] = &["date", "day", "week", "month", "year"];

/// Write `rows` under an explicit header. The header is written even when
/// there are no rows.
pub fn write_rows<T: Serialize>(path: &Path, columns: &[&str], rows: &[T]) -> PipelineResult<()> {
    atomic_write(path, |file| {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(columns)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    })?;
    log::debug!("output: wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Append rows to an existing table without repeating the header.
pub fn append_rows<T: Serialize>(path: &Path, rows: &[T]) -> PipelineResult<()> {
    let file = OpenOptions::new().append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read every row of a headed table.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> PipelineResult<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()?;
    Ok(rows)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> PipelineResult<()> {
    atomic_write(path, |file| {
        serde_json::to_writer_pretty(file, value)?;
        Ok(())
    })
}

pub fn write_kpis(path: &Path, kpis: &KpiReport) -> PipelineResult<()> {
    write_json(path, kpis)
}

/// `month` column followed by one column per feature.
pub fn write_feature_matrix(path: &Path, matrix: &FeatureAdoptionMatrix) -> PipelineResult<()> {
    atomic_write(path, |file| {
        let mut writer = csv::Writer::from_writer(file);
        let mut header = vec!["month".to_string()];
        header.extend(matrix.features.iter().cloned());
        writer.write_record(&header)?;
        for row in &matrix.rows {
            let mut record = vec![row.month.clone()];
            record.extend(row.counts.iter().map(u64::to_string));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    })
}

/// The raw/ and processed/ directory layout under one output root.
pub struct ArtifactWriter {
    raw_dir: PathBuf,
    processed_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            raw_dir: root.join("raw"),
            processed_dir: root.join("processed"),
        }
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    /// Persist every table and the KPI file. Returns the written paths.
    pub fn write_all(&self, output: &PipelineOutput) -> PipelineResult<Vec<PathBuf>> {
        fs::create_dir_all(&self.raw_dir)?;
        fs::create_dir_all(&self.processed_dir)?;

        let schema = &output.schema;
        let mut written = Vec::new();

        let path = self.raw_dir.join("customers.csv");
        write_rows(&path, CUSTOMER_COLUMNS, &schema.dim_customer)?;
        written.push(path);

        let path = self.raw_dir.join("usage_logs.csv");
        write_rows(&path, USAGE_COLUMNS, &schema.fact_usage)?;
        written.push(path);

        let path = self.raw_dir.join("revenue.csv");
        write_rows(&path, REVENUE_COLUMNS, &schema.fact_revenue)?;
        written.push(path);

        let path = self.processed_dir.join("dim_customer.csv");
        write_rows(&path, CUSTOMER_COLUMNS, &schema.dim_customer)?;
        written.push(path);

        let path = self.processed_dir.join("dim_plan.csv");
        write_rows(&path, PLAN_COLUMNS, &schema.dim_plan)?;
        written.push(path);

        let path = self.processed_dir.join("dim_time.csv");
        write_rows(&path, TIME_COLUMNS, &schema.dim_time)?;
        written.push(path);

        let path = self.processed_dir.join("fact_usage.csv");
        write_rows(&path, USAGE_COLUMNS, &schema.fact_usage)?;
        written.push(path);

        let path = self.processed_dir.join("fact_revenue.csv");
        write_rows(&path, REVENUE_COLUMNS, &schema.fact_revenue)?;
        written.push(path);

        let path = self.processed_dir.join("feature_adoption_trends.csv");
        write_feature_matrix(&path, &output.trends)?;
        written.push(path);

        let path = self.processed_dir.join("kpis.json");
        write_kpis(&path, &output.kpis)?;
        written.push(path);

        log::info!("output: wrote {} artifacts", written.len());
        Ok(written)
    }
}

fn atomic_write(
    path: &Path,
    write: impl FnOnce(&mut File) -> PipelineResult<()>,
) -> PipelineResult<()> {
    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = File::create(&tmp)?;
    let written = write(&mut file).and_then(|()| file.sync_all().map_err(PipelineError::from));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    drop(file);
    fs::rename(&tmp, path)?;
    Ok(())
}
