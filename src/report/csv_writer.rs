//! Dated CSV reports: an overview row per valid dataset, a problem row per
//! problematic dataset, a detail file per dataset with nulls, and a run summary.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use csv::WriterBuilder;

use crate::fleet::RunSummary;
use crate::report::{DatasetReport, ReportError, ReportSink};

pub const OVERVIEW_STATS_FILE_NAME: &str = "_OVERVIEW_STATS";
pub const PROBLEM_DATASETS_FILE_NAME: &str = "_PROBLEM_DATASETS";
pub const PERFORMANCE_SUMMARY_FILE_NAME: &str = "__script_performance_summary";

const OVERVIEW_HEADER: [&str; 7] = [
    "DATASET NAME",
    "FILE NAME",
    "TOTAL COLUMN COUNT",
    "TOTAL RECORD COUNT",
    "TOTAL NULL VALUE COUNT",
    "PERCENT NULL",
    "DATA PROVIDER",
];
const PROBLEM_HEADER: [&str; 3] = ["DATASET NAME", "PROBLEM MESSAGE", "RESOURCE"];

pub fn today_date_string() -> String {
    chrono::Utc::now().format("%Y%m%d").to_string()
}

pub fn dated_file_name(date: &str, stem: &str) -> String {
    format!("{date}_{stem}.csv")
}

pub struct CsvReportWriter {
    output_dir: PathBuf,
    date: String,
    // Guards appends to the overview and problem files shared by all workers.
    shared_files: Mutex<()>,
}

impl CsvReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, date: impl Into<String>) -> Result<Self, ReportError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            date: date.into(),
            shared_files: Mutex::new(()),
        })
    }

    pub fn for_today(output_dir: impl Into<PathBuf>) -> Result<Self, ReportError> {
        Self::new(output_dir, today_date_string())
    }

    pub fn overview_path(&self) -> PathBuf {
        self.path_for(OVERVIEW_STATS_FILE_NAME)
    }

    pub fn problems_path(&self) -> PathBuf {
        self.path_for(PROBLEM_DATASETS_FILE_NAME)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.path_for(PERFORMANCE_SUMMARY_FILE_NAME)
    }

    pub fn detail_file_name(&self, stem: &str) -> String {
        dated_file_name(&self.date, stem)
    }

    fn path_for(&self, stem: &str) -> PathBuf {
        self.output_dir.join(dated_file_name(&self.date, stem))
    }

    fn write_detail(&self, report: &DatasetReport, file_name: &str) -> Result<(), ReportError> {
        let mut writer = WriterBuilder::new()
            .flexible(true)
            .from_path(self.output_dir.join(file_name))?;
        writer.write_record([report.dataset_name.as_str()])?;
        writer.write_record(["RECORD COUNT TOTAL", report.total_records.to_string().as_str()])?;
        writer.write_record(["PROCESSING TIME", report.elapsed_seconds.to_string().as_str()])?;
        writer.write_record(["FIELD NAME", "NULL COUNT", "PERCENT"])?;
        if let Some(tally) = &report.null_tally {
            for entry in tally.entries() {
                let percent = if report.total_records > 0 {
                    entry.nulls as f64 / report.total_records as f64 * 100.0
                } else {
                    0.0
                };
                writer.write_record([
                    entry.field.as_str(),
                    entry.nulls.to_string().as_str(),
                    format!("{percent:.2}").as_str(),
                ])?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

/// Append one row, writing `header` first when the file is new or empty.
fn append_row<const N: usize>(path: &Path, header: [&str; N], row: [&str; N]) -> Result<(), ReportError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_new = file.metadata()?.len() == 0;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    if is_new {
        writer.write_record(header)?;
    }
    writer.write_record(row)?;
    writer.flush()?;
    Ok(())
}

impl ReportSink for CsvReportWriter {
    fn dataset_finished(&self, report: &DatasetReport) -> Result<(), ReportError> {
        if report.problem_message.is_some() {
            let _guard = self.shared_files.lock().map_err(|_| ReportError::Poisoned)?;
            return append_row(
                &self.problems_path(),
                PROBLEM_HEADER,
                [
                    report.dataset_name.as_str(),
                    report.problem_message.as_deref().unwrap_or(""),
                    report.problem_resource.as_deref().unwrap_or(""),
                ],
            );
        }

        let detail_file = match &report.detail_file_stem {
            Some(stem) if report.null_total > 0 => {
                let file_name = self.detail_file_name(stem);
                self.write_detail(report, &file_name)?;
                file_name
            }
            _ => String::new(),
        };

        let _guard = self.shared_files.lock().map_err(|_| ReportError::Poisoned)?;
        append_row(
            &self.overview_path(),
            OVERVIEW_HEADER,
            [
                report.dataset_name.as_str(),
                detail_file.as_str(),
                report.field_count.unwrap_or(0).to_string().as_str(),
                report.total_records.to_string().as_str(),
                report.null_total.to_string().as_str(),
                format!("{:.2}", report.percent_null).as_str(),
                report.provider.as_str(),
            ],
        )
    }

    fn run_finished(&self, summary: &RunSummary) -> Result<(), ReportError> {
        let file = File::create(self.summary_path())?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(["Date", self.date.as_str()])?;
        writer.write_record([
            "Number of datasets in freshness report",
            summary.datasets_listed.to_string().as_str(),
        ])?;
        writer.write_record(["Total datasets processed", summary.datasets_processed.to_string().as_str()])?;
        writer.write_record([
            "Valid datasets with nulls count (csv generated)",
            summary.has_nulls_count.to_string().as_str(),
        ])?;
        writer.write_record([
            "Valid datasets without nulls count (no csv)",
            summary.clean_count.to_string().as_str(),
        ])?;
        writer.write_record(["Problematic datasets count", summary.problematic_count.to_string().as_str()])?;
        writer.write_record([
            "Process time (minutes)",
            format!("{:.2}", summary.elapsed.as_secs_f64() / 60.0).as_str(),
        ])?;
        writer.flush()?;
        Ok(())
    }
}
