use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::analysis::LeadCycleRecord;
use crate::error::Result;
use crate::models::Issue;

/// CSVのヘッダー（`LeadCycleRecord` のフィールド順）
pub const CSV_HEADERS: [&str; 23] = [
    "project",
    "key",
    "type",
    "summary",
    "assignee",
    "parentKey",
    "parentName",
    "created",
    "createdYearMonth",
    "createdYearWeek",
    "createdWeekStart",
    "completed",
    "completedYearMonth",
    "completedYearWeek",
    "completedWeekStart",
    "inprogress",
    "inprogressYearMonth",
    "inprogressYearWeek",
    "inprogressWeekStart",
    "leadTimeDays",
    "leadTimeBusinessDays",
    "cycleTimeDays",
    "cycleTimeBusinessDays",
];

/// 課題一覧を整形済みJSON配列で書き出す
pub async fn write_issues_json(path: &Path, issues: &[Issue]) -> Result<()> {
    let json_data = serde_json::to_string_pretty(issues)?;
    tokio::fs::write(path, json_data).await?;
    Ok(())
}

/// リードタイムCSVの書き出し。行がなくてもヘッダーは必ず出力する
pub struct LeadCycleCsvWriter<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl LeadCycleCsvWriter<File> {
    pub fn create(path: &Path) -> Result<Self> {
        Self::from_writer(File::create(path)?)
    }
}

impl<W: Write> LeadCycleCsvWriter<W> {
    pub fn from_writer(inner: W) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        writer.write_record(CSV_HEADERS)?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn write_record(&mut self, record: &LeadCycleRecord) -> Result<()> {
        self.writer.serialize(record)?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// フラッシュして書き込んだ行数を返す
    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush()?;
        Ok(self.rows)
    }
}
