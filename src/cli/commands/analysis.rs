use anyhow::Context;
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::FetchArgs;
use crate::analysis::{AnalysisSummary, Assessment, LeadCycleCalculator};
use crate::client::{JiraClient, JiraConfig};
use crate::config_store::{AnalysisConfigStore, ENV_RULES_PATH};
use crate::export::{self, LeadCycleCsvWriter};
use crate::pager::{PagerStats, StopReason};
use crate::time_filter::{self, TimePeriod};

#[derive(Args, Debug)]
pub struct AnalysisArgs {
    #[command(subcommand)]
    pub command: AnalysisCommand,
}

#[derive(Subcommand, Debug)]
pub enum AnalysisCommand {
    /// Compute lead and cycle time for issues resolved in a period
    LeadCycle(LeadCycleArgs),

    /// Show the effective analysis rules
    Rules(RulesArgs),
}

#[derive(Args, Debug)]
pub struct LeadCycleArgs {
    /// Project key or name
    pub project: String,

    /// Reporting period
    #[arg(value_enum, default_value_t = TimePeriod::CurrentQuarter)]
    pub period: TimePeriod,

    /// Output CSV file (default: <project>-lead-cycle.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write every fetched issue to this JSON file
    #[arg(long)]
    pub issues: Option<PathBuf>,

    /// Analysis rules file
    #[arg(long, env = ENV_RULES_PATH)]
    pub rules: Option<PathBuf>,

    #[command(flatten)]
    pub fetch: FetchArgs,
}

#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Analysis rules file
    #[arg(long, env = ENV_RULES_PATH)]
    pub rules: Option<PathBuf>,

    /// Write the effective rules back to the rules file
    #[arg(long)]
    pub write: bool,
}

/// リードタイム出力の結果
#[derive(Debug, Clone)]
pub struct LeadCycleOutcome {
    pub summary: AnalysisSummary,
    pub stats: PagerStats,
    pub stop_reason: Option<StopReason>,
    pub rows: usize,
}

impl LeadCycleArgs {
    pub async fn execute(self, config: JiraConfig) -> anyhow::Result<()> {
        let store = AnalysisConfigStore::resolve(self.rules.as_deref())?;
        let calculator = LeadCycleCalculator::new(store.load().await?)?;
        let client = JiraClient::new(config)?;

        let today = chrono::Utc::now().date_naive();
        let range = self.period.date_range(today)?;
        let jql = time_filter::lead_cycle_jql(&self.project, &range);
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}-lead-cycle.csv", self.project)));

        info!(
            project = %self.project,
            period = ?self.period,
            start = %range.start,
            end = %range.end,
            "Computing lead/cycle time"
        );

        let outcome = export_lead_cycle(
            &client,
            &jql,
            &calculator,
            &output,
            self.issues.as_deref(),
            &self.fetch,
        )
        .await?;

        info!(
            file = %output.display(),
            rows = outcome.rows,
            skipped = outcome.summary.skipped(),
            pages = outcome.stats.pages,
            reconciled = outcome.stats.reconciled_changelogs,
            "Wrote lead/cycle report"
        );
        Ok(())
    }
}

impl RulesArgs {
    pub async fn execute(self) -> anyhow::Result<()> {
        let store = AnalysisConfigStore::resolve(self.rules.as_deref())?;
        let config = store.load().await?;

        if self.write {
            store.save(&config).await?;
            info!(path = %store.path().display(), "Wrote analysis rules");
        }

        println!("{}", serde_json::to_string_pretty(&config)?);
        Ok(())
    }
}

/// JQL の課題を取得しながら判定し、CSV（と任意で課題JSON）に書き出す
///
/// CSV はいったん `<csv_path>.partial` に書き、成功した場合のみ `csv_path` へ移す。
pub async fn export_lead_cycle(
    client: &JiraClient,
    jql: &str,
    calculator: &LeadCycleCalculator,
    csv_path: &Path,
    issues_path: Option<&Path>,
    fetch: &FetchArgs,
) -> anyhow::Result<LeadCycleOutcome> {
    let partial = partial_path(csv_path);

    match write_lead_cycle(client, jql, calculator, &partial, issues_path, fetch).await {
        Ok(outcome) => {
            tokio::fs::rename(&partial, csv_path)
                .await
                .with_context(|| format!("failed to move {} into place", partial.display()))?;
            Ok(outcome)
        }
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(&partial).await {
                debug!(file = %partial.display(), error = %remove_err, "No partial CSV to remove");
            }
            Err(e)
        }
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

async fn write_lead_cycle(
    client: &JiraClient,
    jql: &str,
    calculator: &LeadCycleCalculator,
    csv_path: &Path,
    issues_path: Option<&Path>,
    fetch: &FetchArgs,
) -> anyhow::Result<LeadCycleOutcome> {
    let mut pager = client.issues(jql, fetch.pager_options());
    let mut writer = LeadCycleCsvWriter::create(csv_path)
        .with_context(|| format!("failed to create {}", csv_path.display()))?;
    let mut summary = AnalysisSummary::default();
    let mut fetched = Vec::new();

    loop {
        let batch = match pager.next_batch().await {
            Ok(Some(batch)) => batch,
            Ok(None) => break,
            Err(e) => {
                fetch.handle_stream_error(e, pager.stop_reason())?;
                break;
            }
        };

        for issue in &batch {
            let assessment = calculator.assess(issue);
            summary.record(&assessment);
            if let Assessment::Included(record) = assessment {
                writer.write_record(&record)?;
            }
        }
        debug!(rows = writer.rows(), "Processed batch");

        if issues_path.is_some() {
            fetched.extend(batch);
        }
    }

    let rows = writer.finish()?;

    if let Some(path) = issues_path {
        export::write_issues_json(path, &fetched)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(count = fetched.len(), file = %path.display(), "Wrote issues");
    }

    Ok(LeadCycleOutcome {
        summary,
        stats: pager.stats().clone(),
        stop_reason: pager.stop_reason().cloned(),
        rows,
    })
}
