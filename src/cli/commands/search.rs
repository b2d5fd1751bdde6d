use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use super::FetchArgs;
use crate::client::{JiraClient, JiraConfig};
use crate::export;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// JQL query
    pub jql: String,

    /// Output JSON file (default: issues-<unix millis>.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub fetch: FetchArgs,
}

impl SearchArgs {
    pub async fn execute(self, config: JiraConfig) -> anyhow::Result<()> {
        let client = JiraClient::new(config)?;
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("issues-{}.json", chrono::Utc::now().timestamp_millis())));

        let mut pager = client.issues(&self.jql, self.fetch.pager_options());
        info!(jql = %pager.jql(), "Searching issues");

        let mut issues = Vec::new();
        loop {
            match pager.next_batch().await {
                Ok(Some(batch)) => issues.extend(batch),
                Ok(None) => break,
                Err(e) => {
                    self.fetch.handle_stream_error(e, pager.stop_reason())?;
                    break;
                }
            }
        }

        export::write_issues_json(&output, &issues)
            .await
            .with_context(|| format!("failed to write {}", output.display()))?;

        info!(count = issues.len(), file = %output.display(), "Wrote issues");
        Ok(())
    }
}
