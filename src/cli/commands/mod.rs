//! サブコマンドの実装

pub mod analysis;
pub mod search;

use clap::Args;
use std::time::Duration;
use tracing::warn;

use crate::error::Error;
use crate::pager::{DEFAULT_PAGE_DELAY, PagerOptions, StopReason};

/// 課題取得の共通オプション
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Maximum issues per search page (server default when omitted)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Delay between search pages in milliseconds
    #[arg(long, default_value_t = DEFAULT_PAGE_DELAY.as_millis() as u64)]
    pub page_delay_ms: u64,

    /// Fail with a non-zero exit code when the server rejects a page
    #[arg(long)]
    pub strict: bool,
}

impl FetchArgs {
    pub fn pager_options(&self) -> PagerOptions {
        let options = PagerOptions::default().page_delay(Duration::from_millis(self.page_delay_ms));
        match self.page_size {
            Some(size) => options.page_size(size),
            None => options,
        }
    }

    /// ストリームの失敗をどう扱うか決める
    ///
    /// 通信の失敗は常に呼び出し元へ返す。サーバーが応答した上での失敗は strict の場合のみ返す。
    pub fn handle_stream_error(&self, error: Error, reason: Option<&StopReason>) -> anyhow::Result<()> {
        let answered = reason.is_some_and(StopReason::is_answered_failure);
        if self.strict || !answered {
            return Err(anyhow::Error::new(error).context("issue fetching stopped early"));
        }
        warn!(error = %error, reason = ?reason, "Issue fetching stopped early, keeping issues fetched so far");
        Ok(())
    }
}
