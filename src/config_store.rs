use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::analysis::AnalysisConfig;
use crate::error::{Error, Result};

pub const ENV_RULES_PATH: &str = "JIRA_FLOW_RULES";

/// JSONファイルに保存された集計設定
pub struct AnalysisConfigStore {
    path: PathBuf,
}

impl AnalysisConfigStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// ユーザー設定ディレクトリの `jira-flow/analysis.json`
    pub fn default_location() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::ConfigurationMissing("config directory not found".to_string()))?
            .join("jira-flow");

        Ok(Self::new(config_dir.join("analysis.json")))
    }

    /// 明示パス、なければ既定の場所
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Ok(Self::new(path)),
            None => Self::default_location(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 設定を読み込んで検証する。ファイルがなければ既定値
    pub async fn load(&self) -> Result<AnalysisConfig> {
        let config = match self.read_json_file().await? {
            Some(config) => {
                info!(path = %self.path.display(), "Loaded analysis rules");
                config
            }
            None => {
                debug!(path = %self.path.display(), "No analysis rules file, using defaults");
                AnalysisConfig::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, config: &AnalysisConfig) -> Result<()> {
        config.validate()?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json_data = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, json_data).await?;
        Ok(())
    }

    async fn read_json_file(&self) -> Result<Option<AnalysisConfig>> {
        if !fs::try_exists(&self.path).await? {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path).await?;
        if contents.trim().is_empty() {
            return Ok(None);
        }

        let config = serde_json::from_str(&contents).map_err(|e| {
            Error::InvalidConfiguration(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(Some(config))
    }
}
