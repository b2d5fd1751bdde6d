use crate::error::{Error, Result};
use crate::models::{ChangelogPage, SearchPage, SearchRequest, SearchResponse};
use crate::pager::{IssuePager, PagerOptions};
use crate::source::IssueSource;
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, header};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

pub const ENV_BASE_URL: &str = "JIRA_BASE_URL";
pub const ENV_USERNAME: &str = "JIRA_USERNAME";
pub const ENV_PASSWORD: &str = "JIRA_PASSWORD";

const SEARCH_PATH: &str = "/rest/api/3/search/jql";

/// Basic認証の資格情報
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub base_url: String,
    pub credentials: Credentials,
}

impl JiraConfig {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.into();

        let _ = Url::parse(&base_url)
            .map_err(|_| Error::InvalidConfiguration("Invalid base URL".to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: Credentials {
                username: username.into(),
                password: password.into(),
            },
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の変数参照関数から設定を組み立てる。未設定・空文字はエラー
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::ConfigurationMissing(format!("{} not found in environment", name)))
        };

        let base_url = require(ENV_BASE_URL)?;
        let username = require(ENV_USERNAME)?;
        let password = require(ENV_PASSWORD)?;

        Self::new(base_url, username, password)
    }
}

#[derive(Debug, Clone)]
pub struct JiraClient {
    pub(crate) client: Client,
    pub(crate) config: Arc<JiraConfig>,
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let Credentials { username, password } = &config.credentials;
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", username, password).as_bytes());
        let mut auth_value = header::HeaderValue::from_str(&format!("Basic {}", encoded))
            .map_err(|_| Error::InvalidConfiguration("Invalid auth header".to_string()))?;
        auth_value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth_value);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Unexpected(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &JiraConfig {
        &self.config
    }

    /// JQLに一致する課題をページ単位で取得するページャを作成
    pub fn issues(&self, jql: impl Into<String>, options: PagerOptions) -> IssuePager {
        IssuePager::new(Arc::new(self.clone()), jql, options)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    pub(crate) async fn get<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let url = self.endpoint(path);

        let response = self.client.get(&url).query(query).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::ApiError { status, message });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }
}

#[async_trait]
impl IssueSource for JiraClient {
    async fn search_issues(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let url = self.endpoint(SEARCH_PATH);
        debug!(jql = %request.jql, cursor = ?request.cursor, "Searching issues");

        let response = self
            .client
            .get(&url)
            .query(&request.query_pairs())
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status, message = %message, "Issue search returned an error status");
            return Ok(SearchResponse { status, page: None });
        }

        let page = response.json::<Option<SearchPage>>().await?;
        Ok(SearchResponse { status, page })
    }

    async fn changelog_page(&self, issue_key: &str, start_at: u32) -> Result<ChangelogPage> {
        let path = format!("/rest/api/3/issue/{}/changelog", urlencoding::encode(issue_key));
        debug!(issue_key, start_at, "Fetching changelog page");

        self.get(&path, &[("startAt", start_at)]).await
    }
}
