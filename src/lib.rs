pub mod analysis;
pub mod changelog;
pub mod cli;
pub mod client;
pub mod config_store;
pub mod error;
pub mod export;
pub mod history;
pub mod logging;
pub mod models;
pub mod pager;
pub mod source;
pub mod time_filter;
pub mod validation;

pub use client::{Credentials, JiraClient, JiraConfig};
pub use error::{Error, Result};
pub use models::*;

// Pager re-exports
pub use pager::{DEFAULT_PAGE_DELAY, IssuePager, PagerOptions, PagerStats, StopReason};
pub use source::IssueSource;

// Analysis re-exports
pub use analysis::{
    AnalysisConfig, AnalysisSummary, Assessment, LeadCycleCalculator, LeadCycleRecord, SkipReason,
    TransitionRule,
};
pub use config_store::AnalysisConfigStore;
pub use export::{CSV_HEADERS, LeadCycleCsvWriter, write_issues_json};

// Time filter re-exports
pub use time_filter::{DateRange, TimePeriod, lead_cycle_jql, parse_jira_datetime};

// History re-exports
pub use history::{StatusTransition, status_transitions};

pub use validation::{ValidationError, validate_issues};
