use clap::Parser;
use jira_flow::JiraConfig;
use jira_flow::cli::commands::analysis::AnalysisCommand;
use jira_flow::cli::{Cli, Commands};
use jira_flow::logging::init_logging;
use std::process::ExitCode;

const EXIT_FAILURE: u8 = 1;
const EXIT_CONFIGURATION: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // .env があれば読み込む
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.log_level, cli.log_format) {
        eprintln!("{}", e);
        return ExitCode::from(EXIT_CONFIGURATION);
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "jira-flow starting");

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {:#}", e);
            if is_configuration_error(&e) {
                ExitCode::from(EXIT_CONFIGURATION)
            } else {
                ExitCode::from(EXIT_FAILURE)
            }
        }
    }
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Search(args) => {
            let config = JiraConfig::from_env()?;
            args.execute(config).await
        }
        Commands::Analysis(args) => match args.command {
            AnalysisCommand::LeadCycle(lead) => {
                let config = JiraConfig::from_env()?;
                lead.execute(config).await
            }
            AnalysisCommand::Rules(rules) => rules.execute().await,
        },
    }
}

fn is_configuration_error(error: &anyhow::Error) -> bool {
    error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<jira_flow::Error>())
        .any(jira_flow::Error::is_configuration)
}
