//! Run command: one pass of the scheduled job.
//!
//! Builds the real clients from config, runs the pipeline once and prints
//! the upcoming events on stdout.

use std::io::Write;

use tracing::info;

use cowgill_sync::{
    ContentSynchronizer, GithubActionsVault, GithubContents, OAuthClient, Pipeline, RunReport,
    SecretPublisher, StravaClub,
};

use crate::cli::Cli;
use crate::config::JobConfig;
use crate::error::CliResult;
use crate::output;

/// Runs the job once.
pub async fn run(cli: &Cli, config: &JobConfig) -> CliResult<()> {
    let pipeline = build_pipeline(cli, config)?;

    info!(
        club_id = config.strava.club_id,
        repo = %format!("{}/{}", config.github.owner, config.github.repo),
        path = %config.github.content_path,
        "starting run"
    );
    let report = pipeline.run().await?;

    print_report(&report, cli)
}

/// Wires the production clients into a pipeline.
pub fn build_pipeline(cli: &Cli, config: &JobConfig) -> CliResult<Pipeline> {
    config.validate()?;
    let inputs = config.resolve_inputs(&cli.secret_overrides())?;
    let timeout = config.timeout(cli.timeout);

    let exchange = OAuthClient::new(
        inputs.client_credentials(),
        &config.strava.api_base,
        timeout,
    )?;

    let repo = config.github_repo(&inputs.github_token);
    let publisher = SecretPublisher::new(
        Box::new(GithubActionsVault::new(repo.clone(), timeout)?),
        &config.github.secret_name,
    );

    let source = StravaClub::new(&config.strava.api_base, config.strava.club_id, timeout)?;

    let synchronizer = ContentSynchronizer::new(
        Box::new(GithubContents::new(
            repo,
            config.github.branch.clone(),
            timeout,
        )?),
        &config.github.content_path,
        &config.github.commit_message,
    );

    Ok(Pipeline::new(
        Box::new(exchange),
        publisher,
        Box::new(source),
        synchronizer,
        inputs.refresh_token,
    ))
}

fn print_report(report: &RunReport, cli: &Cli) -> CliResult<()> {
    let rendered = output::render(&report.events, cli.output)?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
