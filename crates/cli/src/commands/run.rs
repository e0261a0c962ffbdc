//! Command execution: builds the client/store/sink graph and runs the
//! matching driver.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use bibsync_core::ports::{Cascade, HoldingOperation, WorldcatApi};
use bibsync_core::{
    ChunkedRunner, HoldingUpdateBuffer, HoldingUpdateSinks, HoldingsCheckBuffer,
    HoldingsCheckSinks, SearchBuffer, SearchRunner, SearchSinks,
};
use bibsync_domain::{AppConfig, RunTallies};
use bibsync_infra::{
    config, input, AuthenticatedClient, CsvRowSink, DotenvTokenStore, HttpClient, SharedSink,
    TokenAuthority, WorldcatClient,
};
use tracing::info;

use super::Command;

/// Execute a parsed command.
pub async fn execute(command: Command, dotenv_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = config::load().context("loading configuration")?;
    let api = build_api(&config, dotenv_path).await?;

    match command {
        Command::CheckNumbers { input, output_dir } => {
            run_check(api, &config, &input, &output_dir).await
        }
        Command::SetHoldings { input, output_dir } => {
            run_holdings(api, &config, &input, &output_dir, HoldingOperation::Set, false).await
        }
        Command::UnsetHoldings { input, output_dir, cascade_delete } => {
            run_holdings(
                api,
                &config,
                &input,
                &output_dir,
                HoldingOperation::Unset,
                cascade_delete,
            )
            .await
        }
        Command::Search { input, output_dir, held_by_first } => {
            run_search(api, &config, &input, &output_dir, held_by_first).await
        }
    }
}

/// Wire the authenticated client against the configured endpoints with
/// credentials from the `.env` file.
async fn build_api(
    config: &AppConfig,
    dotenv_path: Option<PathBuf>,
) -> anyhow::Result<Arc<dyn WorldcatApi>> {
    let dotenv_path = dotenv_path
        .context("no .env file found; credentials must live in a .env file")?;

    let http = HttpClient::new()?;
    let authority = TokenAuthority::new(http.clone(), config.worldcat.token_url.clone());
    let store = Arc::new(DotenvTokenStore::new(dotenv_path));

    let client =
        AuthenticatedClient::new(http, authority, store, config.identity.clone()).await?;
    Ok(Arc::new(WorldcatClient::new(client, &config.worldcat)))
}

fn output_sink(dir: &Path, name: &str, header: &[&str]) -> anyhow::Result<CsvRowSink> {
    Ok(CsvRowSink::create(dir.join(name), header)?)
}

async fn run_check(
    api: Arc<dyn WorldcatApi>,
    config: &AppConfig,
    input_file: &Path,
    output_dir: &Path,
) -> anyhow::Result<()> {
    let rows = input::read_check_rows(input_file)?;
    info!(rows = rows.len(), input = %input_file.display(), "starting holdings check");
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    // The driver and the buffer report into the same error file.
    let errors = SharedSink::new(output_sink(
        output_dir,
        "records_with_errors_when_getting_current_oclc_number.csv",
        &["MMS ID", "OCLC Number", "Error"],
    )?);

    let sinks = HoldingsCheckSinks {
        current: Box::new(output_sink(
            output_dir,
            "already_has_current_oclc_number.csv",
            &["MMS ID", "Current OCLC Number"],
        )?),
        old: Box::new(output_sink(
            output_dir,
            "needs_current_oclc_number.csv",
            &["MMS ID", "Current OCLC Number", "Original OCLC Number"],
        )?),
        errors: Box::new(errors.clone()),
    };

    let buffer = HoldingsCheckBuffer::new(api, sinks);
    let mut runner = ChunkedRunner::new(
        buffer,
        config.batch.max_records_per_request,
        Box::new(errors),
    );

    let mut tallies = RunTallies::default();
    runner.run(&rows, &mut tallies).await?;
    runner.into_buffer().flush_sinks()?;

    info!(
        current = tallies.current,
        old = tallies.old,
        errors = tallies.errors,
        api_requests = tallies.api_requests,
        "holdings check finished"
    );
    Ok(())
}

async fn run_holdings(
    api: Arc<dyn WorldcatApi>,
    config: &AppConfig,
    input_file: &Path,
    output_dir: &Path,
    operation: HoldingOperation,
    cascade_delete: bool,
) -> anyhow::Result<()> {
    let rows = input::read_holding_rows(input_file)?;
    let verb = operation.verb();
    info!(rows = rows.len(), operation = verb, input = %input_file.display(), "starting holdings update");
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    let errors_name = match operation {
        HoldingOperation::Set => "records_with_errors_when_setting_holding.csv",
        HoldingOperation::Unset => "records_with_errors_when_unsetting_holding.csv",
    };
    let errors = SharedSink::new(output_sink(
        output_dir,
        errors_name,
        &["Requested OCLC Number", "New OCLC Number (if applicable)", "Error"],
    )?);

    let sinks = HoldingUpdateSinks {
        updated: Box::new(output_sink(
            output_dir,
            &format!("records_with_holding_successfully_{verb}.csv"),
            &["Requested OCLC Number", "New OCLC Number (if applicable)", "Warning"],
        )?),
        no_update_needed: Box::new(output_sink(
            output_dir,
            &format!("records_with_holding_already_{verb}.csv"),
            &["Requested OCLC Number", "New OCLC Number (if applicable)", "Error"],
        )?),
        errors: Box::new(errors.clone()),
    };

    let cascade = if cascade_delete { Cascade::DeleteLocal } else { Cascade::Prevent };
    let buffer = HoldingUpdateBuffer::new(api, operation, cascade, sinks);
    let mut runner = ChunkedRunner::new(
        buffer,
        config.batch.max_records_per_request,
        Box::new(errors),
    );

    let mut tallies = RunTallies::default();
    runner.run(&rows, &mut tallies).await?;
    runner.into_buffer().flush_sinks()?;

    info!(
        updated = tallies.updated,
        no_update_needed = tallies.no_update_needed,
        errors = tallies.errors,
        api_requests = tallies.api_requests,
        "holdings update finished"
    );
    Ok(())
}

async fn run_search(
    api: Arc<dyn WorldcatApi>,
    config: &AppConfig,
    input_file: &Path,
    output_dir: &Path,
    held_by_first: bool,
) -> anyhow::Result<()> {
    let rows = input::read_search_rows(input_file)?;
    info!(rows = rows.len(), held_by_first, input = %input_file.display(), "starting search");
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    let sinks = SearchSinks {
        matched: Box::new(output_sink(
            output_dir,
            "records_with_oclc_num.csv",
            &["MMS ID", "OCLC Number"],
        )?),
        ambiguous: Box::new(output_sink(
            output_dir,
            "records_with_multiple_worldcat_matches.csv",
            &["MMS ID", "Number of WorldCat Matches"],
        )?),
    };
    let errors = output_sink(
        output_dir,
        "records_with_errors_when_searching_worldcat.csv",
        &["MMS ID", "Error"],
    )?;

    let buffer = SearchBuffer::new(
        api,
        sinks,
        held_by_first,
        config.identity.institution_symbol.clone(),
    );
    let mut runner = SearchRunner::new(buffer, Box::new(errors));

    let mut tallies = RunTallies::default();
    runner.run(rows, &mut tallies).await?;

    info!(
        single_match = tallies.single_match,
        multiple_matches = tallies.multiple_matches,
        errors = tallies.errors,
        api_requests = tallies.api_requests,
        "search finished"
    );
    Ok(())
}
