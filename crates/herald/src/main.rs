mod cli;
mod dry_run;
mod error;
mod output;

use clap::Parser;
use cli::{Cli, Commands, RunArgs, apply_environment_overrides};
use dry_run::DryRunHost;
use error::{CliError, Result};
use herald_core::{CodeHost, Orchestrator};
use herald_github::GitHub;
use output::emit_github_output;
use std::process::ExitCode;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,herald=debug".into()),
        )
        .init();

    let mut cli = Cli::parse();
    apply_environment_overrides(cli.command.args_mut());

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

fn connect(args: &RunArgs) -> Result<GitHub> {
    let (Some(repo), Some(token)) = (&args.repo, &args.token) else {
        return Err(CliError::MissingCredentials);
    };
    Ok(GitHub::new(repo, token.clone(), args.api_url.as_deref())?)
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::ReleasePr(args) => {
            let github = connect(&args)?;
            let dry_run = DryRunHost::new(&github);
            let host: &dyn CodeHost = if args.dry_run { &dry_run } else { &github };
            release_pr(host, &args).await
        }
        Commands::GithubRelease(args) => {
            let github = connect(&args)?;
            let dry_run = DryRunHost::new(&github);
            let host: &dyn CodeHost = if args.dry_run { &dry_run } else { &github };
            github_release(host, &args).await
        }
    }
}

async fn release_pr(host: &dyn CodeHost, args: &RunArgs) -> Result<()> {
    let mut orchestrator = Orchestrator::new(host, args.manifest_options());
    if !orchestrator.validate().await {
        return Err(CliError::InvalidConfiguration);
    }

    match orchestrator.create_pull_request().await? {
        Some(pull_request) => {
            info!("release pull request: #{}", pull_request.number);
            emit_github_output("pr", &pull_request.number.to_string())?;
        }
        None => info!("nothing to release"),
    }
    Ok(())
}

async fn github_release(host: &dyn CodeHost, args: &RunArgs) -> Result<()> {
    let mut orchestrator = Orchestrator::new(host, args.manifest_options());
    if !orchestrator.validate().await {
        return Err(CliError::InvalidConfiguration);
    }

    let Some(summary) = orchestrator.create_releases().await? else {
        emit_github_output("releases_created", "false")?;
        return Ok(());
    };
    for release in &summary.created {
        info!("released {} {}", release.tag_name, release.html_url);
    }
    emit_github_output(
        "releases_created",
        if summary.created.is_empty() { "false" } else { "true" },
    )?;

    if !summary.is_complete() {
        for failure in &summary.failed {
            warn!("{} ({}): {}", failure.tag_name, failure.path, failure.error);
        }
        return Err(CliError::IncompleteRelease {
            pull_request: summary.pull_request,
            failed: summary.failed.len(),
        });
    }
    Ok(())
}
