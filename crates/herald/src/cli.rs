use clap::{Args, Parser, Subcommand};
use herald_core::ManifestOptions;
use herald_core::config::DEFAULT_CONFIG_FILE;
use herald_core::manifest::DEFAULT_MANIFEST_FILE;

/// Herald – release pull requests and tagged releases for monorepos
#[derive(Debug, Parser)]
#[command(name = "herald", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Open or refresh the release pull request for every package with releasable commits
    ReleasePr(RunArgs),

    /// Tag releases for the last merged release pull request
    GithubRelease(RunArgs),
}

impl Commands {
    pub fn args_mut(&mut self) -> &mut RunArgs {
        match self {
            Commands::ReleasePr(args) | Commands::GithubRelease(args) => args,
        }
    }
}

#[derive(Debug, Args, Default, Clone, PartialEq, Eq)]
pub struct RunArgs {
    /// Repository as <owner>/<name>
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repo: Option<String>,

    /// API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// API root, for GitHub Enterprise
    #[arg(long)]
    pub api_url: Option<String>,

    /// Branch releases are cut from (defaults to the repository default branch)
    #[arg(long, env = "HERALD_TARGET_BRANCH")]
    pub target_branch: Option<String>,

    /// Path of the configuration document in the repository
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<String>,

    /// Path of the versions manifest in the repository
    #[arg(long, value_name = "PATH")]
    pub manifest_file: Option<String>,

    /// Read from the repository but only log the writes
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    pub fn manifest_options(&self) -> ManifestOptions {
        ManifestOptions {
            config_file: self
                .config_file
                .clone()
                .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string()),
            manifest_file: self
                .manifest_file
                .clone()
                .unwrap_or_else(|| DEFAULT_MANIFEST_FILE.to_string()),
            target_branch: self.target_branch.clone(),
        }
    }
}

/// Apply GitHub Actions `INPUT_*` variables to arguments left unset.
pub fn apply_environment_overrides(args: &mut RunArgs) {
    apply_environment_overrides_with_env(args, |key| std::env::var(key).ok());
}

pub fn apply_environment_overrides_with_env<F>(args: &mut RunArgs, env_var: F)
where
    F: Fn(&str) -> Option<String>,
{
    let input = |key: &str| env_var(key).filter(|value| !value.trim().is_empty());

    for (slot, key) in [
        (&mut args.repo, "INPUT_REPO"),
        (&mut args.token, "INPUT_TOKEN"),
        (&mut args.api_url, "INPUT_API_URL"),
        (&mut args.target_branch, "INPUT_TARGET_BRANCH"),
        (&mut args.config_file, "INPUT_CONFIG_FILE"),
        (&mut args.manifest_file, "INPUT_MANIFEST_FILE"),
    ] {
        if slot.is_none() {
            *slot = input(key);
        }
    }

    if !args.dry_run
        && let Some(value) = input("INPUT_DRY_RUN")
    {
        args.dry_run = value == "1" || value.eq_ignore_ascii_case("true");
    }
}
