use clap::{Parser, ValueEnum};

use crate::config::ConfigOverrides;

/// Which repository the engine reads from and writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// GitHub when `GITHUB_TOKEN` and `GITHUB_REPOSITORY` are set, else local
    Auto,
    Github,
    Local,
}

#[derive(Debug, Parser)]
#[command(
    name = "gitflow-guard",
    about = "Enforce GitFlow branch rules in CI and complete releases and hotfixes",
    disable_version_flag = true
)]
pub struct Args {
    #[arg(help = "Name of the production branch")]
    pub main_branch: Option<String>,

    #[arg(help = "Name of the integration branch")]
    pub develop_branch: Option<String>,

    #[arg(help = "Prefix of feature branches (empty disables them)")]
    pub feature_prefix: Option<String>,

    #[arg(help = "Prefix of bugfix branches (empty disables them)")]
    pub bugfix_prefix: Option<String>,

    #[arg(help = "Prefix of release branches (empty disables them)")]
    pub release_prefix: Option<String>,

    #[arg(help = "Prefix of hotfix branches (empty disables them)")]
    pub hotfix_prefix: Option<String>,

    #[arg(help = "Prefix of support branches (empty disables them)")]
    pub support_prefix: Option<String>,

    #[arg(help = "Prefix of version tags, e.g. 'v'")]
    pub version_tag_prefix: Option<String>,

    #[arg(help = "Version to release instead of the one the branch implies")]
    pub release_candidate: Option<String>,

    #[arg(short, long, help = "Custom configuration file path")]
    pub config: Option<String>,

    #[arg(
        long,
        value_enum,
        default_value_t = Backend::Auto,
        help = "Repository backend; local falls back to origin/<branch> for branches not present locally"
    )]
    pub backend: Backend,

    #[arg(long, help = "Timeout in seconds for remote repository calls")]
    pub timeout_secs: Option<u64>,

    #[arg(long, help = "Preview follow-up actions without making changes")]
    pub dry_run: bool,

    #[arg(long, help = "Log level filter (overrides ACTIONS_RUNNER_DEBUG)")]
    pub log_level: Option<String>,

    #[arg(short = 'V', long, help = "Print version information")]
    pub version: bool,
}

impl Args {
    /// Configuration values given on the command line
    pub fn to_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            main_branch: self.main_branch.clone(),
            develop_branch: self.develop_branch.clone(),
            feature_prefix: self.feature_prefix.clone(),
            bugfix_prefix: self.bugfix_prefix.clone(),
            release_prefix: self.release_prefix.clone(),
            hotfix_prefix: self.hotfix_prefix.clone(),
            support_prefix: self.support_prefix.clone(),
            version_tag_prefix: self.version_tag_prefix.clone(),
            timeout_secs: self.timeout_secs,
        }
    }

    /// Log filter used when `RUST_LOG` is unset: `--log-level`, else `debug`
    /// when the runner asks for debug output, else `info`.
    pub fn log_filter(&self, runner_debug: Option<&str>) -> String {
        if let Some(level) = &self.log_level {
            return level.clone();
        }
        let debug = runner_debug
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let level = if debug { "debug" } else { "info" };
        level.to_string()
    }
}
