//! Command-line interface argument parsing.
//!
//! Every value that defines a run can also come from the environment
//! (a `.env` file in the working directory is loaded first).

use clap::Parser;
use std::path::PathBuf;

/// prpanel - a panel of LLM reviewers for GitHub pull requests
///
/// Five specialists (product, senior engineering, security, DevOps, QA)
/// review the PR in parallel through the GitHub MCP server, then a tech
/// lead consolidates their findings into one decision.
///
/// Examples:
///   prpanel --owner acme --repo widgets --pr 42
///   prpanel --pr 42 --markdown review.md
///   prpanel --dry-run
///   prpanel --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Repository owner
    #[arg(long, env = "REPO_OWNER")]
    pub owner: Option<String>,

    /// Repository name
    #[arg(long, env = "REPO_NAME")]
    pub repo: Option<String>,

    /// Pull request number
    #[arg(long, value_name = "NUMBER", env = "PR_NUMBER")]
    pub pr: Option<u64>,

    /// GCP project hosting Vertex AI
    #[arg(long, env = "GCP_PROJECT_ID")]
    pub project: Option<String>,

    /// Vertex AI location (`global` for the global endpoint)
    #[arg(long, default_value = "us-central1", env = "GCP_LOCATION")]
    pub location: String,

    /// Gemini model to use
    ///
    /// Can also be set in .prpanel.toml. Default: gemini-2.5-pro.
    #[arg(short, long, env = "PRPANEL_MODEL")]
    pub model: Option<String>,

    /// GitHub MCP server URL
    #[arg(long, value_name = "URL", env = "GITHUB_MCP_URL")]
    pub mcp_url: Option<String>,

    /// GitHub personal access token for the MCP server
    #[arg(long, env = "GITHUB_PERSONAL_ACCESS_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Vertex AI access token; asks `gcloud auth print-access-token` when unset
    #[arg(long, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Output file for the JSON results
    ///
    /// Default: review_results.json
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Also write a Markdown report to this file
    #[arg(long, value_name = "FILE")]
    pub markdown: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .prpanel.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds, for both the model and the gateway
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Model calls allowed per reviewer
    #[arg(long, value_name = "N")]
    pub max_turns: Option<usize>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: discover tools and show the review plan without calling the model
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .prpanel.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    ///
    /// Invalid values (including a non-numeric `PR_NUMBER` from the
    /// environment) exit with code 1, like every other configuration error.
    pub fn parse_args() -> Self {
        match Self::try_parse() {
            Ok(args) => args,
            Err(e) => {
                let _ = e.print();
                std::process::exit(parse_exit_code(&e));
            }
        }
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.max_turns == Some(0) {
            return Err("Max turns must be at least 1".to_string());
        }

        if self.pr == Some(0) {
            return Err("PR number must be at least 1".to_string());
        }

        if let Some(ref url) = self.mcp_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("MCP URL must start with 'http://' or 'https://'".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

/// Exit code for a failed parse: 0 for `--help`/`--version`, else 1.
fn parse_exit_code(error: &clap::Error) -> i32 {
    if error.use_stderr() {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            owner: Some("acme".to_string()),
            repo: Some("widgets".to_string()),
            pr: Some(5),
            project: Some("proj".to_string()),
            location: "us-central1".to_string(),
            model: None,
            mcp_url: None,
            github_token: Some("ghp_x".to_string()),
            access_token: None,
            output: None,
            markdown: None,
            config: None,
            timeout: None,
            max_turns: None,
            temperature: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_valid_args() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_ranges() {
        let mut args = make_args();
        args.temperature = Some(2.5);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.pr = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.max_turns = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.mcp_url = Some("ftp://example.com".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let mut args = make_args();
        args.init_config = true;
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_invalid_pr_number_exits_with_one() {
        let err = Args::try_parse_from(["prpanel", "--pr", "forty-two"]).unwrap_err();
        assert_eq!(parse_exit_code(&err), 1);

        let help = Args::try_parse_from(["prpanel", "--help"]).unwrap_err();
        assert_eq!(parse_exit_code(&help), 0);
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
