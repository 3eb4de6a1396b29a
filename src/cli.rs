//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// geomorph - river channel analysis proxy and client
///
/// Runs the analysis proxy in front of the geomorphology service, or
/// uploads a stream export through it and renders the resulting table
/// and channel-type distribution.
///
/// Examples:
///   geomorph serve --api-url http://localhost:8000
///   geomorph analyze streams.csv
///   geomorph analyze theta_cell.mat --toggle 3f2a=false --reanalyze
///   geomorph analyze streams.csv --format json --output result.json
///   geomorph init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .geomorph.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the analysis proxy (POST /api/analyze, POST /api/reanalyze)
    Serve(ServeArgs),
    /// Upload a file through the proxy and render the results
    Analyze(AnalyzeArgs),
    /// Generate a default .geomorph.toml configuration file
    InitConfig,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Base URL of the upstream analysis service
    #[arg(long, value_name = "URL", env = "PUBLIC_API_URL")]
    pub api_url: Option<String>,

    /// Upstream request timeout in seconds (default: none)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Stream export to upload (.csv or .mat)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Base URL of the proxy server
    #[arg(long, value_name = "URL", env = "GEOMORPH_SERVER")]
    pub server: Option<String>,

    /// Request timeout in seconds (default: none)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Override the interpretable flag of a row, e.g. --toggle 3f2a=false
    ///
    /// May be given several times. Applied after the upload.
    #[arg(long, value_name = "ID=BOOL", value_parser = parse_toggle)]
    pub toggle: Vec<(String, bool)>,

    /// Reset every toggle to the service classification before re-analysis
    #[arg(long)]
    pub reset_toggles: bool,

    /// Re-submit the (edited) table to refresh the channel distribution
    #[arg(long)]
    pub reanalyze: bool,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Parse an `ID=BOOL` toggle argument.
pub fn parse_toggle(s: &str) -> Result<(String, bool), String> {
    let (id, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected ID=BOOL, got '{}'", s))?;

    if id.is_empty() {
        return Err("Toggle id must not be empty".to_string());
    }

    let value = match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => true,
        "false" | "no" | "off" | "0" => false,
        other => return Err(format!("Invalid toggle value '{}'", other)),
    };

    Ok((id.to_string(), value))
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            Command::Serve(serve) => {
                if let Some(ref api_url) = serve.api_url {
                    validate_http_url("API URL", api_url)?;
                }
                validate_timeout(serve.timeout)?;
            }
            Command::Analyze(analyze) => {
                if let Some(ref server) = analyze.server {
                    validate_http_url("Server URL", server)?;
                }
                validate_timeout(analyze.timeout)?;

                if !analyze.file.is_file() {
                    return Err(format!("File does not exist: {}", analyze.file.display()));
                }
            }
            Command::InitConfig => {}
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

fn validate_http_url(label: &str, url: &str) -> Result<(), String> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(format!("{} must start with 'http://' or 'https://'", label))
    }
}

fn validate_timeout(timeout: Option<u64>) -> Result<(), String> {
    match timeout {
        Some(0) => Err("Timeout must be at least 1 second".to_string()),
        _ => Ok(()),
    }
}

#[cfg(test)]
impl AnalyzeArgs {
    pub(crate) fn for_file(file: &str) -> Self {
        Self {
            file: PathBuf::from(file),
            server: None,
            timeout: None,
            toggle: Vec::new(),
            reset_toggles: false,
            reanalyze: false,
            format: OutputFormat::Markdown,
            output: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(command: Command) -> Args {
        Args {
            config: None,
            verbose: false,
            quiet: false,
            command,
        }
    }

    #[test]
    fn test_parse_toggle() {
        assert_eq!(parse_toggle("abc=false"), Ok(("abc".to_string(), false)));
        assert_eq!(parse_toggle("a=b=TRUE"), Err("Invalid toggle value 'b=true'".to_string()));
        assert_eq!(parse_toggle("seg-1=On"), Ok(("seg-1".to_string(), true)));
        assert!(parse_toggle("abc").is_err());
        assert!(parse_toggle("=true").is_err());
    }

    #[test]
    fn test_parse_analyze_command() {
        let args = Args::try_parse_from([
            "geomorph",
            "analyze",
            "streams.csv",
            "--toggle",
            "a=false",
            "--toggle",
            "b=true",
            "--reanalyze",
            "--format",
            "json",
        ])
        .unwrap();

        match args.command {
            Command::Analyze(analyze) => {
                assert_eq!(analyze.file, PathBuf::from("streams.csv"));
                assert_eq!(
                    analyze.toggle,
                    vec![("a".to_string(), false), ("b".to_string(), true)]
                );
                assert!(analyze.reanalyze);
                assert!(!analyze.reset_toggles);
                assert_eq!(analyze.format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_validation_invalid_api_url() {
        let args = make_args(Command::Serve(ServeArgs {
            bind: None,
            api_url: Some("localhost:8000".to_string()),
            timeout: None,
        }));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let args = make_args(Command::Serve(ServeArgs {
            bind: None,
            api_url: None,
            timeout: Some(0),
        }));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_file() {
        let args = make_args(Command::Analyze(AnalyzeArgs::for_file(
            "/nonexistent/streams.csv",
        )));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_existing_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let args = make_args(Command::Analyze(AnalyzeArgs::for_file(
            file.path().to_str().unwrap(),
        )));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(Command::InitConfig);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(Command::InitConfig);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
