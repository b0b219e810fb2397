use anyhow::{Context, Result};
use clap::{error::ErrorKind, Parser};
use colored::control::set_override as set_color_override;
use colored::Colorize;
use juliet_summary::backend::{Analyzer, ExternalAnalyzer};
use juliet_summary::config::{resolve_tool_path, HarnessConfig, DEFAULT_SUPPORT_DIR, DEFAULT_TOOL};
use juliet_summary::corpus::CaseFilter;
use juliet_summary::engine::Aggregator;
use juliet_summary::i18n;
use juliet_summary::report::{print_human, write_summary, ArtifactStore, ARTIFACT_DIR};
use juliet_summary::{t, t_args};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug, Clone)]
#[command(version, about = t!("cli-about"))]
struct Cli {
    // CORPUS, or TOOL SUPPORT CORPUS
    #[arg(value_name = "PATHS", help = t!("cli-paths"))]
    paths: Vec<PathBuf>,

    #[arg(short = 'o', long = "out-dir", value_name = "DIR", default_value = ".", help = t!("cli-out-dir"))]
    out_dir: PathBuf,

    // Replaces the default diagnostic flags when given at least once
    #[arg(long = "enable", value_name = "FLAG", help = t!("cli-enable"))]
    enable: Vec<String>,

    #[arg(long = "marker", value_name = "TEXT", help = t!("cli-marker"))]
    marker: Option<String>,

    #[arg(long = "timeout", value_name = "SECS", help = t!("cli-timeout"))]
    timeout: Option<u64>,

    #[arg(short = 'v', long = "verbose", help = t!("cli-verbose"))]
    verbose: bool,

    #[arg(long = "no-color", help = t!("cli-no-color"))]
    no_color: bool,
}

impl Cli {
    fn into_config(self) -> Option<HarnessConfig> {
        let mut cfg = HarnessConfig::from_positionals(&self.paths)?;
        cfg.out_dir = self.out_dir;
        if !self.enable.is_empty() {
            cfg.diagnostic_flags = self.enable;
        }
        if let Some(marker) = self.marker {
            cfg.marker = marker;
        }
        cfg.timeout = self.timeout.map(Duration::from_secs);
        Some(cfg)
    }
}

/// Format clap errors with localized headings
fn format_clap_error(error: &clap::Error) -> String {
    let mut msg = error.render().to_string();
    msg = msg.replace("Usage:", &t!("cli-error-usage").bold().underline().to_string());
    msg = msg.replace("error:", &t!("cli-error-label").red().bold().to_string());
    msg = msg.replace("For more information, try '--help'.", &t!("cli-error-help-info"));
    msg
}

fn print_usage() {
    let name = env!("CARGO_PKG_NAME");
    println!("{}", t!("usage-intro"));
    println!("{}", t_args!("usage-full", "name" => name));
    println!("{}", t_args!("usage-short", "name" => name));
    println!("{}", t!("usage-legend"));
    println!("{}", t_args!("usage-legend-tool", "default" => DEFAULT_TOOL));
    println!("{}", t_args!("usage-legend-support", "default" => DEFAULT_SUPPORT_DIR));
    println!("{}", t!("usage-legend-corpus"));
}

fn main() -> Result<()> {
    i18n::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            match error.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    print!("{}", error.render());
                    std::process::exit(0);
                }
                _ => {
                    eprint!("{}", format_clap_error(&error));
                    std::process::exit(1);
                }
            }
        }
    };

    // -v shows INFO; RUST_LOG wins either way
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "juliet_summary=info".to_string()
        } else {
            "juliet_summary=warn".to_string()
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    set_color_override(!cli.no_color);

    let Some(config) = cli.into_config() else {
        print_usage();
        return Ok(());
    };

    info!(
        "{}",
        t_args!("info-version",
            "name" => env!("CARGO_PKG_NAME"),
            "version" => env!("CARGO_PKG_VERSION")
        )
    );
    info!("{}", t_args!("info-tool", "path" => resolve_tool_path(&config.tool)));
    info!("{}", t_args!("info-support", "path" => config.support_dir.display()));
    info!("{}", t_args!("info-corpus", "path" => config.corpus.display()));

    let analyzer = ExternalAnalyzer {
        timeout: config.timeout,
    };
    // Not fatal: every variant just ends up unresolved
    if let Err(e) = analyzer.validate(&config.tool) {
        warn!("{}", t_args!("warn-validation-failed", "error" => e));
    }

    let template = config.template();
    let classifier = config.classifier();
    let filter = CaseFilter::juliet();
    let artifact_dir = config.artifact_dir();
    let artifacts = ArtifactStore::create(&artifact_dir)
        .with_context(|| t_args!("error-output-dir", "path" => artifact_dir.display()))?;

    let outcome = Aggregator::new(&analyzer, &template, &classifier, &filter, &artifacts)
        .run(&config.corpus)
        .context(t!("error-run-aborted"))?;

    let summary_path = config.summary_path();
    write_summary(&summary_path, &outcome.document, ARTIFACT_DIR)
        .with_context(|| t_args!("error-summary-write", "path" => summary_path.display()))?;

    print_human(&outcome);
    info!("{}", t_args!("info-written", "path" => summary_path.display()));
    Ok(())
}
