//! Command-line entry point: sweep and replay page snapshots.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::app::activation::ActivationMatcher;
use crate::app::remover::Remover;
use crate::app::signatures::SignatureTable;
use crate::domain::model::SweepReport;
use crate::infra::config::Config;
use crate::infra::document::NodeId;
use crate::infra::snapshot::{self, MutationScript};

#[derive(Parser)]
#[command(
    name = "feedsweep",
    author,
    version,
    about = "Remove member-only story cards from feed page snapshots",
    long_about = None
)]
pub struct Cli {
    /// Extra configuration file layered over user and workspace config
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Disable debug tracing
    #[arg(short, long, global = true)]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the initial sweep over a page snapshot
    Sweep {
        page: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Sweep a page, then replay streamed insertions batch by batch
    Replay {
        page: PathBuf,
        script: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print the active signature table
    Signatures,
    /// Generate shell completions
    Completions { shell: Shell },
}

#[derive(Args, Debug, Default)]
pub struct OutputArgs {
    /// Write the swept page to FILE (.json, .yaml or .yml)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Print an outline of the swept page
    #[arg(long)]
    pub outline: bool,
    /// Sweep even if the page URL matches no activation pattern
    #[arg(long)]
    pub force: bool,
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "feedsweep", &mut io::stdout());
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.quiet {
        config.logging.set_debug(false);
    }
    crate::init(&config);

    match cli.command {
        Commands::Sweep { page, output } => sweep(&config, &page, None, &output),
        Commands::Replay {
            page,
            script,
            output,
        } => sweep(&config, &page, Some(&script), &output),
        Commands::Signatures => print_signatures(&config),
        Commands::Completions { .. } => Ok(()),
    }
}

fn sweep(config: &Config, page: &Path, script: Option<&Path>, args: &OutputArgs) -> Result<()> {
    let mut doc = snapshot::load_page(page)?;
    let script = script.map(MutationScript::load).transpose()?;

    let matcher = ActivationMatcher::from_config(config)?;
    if !args.force && !matcher.is_active_for(doc.url()) {
        println!(
            "skipped: {} matches none of [{}] (use --force to sweep anyway)",
            doc.url().unwrap_or_default(),
            matcher.patterns().join(", ")
        );
        return Ok(());
    }

    let mut remover: Remover<NodeId> = Remover::from_config(config)?;
    remover.start(&doc);
    let initial = remover.on_paint(&mut doc);

    let mut stdout = io::stdout().lock();
    report(&mut stdout, "initial", initial, args.json)?;

    if let Some(script) = script {
        for (index, batch) in script.batches.iter().enumerate() {
            batch
                .apply(index, &mut doc)
                .with_context(|| format!("failed to replay {}", page.display()))?;
            let swept = remover.pump(&mut doc);
            report(&mut stdout, &format!("batch {index}"), swept, args.json)?;
        }
        report(&mut stdout, "total", remover.total(), args.json)?;
    }

    if let Some(output) = &args.output {
        snapshot::save_page(output, &doc)?;
        tracing::info!(path = %output.display(), "swept page written");
    }
    if args.outline {
        write!(stdout, "{}", doc.outline())?;
    }
    Ok(())
}

fn report(out: &mut impl Write, label: &str, report: SweepReport, json: bool) -> Result<()> {
    if json {
        let line = serde_json::json!({ "sweep": label, "report": report });
        writeln!(out, "{line}")?;
    } else {
        writeln!(out, "{label}: {report}")?;
    }
    Ok(())
}

fn print_signatures(config: &Config) -> Result<()> {
    let table =
        SignatureTable::compile(&config.signatures).context("failed to compile signature table")?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "version = {}", table.version)?;
    writeln!(stdout, "max_hops = {}", config.resolver.max_hops())?;
    for (name, value) in table.entries() {
        writeln!(stdout, "{name} = {value}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn replay_takes_page_and_script() {
        let cli = Cli::try_parse_from([
            "feedsweep",
            "--quiet",
            "replay",
            "page.yaml",
            "script.yaml",
            "--outline",
        ])
        .unwrap();
        assert!(cli.quiet);
        match cli.command {
            Commands::Replay {
                page,
                script,
                output,
            } => {
                assert_eq!(page, PathBuf::from("page.yaml"));
                assert_eq!(script, PathBuf::from("script.yaml"));
                assert!(output.outline);
                assert!(!output.force);
            }
            _ => panic!("expected replay"),
        }
    }

    #[test]
    fn json_report_line_names_the_sweep() -> Result<()> {
        let mut buf = Vec::new();
        let counts = SweepReport {
            markers: 2,
            removed: 1,
            misses: 1,
            ..SweepReport::default()
        };
        report(&mut buf, "batch 0", counts, true)?;
        let value: serde_json::Value = serde_json::from_slice(&buf)?;
        assert_eq!(value["sweep"], "batch 0");
        assert_eq!(value["report"]["removed"], 1);
        Ok(())
    }
}
