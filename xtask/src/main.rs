use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(author, version, about = "Project automation commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run formatting, lint and test gates
    Ci {
        #[arg(long)]
        profile: Option<String>,
    },
    /// Sweep every page snapshot under the fixtures directory
    Fixtures {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Ci { profile } => run_ci(profile)?,
        Commands::Fixtures { dir } => run_fixtures(dir)?,
    }
    Ok(())
}

fn run_ci(profile: Option<String>) -> Result<()> {
    cargo(&["fmt", "--all", "--", "--check"])?;
    cargo(&[
        "clippy",
        "--workspace",
        "--all-targets",
        "--",
        "-D",
        "warnings",
    ])?;
    let mut args = vec!["nextest", "run", "--workspace"];
    if let Some(profile) = profile.as_deref() {
        args.extend(["--profile", profile]);
    }
    cargo(&args)
}

fn run_fixtures(dir: Option<PathBuf>) -> Result<()> {
    let dir = dir.unwrap_or_else(|| {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../crates/feedsweep/tests/fixtures")
    });
    let mut swept = 0;
    for entry in WalkDir::new(&dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        let path = entry.path();
        let is_page = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("json" | "yaml" | "yml")
        );
        if !entry.file_type().is_file() || !is_page {
            continue;
        }
        println!("==> {}", path.display());
        let file = path.to_string_lossy();
        cargo(&["run", "-q", "-p", "feedsweep", "--", "--quiet", "sweep", &file])?;
        swept += 1;
    }
    if swept == 0 {
        anyhow::bail!("no page snapshots found under {}", dir.display());
    }
    Ok(())
}

fn cargo(args: &[&str]) -> Result<()> {
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {} failed", args.join(" "));
    }
    Ok(())
}
