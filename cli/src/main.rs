//! bookcut CLI - split a compiled book into chapter PDFs and an HTML site

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use bookcut::{
    BoundaryStrategy, BuildInputs, BuildOptions, LopdfBackend, Pipeline, RangeKind, RunSummary,
    Stage, TocSource, VerificationReport,
};

#[derive(Parser)]
#[command(name = "bookcut")]
#[command(version)]
#[command(about = "Split a compiled LaTeX book into chapter PDFs, a bibliography and an HTML site", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Partition the book and assemble the site
    Build {
        /// Compiled master PDF
        #[arg(value_name = "MASTER")]
        master: PathBuf,

        #[command(flatten)]
        toc: TocArgs,

        /// Directory of per-page HTML fragments (page-N.html)
        #[arg(short, long, value_name = "DIR")]
        fragments: PathBuf,

        /// Site output directory
        #[arg(long, value_name = "DIR", env = "BOOKCUT_SITE_DIR", default_value = "site")]
        site_dir: PathBuf,

        /// PDF downloads directory
        #[arg(
            long,
            value_name = "DIR",
            env = "BOOKCUT_DOWNLOADS_DIR",
            default_value = "downloads"
        )]
        downloads_dir: PathBuf,

        /// Book title (master file name if not specified)
        #[arg(long, env = "BOOKCUT_TITLE")]
        title: Option<String>,

        #[command(flatten)]
        resolve: ResolveArgs,

        /// Fail when no bibliography is found
        #[arg(long)]
        require_bibliography: bool,

        /// Skip the strict verification pass
        #[arg(long)]
        no_verify: bool,

        /// Disable parallel processing
        #[arg(long)]
        sequential: bool,

        /// Show progress and a summary
        #[arg(long)]
        progress: bool,
    },

    /// Print the resolved page ranges
    Ranges {
        /// Compiled master PDF
        #[arg(value_name = "MASTER")]
        master: PathBuf,

        #[command(flatten)]
        toc: TocArgs,

        #[command(flatten)]
        resolve: ResolveArgs,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-check an existing build against its manifest
    Verify {
        /// Site directory containing manifest.json
        #[arg(value_name = "DIR", env = "BOOKCUT_SITE_DIR", default_value = "site")]
        site_dir: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct TocArgs {
    /// Table of contents (.toc or .json)
    #[arg(short, long, value_name = "FILE", conflicts_with = "outline")]
    toc: Option<PathBuf>,

    /// Use the PDF outline as the table of contents
    #[arg(long)]
    outline: bool,
}

impl TocArgs {
    fn source(&self) -> Result<TocSource, Box<dyn std::error::Error>> {
        match (&self.toc, self.outline) {
            (Some(path), _) => Ok(TocSource::from_path(path)),
            (None, true) => Ok(TocSource::Outline),
            (None, false) => Err("either --toc <FILE> or --outline is required".into()),
        }
    }
}

#[derive(Args)]
struct ResolveArgs {
    /// Bibliography locator: signature, toc-hint or last:N
    #[arg(long, default_value = "signature", value_parser = parse_strategy)]
    strategy: BoundaryStrategy,

    /// Bibliography heading word (repeatable)
    #[arg(long = "heading-word", value_name = "WORD")]
    heading_words: Vec<String>,

    /// Offset added to printed page numbers without a label table
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    page_offset: i64,

    /// TOC level treated as top level
    #[arg(long)]
    top_level: Option<u8>,
}

impl ResolveArgs {
    fn apply(&self, mut options: BuildOptions) -> BuildOptions {
        options = options
            .with_strategy(self.strategy)
            .with_page_offset(self.page_offset);
        if !self.heading_words.is_empty() {
            options = options.with_heading_words(self.heading_words.clone());
        }
        if let Some(level) = self.top_level {
            options = options.with_top_level(level);
        }
        options
    }
}

fn parse_strategy(s: &str) -> Result<BoundaryStrategy, String> {
    s.parse().map_err(|e: bookcut::Error| e.to_string())
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build {
            master,
            toc,
            fragments,
            site_dir,
            downloads_dir,
            title,
            resolve,
            require_bibliography,
            no_verify,
            sequential,
            progress,
        } => toc.source().and_then(|toc| {
            let mut options = resolve
                .apply(BuildOptions::new())
                .with_site_dir(site_dir)
                .with_downloads_dir(downloads_dir)
                .with_require_bibliography(require_bibliography)
                .with_verify(!no_verify)
                .with_parallel(!sequential);
            if let Some(title) = title {
                options = options.with_title(title);
            }
            cmd_build(BuildInputs::new(master, toc, fragments), options, progress)
        }),
        Commands::Ranges {
            master,
            toc,
            resolve,
            json,
        } => toc
            .source()
            .and_then(|toc| cmd_ranges(&master, &toc, resolve.apply(BuildOptions::new()), json)),
        Commands::Verify { site_dir } => cmd_verify(&site_dir),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_build(
    inputs: BuildInputs,
    options: BuildOptions,
    progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let stages = if options.verify { 8 } else { 7 };
    let pb = if progress {
        let pb = ProgressBar::new(stages);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let pipeline = Pipeline::new(options);
    let mut started = false;
    let summary = pipeline.run_with(&inputs, |stage: Stage| {
        if started {
            pb.inc(1);
        }
        started = true;
        pb.set_message(stage.to_string());
    })?;
    pb.inc(1);
    pb.finish_with_message("Done!");

    write_warnings(&mut std::io::stderr().lock(), &summary.warnings)?;
    for failure in &summary.partition.failures {
        eprintln!("{} {}", "failed:".red().bold(), failure);
    }
    if let Some(report) = &summary.verification {
        print_violations(report);
    }

    if progress {
        print_summary(&summary);
    }

    summary.check()?;
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("\n{}", "Output files:".green().bold());
    let count = summary.manifest.ranges.len();
    for (idx, entry) in summary.manifest.ranges.iter().enumerate() {
        let branch = if idx + 1 == count { "└─" } else { "├─" };
        println!(
            "  {} {} / {} {}",
            branch.dimmed(),
            entry.html,
            entry.pdf,
            format!("(pp. {}-{})", entry.range.start_page, entry.range.end_page).dimmed()
        );
    }
    println!("  {} {}", "manifest:".dimmed(), summary.manifest_path.display());
}

/// Warnings are reported whatever the log level.
fn write_warnings(out: &mut impl Write, warnings: &[String]) -> std::io::Result<()> {
    for warning in warnings {
        writeln!(out, "{} {}", "warning:".yellow().bold(), warning)?;
    }
    Ok(())
}

fn print_violations(report: &VerificationReport) {
    for violation in &report.violations {
        eprintln!("  {} {}", violation.rule.id().red(), violation.detail);
    }
}

fn cmd_ranges(
    master: &Path,
    toc: &TocSource,
    options: BuildOptions,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = LopdfBackend::load_file(master)?;
    let plan = Pipeline::new(options).plan(&backend, toc)?;
    let partition = &plan.partition;

    if json {
        println!("{}", serde_json::to_string_pretty(partition.ranges())?);
        return Ok(());
    }

    println!("{}", "Page Ranges".cyan().bold());
    println!("{}", "─".repeat(60).dimmed());
    for range in partition.ranges() {
        let kind = match range.kind {
            RangeKind::Chapter => format!("{:<12}", "chapter").normal(),
            RangeKind::Preface => format!("{:<12}", "preface").yellow(),
            RangeKind::Bibliography => format!("{:<12}", "bibliography").magenta(),
        };
        println!(
            "{:>3}  {}  {:>5}-{:<5}  {}",
            range.ordinal, kind, range.start_page, range.end_page, range.title
        );
        for alias in &range.aliases {
            println!("{:>24}  {} {}", "", "+".dimmed(), alias.as_str().dimmed());
        }
    }
    println!("{}", "─".repeat(60).dimmed());
    println!("{}: {}", "Pages".bold(), partition.total_pages());
    match partition.bibliography() {
        Some(window) => println!("{}: {}", "Bibliography".bold(), window),
        None => println!("{}: {}", "Bibliography".bold(), "not found".yellow()),
    }
    for warning in &plan.warnings {
        println!("{} {}", "warning:".yellow().bold(), warning);
    }

    Ok(())
}

fn cmd_verify(site_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let report = bookcut::verify_site(site_dir)?;
    if report.passed() {
        return Ok(());
    }
    print_violations(&report);
    Err(bookcut::Error::Verification(report.violations.len()).into())
}

fn cmd_version() {
    println!("{} {}", "bookcut".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Chapter PDF and HTML site builder for LaTeX books");
    println!();
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_warnings() {
        let mut out = Vec::new();
        let warnings = vec!["Bibliography not found at or after page 31 of 40".to_string()];
        write_warnings(&mut out, &warnings).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("warning:"));
        assert!(text.contains("not found at or after page 31"));
        assert_eq!(text.lines().count(), 1);

        let mut out = Vec::new();
        write_warnings(&mut out, &[]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!(parse_strategy("last:3").unwrap(), BoundaryStrategy::FixedOffset(3));
        assert!(parse_strategy("middle").is_err());
    }
}
