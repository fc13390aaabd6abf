//! # CLI Module
//!
//! Command-line interface for the media organizer.
//!
//! ## Usage
//! ```bash
//! # Count supported files per extension
//! media-sort discover ~/Pictures /Volumes/card
//!
//! # Copy into a dated tree
//! media-sort organize ~/Pictures --target ~/Library --format "{D.YYYY}/{D.MMMM}/{NAME}.{EXT}"
//!
//! # Move, separating duplicates listed in a deduplication report
//! media-sort organize ~/Pictures --target ~/Library --move \
//!     --dedup-report dedup.json --duplicates ~/Library-dupes --errors ~/Library-errors
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use media_organizer::core::dedup::ReportDeduplicator;
use media_organizer::core::organize::OperationMode;
use media_organizer::core::pipeline::{OrganizeResult, PhaseSummary, Pipeline};
use media_organizer::core::scanner::{DiscoveryResult, MediaScanner, ParallelScanner, ScanConfig};
use media_organizer::error::Result;
use media_organizer::events::{
    DiscoveryEvent, Event, EventChannel, EventReceiver, GatherEvent, PipelineEvent, TransferEvent,
    TransferPhase,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::thread;

const DEFAULT_FORMAT: &str = "{D.YYYY}/{D.MM}/{NAME}.{EXT}";

/// Media Organizer - sort photos and videos into a tree you name
#[derive(Parser, Debug)]
#[command(name = "media-sort")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find supported media files and count them per extension
    Discover {
        /// Source directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        scan: ScanArgs,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Copy or move media files into a target tree
    Organize {
        /// Source directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Root of the organized tree
        #[arg(short, long)]
        target: PathBuf,

        /// Destination template
        #[arg(short, long, default_value = DEFAULT_FORMAT)]
        format: String,

        /// Separate duplicates into this directory
        #[arg(long)]
        duplicates: Option<PathBuf>,

        /// Send files with unreadable metadata here
        #[arg(long)]
        errors: Option<PathBuf>,

        /// Move instead of copy
        #[arg(long = "move")]
        move_files: bool,

        /// Files placed concurrently within a category
        #[arg(long, default_value = "1")]
        threads: usize,

        /// JSON deduplication report (unique files and duplicate sets)
        #[arg(long)]
        dedup_report: Option<PathBuf>,

        #[command(flatten)]
        scan: ScanArgs,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// List every failed file
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(clap::Args, Debug)]
struct ScanArgs {
    /// Directories listed at the same time
    #[arg(short, long, default_value = "10")]
    concurrency: usize,

    /// Skip hidden files and directories
    #[arg(long)]
    skip_hidden: bool,

    /// Descend into symlinked directories
    #[arg(long)]
    follow_symlinks: bool,
}

impl From<ScanArgs> for ScanConfig {
    fn from(args: ScanArgs) -> Self {
        ScanConfig {
            concurrency: args.concurrency,
            follow_symlinks: args.follow_symlinks,
            skip_hidden: args.skip_hidden,
            extensions: None,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (counts only)
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    media_organizer::init_tracing();

    match cli.command {
        Commands::Discover { paths, scan, output } => run_discover(paths, scan.into(), output),
        Commands::Organize {
            paths,
            target,
            format,
            duplicates,
            errors,
            move_files,
            threads,
            dedup_report,
            scan,
            output,
            verbose,
        } => {
            let mut builder = Pipeline::builder()
                .format(format)
                .target_dir(target)
                .operation(if move_files {
                    OperationMode::Move
                } else {
                    OperationMode::Copy
                })
                .transfer_threads(threads)
                .scan_config(scan.into());
            if let Some(dir) = duplicates {
                builder = builder.duplicate_dir(dir);
            }
            if let Some(dir) = errors {
                builder = builder.error_dir(dir);
            }
            if let Some(report) = dedup_report {
                builder = builder.deduplicator(Box::new(ReportDeduplicator::new(report)));
            }
            run_organize(builder.build()?, paths, output, verbose)
        }
    }
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

fn run_discover(paths: Vec<PathBuf>, config: ScanConfig, output: OutputFormat) -> Result<()> {
    let term = Term::stderr();
    let scanner = ParallelScanner::new(config);
    let (sender, receiver) = EventChannel::new();

    let spinner = matches!(output, OutputFormat::Pretty).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb
    });

    let spinner_clone = spinner.clone();
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            if let (Some(pb), Event::Discovery(DiscoveryEvent::Progress(p))) = (&spinner_clone, event)
            {
                pb.set_message(format!(
                    "{} files in {} directories",
                    p.files_found, p.directories_scanned
                ));
                pb.tick();
            }
        }
    });

    let result = scanner.discover_with_events(&paths, &sender);

    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let result = result?;

    match output {
        OutputFormat::Pretty => print_pretty_discovery(&term, &result),
        OutputFormat::Json => print_json_discovery(&result),
        OutputFormat::Minimal => println!("{}", result.total_files),
    }

    Ok(())
}

fn print_pretty_discovery(term: &Term, result: &DiscoveryResult) {
    term.write_line(&format!(
        "{} Discovery Complete",
        style("✓").green().bold()
    ))
    .ok();
    term.write_line("").ok();

    for (ext, kind, count) in result.format_stats() {
        term.write_line(&format!(
            "  {:<6} {:>8}  {}",
            ext,
            style(count).cyan(),
            style(kind).dim()
        ))
        .ok();
    }

    term.write_line("").ok();
    term.write_line(&format!(
        "  {} files in {} directories",
        style(result.total_files).cyan().bold(),
        style(result.directories_scanned).cyan()
    ))
    .ok();

    for error in &result.errors {
        term.write_line(&format!("  {} {}", style("!").red(), error)).ok();
    }
}

fn print_json_discovery(result: &DiscoveryResult) {
    let output = serde_json::json!({
        "total_files": result.total_files,
        "directories_scanned": result.directories_scanned,
        "formats": result.format_stats().iter().map(|(ext, kind, count)| {
            serde_json::json!({ "extension": ext, "type": kind, "count": count })
        }).collect::<Vec<_>>(),
        "errors": result.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
    });

    if let Ok(json) = serde_json::to_string_pretty(&output) {
        println!("{json}");
    }
}

/// Drive progress bars from pipeline events until the sender is dropped
fn render_progress(receiver: EventReceiver, multi: MultiProgress) {
    let status = multi.add(ProgressBar::new_spinner());
    let mut gather_bar: Option<ProgressBar> = None;
    let mut phase_bars: HashMap<TransferPhase, ProgressBar> = HashMap::new();

    for event in receiver.iter() {
        match event {
            Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                status.set_message(format!("{phase}"));
                status.tick();
            }
            Event::Discovery(DiscoveryEvent::Progress(p)) => {
                status.set_message(format!(
                    "Discovering: {} files in {} directories",
                    p.files_found, p.directories_scanned
                ));
                status.tick();
            }
            Event::Gather(GatherEvent::Started { total_files }) => {
                let pb = multi.add(ProgressBar::new(total_files as u64));
                pb.set_style(bar_style("Metadata  [{bar:40.cyan/blue}] {pos}/{len} Files"));
                gather_bar = Some(pb);
            }
            Event::Gather(GatherEvent::Progress { completed, .. }) => {
                if let Some(ref pb) = gather_bar {
                    pb.set_position(completed as u64);
                }
            }
            Event::Transfer(TransferEvent::PhaseStarted { phase, total }) => {
                let pb = multi.add(ProgressBar::new(total as u64));
                pb.set_style(bar_style(&format!(
                    "{:<9} [{{bar:40.cyan/blue}}] {{percent}}% || {{pos}}/{{len}} Files",
                    phase.to_string()
                )));
                phase_bars.insert(phase, pb);
            }
            Event::Transfer(TransferEvent::Progress(p)) => {
                if let Some(pb) = phase_bars.get(&p.phase) {
                    pb.set_position(p.completed as u64);
                }
            }
            Event::Transfer(TransferEvent::PhaseCompleted { phase, .. }) => {
                if let Some(pb) = phase_bars.get(&phase) {
                    pb.finish();
                }
            }
            Event::Pipeline(PipelineEvent::Completed { .. }) => {
                status.finish_and_clear();
            }
            _ => {}
        }
    }
}

fn run_organize(
    pipeline: Pipeline,
    paths: Vec<PathBuf>,
    output: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let term = Term::stderr();

    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Media Organizer").bold().cyan(),
            style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let (sender, receiver) = EventChannel::new();
    let event_thread = matches!(output, OutputFormat::Pretty)
        .then(|| thread::spawn(move || render_progress(receiver, MultiProgress::new())));

    let result = pipeline.run_with_events(&paths, &sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    if let Some(handle) = event_thread {
        handle.join().ok();
    }
    let result = result?;

    match output {
        OutputFormat::Pretty => print_pretty_results(&term, &pipeline, &result, verbose),
        OutputFormat::Json => print_json_results(&result),
        OutputFormat::Minimal => println!(
            "{} {} {}",
            result.placement.transferred(),
            result.placement.skipped(),
            result.placement.failed()
        ),
    }

    Ok(())
}

fn summary_line(term: &Term, label: &str, summary: &PhaseSummary) {
    if summary.total == 0 {
        return;
    }
    term.write_line(&format!(
        "  {:<16} {} transferred, {} skipped, {} failed",
        label,
        style(summary.transferred).green(),
        style(summary.skipped).yellow(),
        style(summary.failed).red()
    ))
    .ok();
}

fn print_pretty_results(term: &Term, pipeline: &Pipeline, result: &OrganizeResult, verbose: bool) {
    let placement = &result.placement;
    let config = pipeline.config();
    let verb = match config.operation {
        OperationMode::Copy => "copied",
        OperationMode::Move => "moved",
    };

    term.write_line("").ok();
    term.write_line(&format!(
        "{} File transfer completed",
        style("✓").green().bold()
    ))
    .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} files discovered in {} directories",
        style(result.discovery.total_files).cyan(),
        style(result.discovery.directories_scanned).cyan()
    ))
    .ok();
    let dedup = &result.deduplication;
    if !dedup.duplicate_sets.is_empty() {
        term.write_line(&format!(
            "  {} duplicate sets ({} duplicates, {} best files)",
            style(dedup.duplicate_sets.len()).cyan(),
            style(dedup.duplicate_count()).yellow(),
            style(dedup.representative_count()).cyan()
        ))
        .ok();
    }
    term.write_line(&format!(
        "  {} files {} in {:.1}s",
        style(placement.transferred()).cyan(),
        verb,
        result.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line("").ok();

    summary_line(term, "Unique", &placement.unique);
    summary_line(term, "Duplicates", &placement.duplicates);
    summary_line(term, "Best files", &placement.representatives);
    summary_line(term, "Error files", &placement.error_files);

    if let Some(dir) = &config.duplicate_dir {
        if placement.duplicates.transferred > 0 {
            term.write_line(&format!(
                "\n  {}",
                style(format!("Duplicate files have been {verb} to {}", dir.display())).yellow()
            ))
            .ok();
        } else {
            term.write_line(&format!("\n  {}", style("No duplicate files to process.").yellow()))
                .ok();
        }
    }
    if let Some(dir) = &config.error_dir {
        if placement.error_files.transferred > 0 {
            term.write_line(&format!(
                "  {}",
                style(format!("Error files have been {verb} to {}", dir.display())).red()
            ))
            .ok();
        }
    }

    if !placement.errors.is_empty() {
        term.write_line("").ok();
        if verbose {
            for message in &placement.errors {
                term.write_line(&format!("  {} {}", style("✗").red(), message)).ok();
            }
        } else {
            term.write_line(&format!(
                "  {} {} files were not placed (use --verbose to list them)",
                style("!").yellow(),
                placement.errors.len()
            ))
            .ok();
        }
    }
}

fn print_json_results(result: &OrganizeResult) {
    let output = serde_json::json!({
        "total_files": result.discovery.total_files,
        "directories_scanned": result.discovery.directories_scanned,
        "error_files": result.error_files,
        "duplicate_sets": result.deduplication.duplicate_sets.len(),
        "duplicates": result.deduplication.duplicate_count(),
        "representatives": result.deduplication.representative_count(),
        "placement": result.placement,
        "duration_ms": result.duration_ms,
    });

    if let Ok(json) = serde_json::to_string_pretty(&output) {
        println!("{json}");
    }
}
