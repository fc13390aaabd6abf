//! Pipeline execution implementation.

use crate::core::dedup::{Deduplicator, DeduplicationResult, NoDeduplication};
use crate::core::metadata::{gather_file_info, ExifProcessor, GatherFileInfoResult, MetadataProcessor};
use crate::core::organize::{
    Filesystem, LocalFilesystem, OperationMode, OrganizeConfig, OrganizePlanner, PathReservations,
    PathTemplate, TransferExecutor,
};
use crate::core::scanner::{DiscoveryResult, MediaScanner, ParallelScanner, ScanConfig};
use crate::error::{OrganizerError, TemplateError, TransferError};
use crate::events::{
    null_sender, Event, EventSender, PipelineEvent, PipelinePhase, PipelineSummary, TransferEvent,
    TransferPhase, TransferProgress,
};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Per-category counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseSummary {
    pub total: usize,
    pub transferred: usize,
    /// Not attempted (no metadata, or no destination configured)
    pub skipped: usize,
    pub failed: usize,
}

impl PhaseSummary {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Transferred => self.transferred += 1,
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Result of the placement stage
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlacementResult {
    pub unique: PhaseSummary,
    pub duplicates: PhaseSummary,
    pub representatives: PhaseSummary,
    pub error_files: PhaseSummary,
    /// One message per skipped or failed file (non-fatal)
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl PlacementResult {
    fn phases(&self) -> [&PhaseSummary; 4] {
        [
            &self.unique,
            &self.duplicates,
            &self.representatives,
            &self.error_files,
        ]
    }

    pub fn transferred(&self) -> usize {
        self.phases().iter().map(|p| p.transferred).sum()
    }

    pub fn skipped(&self) -> usize {
        self.phases().iter().map(|p| p.skipped).sum()
    }

    pub fn failed(&self) -> usize {
        self.phases().iter().map(|p| p.failed).sum()
    }
}

/// Result of a full run: discovery, metadata, deduplication and placement
#[derive(Debug)]
pub struct OrganizeResult {
    pub discovery: DiscoveryResult,
    /// Files whose metadata could not be read
    pub error_files: Vec<PathBuf>,
    pub deduplication: DeduplicationResult,
    pub placement: PlacementResult,
    pub duration_ms: u64,
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: OrganizeConfig,
    scan_config: ScanConfig,
    filesystem: Option<Arc<dyn Filesystem>>,
    processor: Option<Arc<dyn MetadataProcessor>>,
    deduplicator: Option<Box<dyn Deduplicator>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: OrganizeConfig::default(),
            scan_config: ScanConfig::default(),
            filesystem: None,
            processor: None,
            deduplicator: None,
        }
    }

    /// Replace the whole placement configuration
    pub fn config(mut self, config: OrganizeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the destination template
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.config.format = format.into();
        self
    }

    pub fn target_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.target_dir = dir.into();
        self
    }

    /// Separate duplicates into this directory instead of keeping representatives
    pub fn duplicate_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.duplicate_dir = Some(dir.into());
        self
    }

    /// Send files with unreadable metadata here
    pub fn error_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.error_dir = Some(dir.into());
        self
    }

    pub fn operation(mut self, operation: OperationMode) -> Self {
        self.config.operation = operation;
        self
    }

    /// Number of files placed concurrently within a category
    pub fn transfer_threads(mut self, threads: usize) -> Self {
        self.config.transfer_threads = threads;
        self
    }

    /// Set discovery configuration
    pub fn scan_config(mut self, config: ScanConfig) -> Self {
        self.scan_config = config;
        self
    }

    pub fn filesystem(mut self, filesystem: Arc<dyn Filesystem>) -> Self {
        self.filesystem = Some(filesystem);
        self
    }

    /// Set the metadata extractor
    pub fn processor(mut self, processor: Arc<dyn MetadataProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Set the deduplication collaborator
    pub fn deduplicator(mut self, deduplicator: Box<dyn Deduplicator>) -> Self {
        self.deduplicator = Some(deduplicator);
        self
    }

    /// Validate the configuration and compile the template
    pub fn build(self) -> Result<Pipeline, OrganizerError> {
        let config = self.config;

        if config.target_dir.as_os_str().is_empty() {
            return Err(OrganizerError::Config(
                "a target directory is required".to_string(),
            ));
        }
        if config.transfer_threads == 0 {
            return Err(OrganizerError::Config(
                "transfer threads must be at least 1".to_string(),
            ));
        }
        if self.scan_config.concurrency == 0 {
            return Err(OrganizerError::Config(
                "discovery concurrency must be at least 1".to_string(),
            ));
        }

        let template = PathTemplate::compile(&config.format);
        if !template.has_tokens() {
            warn!(format = %config.format, "format has no tokens; every file lands in one directory");
        }
        for key in template.unknown_keys() {
            warn!(token = key, "unknown token will render as an empty string");
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.transfer_threads)
            .thread_name(|i| format!("placement-{i}"))
            .build()
            .map_err(|e| OrganizerError::Config(e.to_string()))?;

        let filesystem = self
            .filesystem
            .unwrap_or_else(|| Arc::new(LocalFilesystem));

        Ok(Pipeline {
            config,
            template,
            scanner: ParallelScanner::new(self.scan_config),
            processor: self
                .processor
                .unwrap_or_else(|| Arc::new(ExifProcessor::new())),
            deduplicator: self
                .deduplicator
                .unwrap_or_else(|| Box::new(NoDeduplication)),
            executor: TransferExecutor::new(filesystem),
            pool,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a file's destination comes from
enum Destination {
    /// Template expansion under the target directory
    Templated,
    /// Original basename inside a fixed directory
    Basename(PathBuf),
}

struct Job {
    source: PathBuf,
    destination: Destination,
}

enum Outcome {
    Transferred,
    Skipped(String),
    Failed(String),
}

/// The media organization pipeline
pub struct Pipeline {
    config: OrganizeConfig,
    template: PathTemplate,
    scanner: ParallelScanner,
    processor: Arc<dyn MetadataProcessor>,
    deduplicator: Box<dyn Deduplicator>,
    executor: TransferExecutor,
    pool: rayon::ThreadPool,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &OrganizeConfig {
        &self.config
    }

    /// Run every stage without events
    pub fn run(&self, roots: &[PathBuf]) -> Result<OrganizeResult, OrganizerError> {
        self.run_with_events(roots, &null_sender())
    }

    /// Discover, read metadata, deduplicate, then place
    pub fn run_with_events(
        &self,
        roots: &[PathBuf],
        events: &EventSender,
    ) -> Result<OrganizeResult, OrganizerError> {
        let start_time = Instant::now();
        events.send(Event::Pipeline(PipelineEvent::Started));

        // Phase 1: Discovery
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Discovering,
        }));
        let discovery = self.scanner.discover_with_events(roots, events)?;

        // Phase 2: Metadata
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Gathering,
        }));
        let gathered = gather_file_info(&discovery.all_files(), self.processor.as_ref(), events);

        let mut readable: Vec<PathBuf> = gathered.file_infos.keys().cloned().collect();
        readable.sort();
        let deduplication = self.deduplicator.deduplicate(&readable)?;

        // Phase 3: Placement
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Placing,
        }));
        let placement = self.place_with_events(&deduplication, &gathered, events)?;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: PipelineSummary {
                transferred: placement.transferred(),
                skipped: placement.skipped(),
                failed: placement.failed(),
                duration_ms,
            },
        }));

        Ok(OrganizeResult {
            discovery,
            error_files: gathered.error_files,
            deduplication,
            placement,
            duration_ms,
        })
    }

    /// Place already-gathered files without events
    pub fn place(
        &self,
        dedup: &DeduplicationResult,
        gathered: &GatherFileInfoResult,
    ) -> Result<PlacementResult, OrganizerError> {
        self.place_with_events(dedup, gathered, &null_sender())
    }

    /// Transfer each category in order: unique, then duplicates (with a
    /// duplicate directory) or representatives (without), then error files.
    ///
    /// Per-file problems are counted and logged; only an inconsistent
    /// deduplication result fails the call.
    pub fn place_with_events(
        &self,
        dedup: &DeduplicationResult,
        gathered: &GatherFileInfoResult,
        events: &EventSender,
    ) -> Result<PlacementResult, OrganizerError> {
        dedup.validate()?;

        let start_time = Instant::now();
        let reservations = PathReservations::new();
        let mut result = PlacementResult::default();

        let unique = dedup
            .unique_files
            .iter()
            .map(|source| Job {
                source: source.clone(),
                destination: Destination::Templated,
            })
            .collect();
        result.unique = self.run_phase(
            TransferPhase::Unique,
            unique,
            gathered,
            &reservations,
            &mut result.errors,
            events,
        );

        match &self.config.duplicate_dir {
            Some(duplicate_dir) => {
                let duplicates = dedup
                    .duplicate_sets
                    .iter()
                    .flat_map(|set| {
                        let folder = duplicate_dir.join(file_stem(&set.best_file));
                        set.duplicates.iter().map(move |source| Job {
                            source: source.clone(),
                            destination: Destination::Basename(folder.clone()),
                        })
                    })
                    .collect();
                result.duplicates = self.run_phase(
                    TransferPhase::Duplicate,
                    duplicates,
                    gathered,
                    &reservations,
                    &mut result.errors,
                    events,
                );
            }
            None => {
                let representatives = dedup
                    .duplicate_sets
                    .iter()
                    .flat_map(|set| &set.representatives)
                    .map(|source| Job {
                        source: source.clone(),
                        destination: Destination::Templated,
                    })
                    .collect();
                result.representatives = self.run_phase(
                    TransferPhase::Representative,
                    representatives,
                    gathered,
                    &reservations,
                    &mut result.errors,
                    events,
                );
            }
        }

        match &self.config.error_dir {
            Some(error_dir) => {
                let error_files = gathered
                    .error_files
                    .iter()
                    .map(|source| Job {
                        source: source.clone(),
                        destination: Destination::Basename(error_dir.clone()),
                    })
                    .collect();
                result.error_files = self.run_phase(
                    TransferPhase::Error,
                    error_files,
                    gathered,
                    &reservations,
                    &mut result.errors,
                    events,
                );
            }
            None if !gathered.error_files.is_empty() => {
                info!(
                    count = gathered.error_files.len(),
                    "no error directory configured; unreadable files left in place"
                );
                result.error_files = PhaseSummary {
                    total: gathered.error_files.len(),
                    skipped: gathered.error_files.len(),
                    ..Default::default()
                };
            }
            None => {}
        }

        result.duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            transferred = result.transferred(),
            skipped = result.skipped(),
            failed = result.failed(),
            duration_ms = result.duration_ms,
            "placement finished"
        );

        Ok(result)
    }

    fn run_phase(
        &self,
        phase: TransferPhase,
        jobs: Vec<Job>,
        gathered: &GatherFileInfoResult,
        reservations: &PathReservations,
        errors: &mut Vec<String>,
        events: &EventSender,
    ) -> PhaseSummary {
        let total = jobs.len();
        let mut summary = PhaseSummary {
            total,
            ..Default::default()
        };
        if total == 0 {
            return summary;
        }

        events.send(Event::Transfer(TransferEvent::PhaseStarted { phase, total }));
        let completed = AtomicUsize::new(0);

        let outcomes: Vec<Outcome> = self.pool.install(|| {
            jobs.par_iter()
                .map(|job| {
                    let outcome = self.place_file(job, gathered, reservations);

                    match &outcome {
                        Outcome::Transferred => {}
                        Outcome::Skipped(message) | Outcome::Failed(message) => {
                            events.send(Event::Transfer(TransferEvent::Error {
                                phase,
                                path: job.source.clone(),
                                message: message.clone(),
                            }));
                        }
                    }

                    // Skipped and failed files advance progress too
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    events.send(Event::Transfer(TransferEvent::Progress(TransferProgress {
                        phase,
                        completed: done,
                        total,
                        current_path: job.source.clone(),
                    })));

                    outcome
                })
                .collect()
        });

        for outcome in &outcomes {
            summary.record(outcome);
            if let Outcome::Skipped(message) | Outcome::Failed(message) = outcome {
                errors.push(message.clone());
            }
        }

        events.send(Event::Transfer(TransferEvent::PhaseCompleted {
            phase,
            transferred: summary.transferred,
            skipped: summary.skipped,
            failed: summary.failed,
        }));
        debug!(%phase, ?summary, "phase complete");

        summary
    }

    fn place_file(
        &self,
        job: &Job,
        gathered: &GatherFileInfoResult,
        reservations: &PathReservations,
    ) -> Outcome {
        let source = job.source.as_path();
        let fs = self.executor.filesystem();
        let is_taken = |candidate: &Path| !reservations.claim(candidate, fs);

        let target = match &job.destination {
            Destination::Templated => {
                let info = match gathered.process_file(source) {
                    Ok(info) => info,
                    Err(e) => {
                        warn!(path = %source.display(), "skipping: {e}");
                        return Outcome::Skipped(e.to_string());
                    }
                };
                OrganizePlanner::generate_target_path(
                    &self.template,
                    &self.config.target_dir,
                    &info,
                    source,
                    is_taken,
                )
            }
            Destination::Basename(directory) => match source.file_name() {
                Some(name) => OrganizePlanner::resolve_collision(
                    directory,
                    &name.to_string_lossy(),
                    source,
                    is_taken,
                ),
                None => {
                    return Outcome::Failed(format!("{} has no file name", source.display()));
                }
            },
        };

        let target = match target {
            Ok(target) => target,
            Err(e @ TemplateError::CollisionExhausted { .. }) => {
                error!(path = %source.display(), "{e}");
                return Outcome::Failed(TransferError::from(e).to_string());
            }
        };

        match self.executor.transfer(source, &target, self.config.operation) {
            Ok(()) => {
                debug!(from = %source.display(), to = %target.display(), "transferred");
                Outcome::Transferred
            }
            Err(e) => {
                error!(path = %source.display(), "{e}");
                Outcome::Failed(e.to_string())
            }
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
