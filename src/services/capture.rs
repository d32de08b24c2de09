use crate::scraper::{
    CategoryRouter, FileContext, Identity, MetadataRecord, Parser, Scanner, ScrapeResult,
    ScraperError, reconcile,
};
use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

/// Receives each verified record, in scan order
#[async_trait]
pub trait MetadataSink: Send {
    async fn accept(&mut self, file: &FileContext, result: &ScrapeResult)
    -> Result<(), CaptureError>;
}

/// Writes one JSON object per record and line
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[derive(Serialize)]
struct CapturedLine<'a> {
    file: &'a Path,
    identity: &'a Identity,
    file_name_base: String,
    tags: Vec<&'static str>,
    source: &'a str,
    record: &'a MetadataRecord,
}

#[async_trait]
impl<W: Write + Send> MetadataSink for JsonLinesSink<W> {
    async fn accept(
        &mut self,
        file: &FileContext,
        result: &ScrapeResult,
    ) -> Result<(), CaptureError> {
        let line = CapturedLine {
            file: &file.path,
            identity: &file.identity,
            file_name_base: file.identity.file_name_base(),
            tags: file.identity.tags(),
            source: result.source,
            record: &result.record,
        };

        serde_json::to_writer(&mut self.writer, &line)
            .map_err(|e| CaptureError::Sink(e.to_string()))?;
        writeln!(self.writer).map_err(|e| CaptureError::Sink(e.to_string()))?;
        self.writer
            .flush()
            .map_err(|e| CaptureError::Sink(e.to_string()))
    }
}

/// Counts for one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureSummary {
    pub total: usize,
    /// Files whose name could not be parsed
    pub skipped: usize,
    pub found: usize,
    pub not_found: usize,
    pub failed: usize,
}

/// Sequential batch: scan, extract, reconcile, then search and hand off
/// each file before starting the next
pub struct Capture {
    scanner: Scanner,
    parser: Parser,
    router: Arc<CategoryRouter>,
}

impl Capture {
    #[must_use]
    pub const fn new(scanner: Scanner, parser: Parser, router: Arc<CategoryRouter>) -> Self {
        Self {
            scanner,
            parser,
            router,
        }
    }

    /// Scan `dir` and extract identities. Returns the contexts and the
    /// number of files skipped for unparsable names.
    pub fn read_file_list(&self, dir: &Path) -> Result<(Vec<FileContext>, usize), CaptureError> {
        if !dir.is_dir() {
            return Err(CaptureError::NotADirectory(dir.to_path_buf()));
        }

        let paths = self.scanner.scan(dir);
        if paths.is_empty() {
            return Err(CaptureError::NoFiles(dir.to_path_buf()));
        }

        let mut skipped = 0;
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            match self.parser.parse_path(&path) {
                Ok(identity) => files.push(FileContext::new(path, identity)),
                Err(e) => {
                    error!(file = %path.display(), "parse file name failed: {}", e);
                    skipped += 1;
                }
            }
        }

        if files.is_empty() {
            return Err(CaptureError::NoFiles(dir.to_path_buf()));
        }
        Ok((files, skipped))
    }

    pub async fn run(
        &self,
        dir: &Path,
        sink: &mut dyn MetadataSink,
        cancel: &CancellationToken,
    ) -> Result<CaptureSummary, CaptureError> {
        let (mut files, skipped) = self.read_file_list(dir)?;
        reconcile(&mut files);
        display_file_list(&files);

        let mut summary = CaptureSummary {
            total: files.len() + skipped,
            skipped,
            ..Default::default()
        };

        for file in &files {
            let span = info_span!(
                "capture",
                trace_id = %Uuid::new_v4(),
                code = file.identity.code()
            );

            match self.process_one(file, sink, cancel).instrument(span).await {
                Ok(()) => summary.found += 1,
                Err(CaptureError::Scraper(ScraperError::Cancelled)) => {
                    warn!("capture cancelled");
                    return Err(CaptureError::Scraper(ScraperError::Cancelled));
                }
                Err(CaptureError::Scraper(e)) if e.is_not_found() => {
                    warn!(file = %file.path.display(), "no metadata found: {}", e);
                    summary.not_found += 1;
                }
                Err(e) => {
                    error!(file = %file.path.display(), "process file failed: {}", e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            total = summary.total,
            found = summary.found,
            not_found = summary.not_found,
            failed = summary.failed,
            skipped = summary.skipped,
            "capture finished"
        );
        Ok(summary)
    }

    async fn process_one(
        &self,
        file: &FileContext,
        sink: &mut dyn MetadataSink,
        cancel: &CancellationToken,
    ) -> Result<(), CaptureError> {
        let result = self.router.search(&file.identity, cancel).await?;
        if result.record.number != file.identity.code() {
            warn!(
                search = %result.record.number,
                file = file.identity.code(),
                "number mismatch, the source may have renamed it"
            );
        }

        sink.accept(file, &result).await?;
        debug!(source = result.source, "process file succeeded");
        Ok(())
    }
}

fn display_file_list(files: &[FileContext]) {
    info!(count = files.len(), "read local media files");
    for file in files {
        let identity = &file.identity;
        info!(
            file = file.file_name(),
            number = identity.code(),
            episode = identity.episode.as_deref().unwrap_or_default(),
            cnsub = identity.is_chinese_subtitle,
            uncensored = identity.is_uncensored,
            four_k = identity.is_4k,
            leaked = identity.is_leaked,
            cracked = identity.is_cracked,
            category = ?identity.category(),
            "file info"
        );
    }
}

/// Capture service errors
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error(transparent)]
    Scraper(#[from] ScraperError),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("No valid media files found in {}", .0.display())]
    NoFiles(PathBuf),

    #[error("Sink error: {0}")]
    Sink(String),
}
