//! The upload/process/download state machine.
//!
//! Phases: `Idle → FilesSelected → Processing → {ResultAvailable |
//! FilesSelected}`. Failures surface as transient notices and always leave
//! the controller in a resumable phase; nothing here panics the flow.

use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::error;

use crate::services::upstream::DEFAULT_MERGE_TYPE;
use crate::uploader::batch::{SelectedFile, UploadBatch};
use crate::uploader::progress::{SimulatedProgress, TICK_INTERVAL};
use crate::uploader::save::FileSink;
use crate::uploader::transport::{GatewayTransport, TransportError};

const PROCESS_RETRY: &str = "Failed to process files. Please try again.";
const DOWNLOAD_RETRY: &str = "Failed to download file. Please try again.";

const DEFAULT_RESULT_BASE: &str = "processed_crime_stats";
const DEFAULT_RESULT_EXT: &str = "xlsx";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    FilesSelected,
    Processing,
    ResultAvailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A transient notification, the equivalent of the dashboard's toasts.
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    fn success(message: impl Into<String>) -> Self {
        Self::titled(NoticeKind::Success, "Success", message)
    }

    fn error(message: impl Into<String>) -> Self {
        Self::titled(NoticeKind::Error, "Error", message)
    }

    fn titled(kind: NoticeKind, title: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

pub struct Workflow<T, S> {
    transport: T,
    sink: S,
    batch: UploadBatch,
    phase: Phase,
    result: Option<String>,
    progress: Option<SimulatedProgress>,
    tick_period: Duration,
}

impl<T: GatewayTransport, S: FileSink> Workflow<T, S> {
    pub fn new(transport: T, sink: S) -> Self {
        Self {
            transport,
            sink,
            batch: UploadBatch::new(),
            phase: Phase::Idle,
            result: None,
            progress: None,
            tick_period: TICK_INTERVAL,
        }
    }

    /// Shorten the simulated-progress tick (tests).
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn batch(&self) -> &UploadBatch {
        &self.batch
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// Simulated progress of the current/last processing run.
    pub fn progress(&self) -> u8 {
        self.progress.as_ref().map(|p| p.percent()).unwrap_or(0)
    }

    /// Feed selected/dropped files through the extension filter into the
    /// batch; returns how many were accepted.
    pub fn add_files(&mut self, candidates: Vec<SelectedFile>) -> usize {
        let accepted = self.batch.add_files(candidates);
        if self.phase == Phase::Idle && !self.batch.is_empty() {
            self.phase = Phase::FilesSelected;
        }
        accepted
    }

    pub fn remove_file(&mut self, name: &str) -> bool {
        let removed = self.batch.remove(name);
        if self.phase == Phase::FilesSelected && self.batch.is_empty() {
            self.phase = Phase::Idle;
        }
        removed
    }

    pub fn clear_all(&mut self) -> Notice {
        self.batch.clear();
        self.result = None;
        self.progress = None;
        self.phase = Phase::Idle;
        Notice::titled(
            NoticeKind::Success,
            "Files Cleared",
            "All files have been removed from the queue.",
        )
    }

    /// Submit the batch. The cosmetic progress ticker runs for the duration
    /// of the call and is forced to 100 the moment it settles.
    pub async fn process_files(&mut self) -> Notice {
        if self.phase == Phase::Processing {
            return Notice::error("Processing is already in progress.");
        }
        if self.batch.is_empty() {
            return Notice::error("No files selected.");
        }

        self.phase = Phase::Processing;
        self.progress = Some(SimulatedProgress::start(self.tick_period));

        let outcome = self
            .transport
            .process(self.batch.files(), DEFAULT_MERGE_TYPE)
            .await;

        if let Some(progress) = &self.progress {
            progress.finish();
        }

        match outcome {
            Ok(path) => {
                self.result = Some(path);
                self.phase = Phase::ResultAvailable;
                Notice::success(
                    "Files processed successfully! Click 'Download Result' to get your file.",
                )
            }
            Err(e) => {
                self.phase = Phase::FilesSelected;
                let message = match e {
                    TransportError::Api { detail, .. } => detail,
                    TransportError::Network(reason) => {
                        error!(%reason, "process request never completed");
                        PROCESS_RETRY.to_string()
                    }
                };
                Notice::error(message)
            }
        }
    }

    /// Fetch the stored result and hand it to the sink under a timestamped
    /// name. The stored path is single-use; a fresh run produces a new one.
    pub async fn download_result(&mut self) -> Notice {
        let Some(path) = self.result.clone() else {
            return Notice::error("No processed file is available yet.");
        };

        let file = match self.transport.fetch(&path).await {
            Ok(file) => file,
            Err(e) => {
                error!(error = %e, "result download failed");
                return Notice::error(DOWNLOAD_RETRY);
            }
        };

        let filename = timestamped_filename(file.content_disposition.as_deref(), Local::now());
        match self.sink.save(&filename, &file.bytes).await {
            Ok(()) => {
                self.result = None;
                self.phase = if self.batch.is_empty() {
                    Phase::Idle
                } else {
                    Phase::FilesSelected
                };
                Notice::success("File downloaded successfully!")
            }
            Err(e) => {
                error!(error = %e, "could not save the downloaded result");
                Notice::error(DOWNLOAD_RETRY)
            }
        }
    }

    #[cfg(test)]
    fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }
}

/// `<base>_<YYYYMMDD-HHMMSS>.<ext>`, base and extension taken from the
/// upstream content-disposition filename when one is present.
fn timestamped_filename(content_disposition: Option<&str>, now: DateTime<Local>) -> String {
    let (base, ext) = content_disposition
        .and_then(disposition_filename)
        .map(|name| split_name(&name))
        .unwrap_or_else(|| {
            (
                DEFAULT_RESULT_BASE.to_string(),
                DEFAULT_RESULT_EXT.to_string(),
            )
        });
    format!("{}_{}.{}", base, now.format("%Y%m%d-%H%M%S"), ext)
}

fn split_name(name: &str) -> (String, String) {
    match name.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() && !ext.is_empty() => {
            (base.to_string(), ext.to_string())
        }
        _ => (name.to_string(), DEFAULT_RESULT_EXT.to_string()),
    }
}

/// Pull the filename out of a `content-disposition` value; quotes optional.
fn disposition_filename(value: &str) -> Option<String> {
    let rest = &value[value.find("filename=")? + "filename=".len()..];
    let rest = rest.trim_start().trim_start_matches('"');
    let end = rest.find(['"', ';']).unwrap_or(rest.len());
    let name = rest[..end].trim();
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uploader::save::SinkError;
    use crate::uploader::transport::FetchedFile;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct ScriptedTransport {
        process_result: Arc<Mutex<Option<Result<String, TransportError>>>>,
        fetch_result: Arc<Mutex<Option<Result<FetchedFile, TransportError>>>>,
        process_calls: Arc<Mutex<usize>>,
        fetch_calls: Arc<Mutex<usize>>,
    }

    impl ScriptedTransport {
        fn with_process(self, result: Result<String, TransportError>) -> Self {
            *self.process_result.lock().unwrap() = Some(result);
            self
        }

        fn with_fetch(self, result: Result<FetchedFile, TransportError>) -> Self {
            *self.fetch_result.lock().unwrap() = Some(result);
            self
        }

        fn process_calls(&self) -> usize {
            *self.process_calls.lock().unwrap()
        }

        fn fetch_calls(&self) -> usize {
            *self.fetch_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl GatewayTransport for ScriptedTransport {
        async fn process(
            &self,
            _files: &[SelectedFile],
            _merge_type: &str,
        ) -> Result<String, TransportError> {
            *self.process_calls.lock().unwrap() += 1;
            self.process_result
                .lock()
                .unwrap()
                .take()
                .expect("unexpected process call")
        }

        async fn fetch(&self, _path: &str) -> Result<FetchedFile, TransportError> {
            *self.fetch_calls.lock().unwrap() += 1;
            self.fetch_result
                .lock()
                .unwrap()
                .take()
                .expect("unexpected fetch call")
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        saved: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    }

    impl RecordingSink {
        fn saved(&self) -> Vec<(String, Vec<u8>)> {
            self.saved.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FileSink for RecordingSink {
        async fn save(&self, filename: &str, bytes: &[u8]) -> Result<(), SinkError> {
            self.saved
                .lock()
                .unwrap()
                .push((filename.to_string(), bytes.to_vec()));
            Ok(())
        }
    }

    fn xlsx(name: &str) -> SelectedFile {
        SelectedFile {
            name: name.to_string(),
            bytes: b"spreadsheet".to_vec(),
        }
    }

    fn workflow(
        transport: ScriptedTransport,
        sink: RecordingSink,
    ) -> Workflow<ScriptedTransport, RecordingSink> {
        Workflow::new(transport, sink).with_tick_period(Duration::from_millis(5))
    }

    fn assert_timestamped(name: &str, base: &str, ext: &str) {
        let rest = name
            .strip_prefix(&format!("{base}_"))
            .unwrap_or_else(|| panic!("bad base in {name}"));
        let rest = rest
            .strip_suffix(&format!(".{ext}"))
            .unwrap_or_else(|| panic!("bad extension in {name}"));
        let (date, time) = rest.split_once('-').unwrap_or_else(|| panic!("bad stamp in {name}"));
        assert_eq!(date.len(), 8, "date part of {name}");
        assert!(date.chars().all(|c| c.is_ascii_digit()), "date part of {name}");
        assert_eq!(time.len(), 6, "time part of {name}");
        assert!(time.chars().all(|c| c.is_ascii_digit()), "time part of {name}");
    }

    #[tokio::test]
    async fn full_workflow_saves_exactly_one_timestamped_file() {
        let transport = ScriptedTransport::default()
            .with_process(Ok("/f/1".to_string()))
            .with_fetch(Ok(FetchedFile {
                bytes: b"RESULT".to_vec(),
                content_disposition: None,
            }));
        let sink = RecordingSink::default();
        let mut workflow = workflow(transport.clone(), sink.clone());

        workflow.add_files(vec![xlsx("crimes.xlsx")]);
        assert_eq!(workflow.phase(), Phase::FilesSelected);

        let notice = workflow.process_files().await;
        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(workflow.phase(), Phase::ResultAvailable);
        assert_eq!(workflow.result(), Some("/f/1"));
        assert_eq!(workflow.progress(), 100);

        let notice = workflow.download_result().await;
        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(transport.fetch_calls(), 1);

        let saved = sink.saved();
        assert_eq!(saved.len(), 1, "exactly one save expected");
        let (name, bytes) = &saved[0];
        assert_eq!(bytes, b"RESULT");
        assert_timestamped(name, "processed_crime_stats", "xlsx");
    }

    #[tokio::test]
    async fn upstream_rejection_surfaces_detail_and_returns_to_files_selected() {
        let transport = ScriptedTransport::default().with_process(Err(TransportError::Api {
            status: StatusCode::BAD_REQUEST,
            detail: "bad file".to_string(),
        }));
        let mut workflow = workflow(transport, RecordingSink::default());
        workflow.add_files(vec![xlsx("crimes.xlsx")]);

        let notice = workflow.process_files().await;
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.message, "bad file");
        assert_eq!(workflow.phase(), Phase::FilesSelected);
        assert_eq!(workflow.result(), None);
        assert_eq!(workflow.progress(), 100);
    }

    #[tokio::test]
    async fn network_failure_uses_the_generic_retry_message() {
        let transport = ScriptedTransport::default()
            .with_process(Err(TransportError::Network("connection refused".to_string())));
        let mut workflow = workflow(transport, RecordingSink::default());
        workflow.add_files(vec![xlsx("crimes.xlsx")]);

        let notice = workflow.process_files().await;
        assert_eq!(notice.message, "Failed to process files. Please try again.");
        assert_eq!(workflow.phase(), Phase::FilesSelected);
    }

    #[tokio::test]
    async fn processing_guard_refuses_a_second_run() {
        let transport = ScriptedTransport::default();
        let mut workflow = workflow(transport.clone(), RecordingSink::default());
        workflow.add_files(vec![xlsx("crimes.xlsx")]);
        workflow.set_phase(Phase::Processing);

        let notice = workflow.process_files().await;
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(transport.process_calls(), 0);
    }

    #[tokio::test]
    async fn empty_batch_is_refused() {
        let transport = ScriptedTransport::default();
        let mut workflow = workflow(transport.clone(), RecordingSink::default());

        let notice = workflow.process_files().await;
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(transport.process_calls(), 0);
        assert_eq!(workflow.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn download_without_a_result_does_not_touch_the_transport() {
        let transport = ScriptedTransport::default();
        let mut workflow = workflow(transport.clone(), RecordingSink::default());

        let notice = workflow.download_result().await;
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(transport.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn download_uses_the_disposition_filename_when_present() {
        let transport = ScriptedTransport::default()
            .with_process(Ok("/f/2".to_string()))
            .with_fetch(Ok(FetchedFile {
                bytes: b"CSV".to_vec(),
                content_disposition: Some(
                    "attachment; filename=\"merged_crime_stats.csv\"".to_string(),
                ),
            }));
        let sink = RecordingSink::default();
        let mut workflow = workflow(transport, sink.clone());
        workflow.add_files(vec![xlsx("crimes.xlsx")]);
        workflow.process_files().await;

        workflow.download_result().await;
        let saved = sink.saved();
        assert_timestamped(&saved[0].0, "merged_crime_stats", "csv");
    }

    #[tokio::test]
    async fn successful_download_discards_the_stored_result() {
        let transport = ScriptedTransport::default()
            .with_process(Ok("/f/3".to_string()))
            .with_fetch(Ok(FetchedFile {
                bytes: b"X".to_vec(),
                content_disposition: None,
            }));
        let mut workflow = workflow(transport, RecordingSink::default());
        workflow.add_files(vec![xlsx("crimes.xlsx")]);
        workflow.process_files().await;

        workflow.download_result().await;
        assert_eq!(workflow.result(), None);
        assert_eq!(workflow.phase(), Phase::FilesSelected);
    }

    #[tokio::test]
    async fn clear_all_returns_to_idle() {
        let transport = ScriptedTransport::default().with_process(Ok("/f/4".to_string()));
        let mut workflow = workflow(transport, RecordingSink::default());
        workflow.add_files(vec![xlsx("crimes.xlsx")]);
        workflow.process_files().await;

        let notice = workflow.clear_all();
        assert_eq!(notice.title, "Files Cleared");
        assert_eq!(workflow.phase(), Phase::Idle);
        assert!(workflow.batch().is_empty());
        assert_eq!(workflow.result(), None);
    }

    #[test]
    fn timestamp_format_matches_the_local_clock() {
        let now = Local.with_ymd_and_hms(2025, 3, 9, 14, 5, 9).unwrap();
        assert_eq!(
            timestamped_filename(None, now),
            "processed_crime_stats_20250309-140509.xlsx"
        );
    }

    #[test]
    fn disposition_filename_handles_quotes_and_parameters() {
        assert_eq!(
            disposition_filename("attachment; filename=\"a.xlsx\""),
            Some("a.xlsx".to_string())
        );
        assert_eq!(
            disposition_filename("attachment; filename=b.xlsx; size=12"),
            Some("b.xlsx".to_string())
        );
        assert_eq!(disposition_filename("inline"), None);
    }

    #[test]
    fn names_without_extension_default_to_xlsx() {
        let now = Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            timestamped_filename(Some("attachment; filename=results"), now),
            "results_20250102-030405.xlsx"
        );
    }
}
