//! Watches a set of files, parses and scores newly appended lines, and
//! dispatches the results to a bounded queue and to registered listeners.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use duskwatch_store::LogStore;
use duskwatch_types::{LogRecord, Severity, SeverityBand, StreamEvent};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::error::TailerResult;
use crate::parsing::{self, parse_line};
use crate::scoring::quick_score;
use crate::tailer::FileTailer;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_QUEUE_CAPACITY: usize = 1_000;
const PERSIST_THRESHOLD: f64 = 0.55;

pub type Listener = Arc<dyn Fn(&StreamEvent) + Send + Sync>;

/// Multi-file real-time log watcher.
///
/// One long-lived cooperative poll loop drives every attached file;
/// base-detector concurrency belongs to the batch path, not here.
pub struct RealtimeMonitor<S: LogStore + Send + Sync + 'static> {
    store: Arc<S>,
    tailers: Arc<Mutex<HashMap<PathBuf, FileTailer>>>,
    listeners: Arc<Mutex<Vec<Listener>>>,
    sender: mpsc::Sender<StreamEvent>,
    receiver: Mutex<Option<mpsc::Receiver<StreamEvent>>>,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<S: LogStore + Send + Sync + 'static> RealtimeMonitor<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, DEFAULT_POLL_INTERVAL, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_config(store: Arc<S>, poll_interval: Duration, queue_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity);
        Self {
            store,
            tailers: Arc::new(Mutex::new(HashMap::new())),
            listeners: Arc::new(Mutex::new(Vec::new())),
            sender,
            receiver: Mutex::new(Some(receiver)),
            poll_interval,
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Attach a file, seeking to its current end. Re-adding an already
    /// watched path is a no-op.
    pub async fn add_file(&self, path: impl AsRef<Path>) -> TailerResult<()> {
        let path = path.as_ref().to_path_buf();
        let mut tailers = self.tailers.lock().await;
        if tailers.contains_key(&path) {
            return Ok(());
        }
        let tailer = FileTailer::attach(&path)?;
        tailers.insert(path.clone(), tailer);
        drop(tailers);
        self.emit_system(&path, "file_added").await;
        tracing::info!(path = %path.display(), "now watching");
        Ok(())
    }

    pub async fn remove_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let removed = self.tailers.lock().await.remove(&path).is_some();
        if removed {
            self.emit_system(&path, "file_lost").await;
            tracing::info!(path = %path.display(), "stopped watching");
        }
    }

    pub async fn watched_files(&self) -> Vec<PathBuf> {
        self.tailers.lock().await.keys().cloned().collect()
    }

    pub async fn on_event(&self, listener: Listener) {
        self.listeners.lock().await.push(listener);
    }

    /// Take ownership of the event receiver. Can only be called once;
    /// later calls return `None`.
    pub async fn take_receiver(&self) -> Option<mpsc::Receiver<StreamEvent>> {
        self.receiver.lock().await.take()
    }

    /// Idempotent: a second call while already running is a no-op.
    pub async fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = self.clone();
        let handle = tokio::spawn(async move { this.poll_loop().await });
        *self.handle.lock().await = Some(handle);
        tracing::info!("real-time monitor started");
    }

    /// Stops the poll loop and releases its task handle. Attached files
    /// stay attached, so a subsequent `start()` resumes from where it
    /// left off.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.lock().await.take() {
            let _ = handle.await;
        }
        tracing::info!("real-time monitor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn poll_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        while self.running.load(Ordering::SeqCst) {
            ticker.tick().await;
            let paths: Vec<PathBuf> = self.tailers.lock().await.keys().cloned().collect();
            for path in paths {
                let lines = {
                    let mut tailers = self.tailers.lock().await;
                    match tailers.get_mut(&path) {
                        Some(tailer) => tailer.poll().unwrap_or_else(|err| {
                            tracing::warn!(path = %path.display(), error = %err, "poll failed");
                            Vec::new()
                        }),
                        None => continue,
                    }
                };
                for line in lines {
                    self.process_line(&path, line).await;
                }
            }
        }
    }

    async fn process_line(&self, path: &Path, raw_line: String) {
        let fields = parse_line(&raw_line);
        let now = Utc::now();
        let message = parsing::message_of(&fields, &raw_line);
        let source = fields.get("tag").or_else(|| fields.get("appname")).map(String::as_str);
        let score = quick_score(message, source, now);
        let severity = SeverityBand::from_score(score);

        let event = StreamEvent {
            file: path.display().to_string(),
            raw_line: raw_line.clone(),
            parsed_fields: fields.clone(),
            score,
            severity,
            received_at: now,
        };

        if score >= PERSIST_THRESHOLD {
            let record = synthetic_record(path, &raw_line, &fields, score, severity);
            if let Err(err) = self.store.append(record).await {
                tracing::error!(error = %err, "failed to persist tailed entry");
            }
        }

        for listener in self.listeners.lock().await.iter() {
            listener(&event);
        }

        if self.sender.try_send(event).is_err() {
            tracing::debug!("stream event queue full, dropping oldest listener hand-off");
        }
    }

    async fn emit_system(&self, path: &Path, kind: &str) {
        let event = StreamEvent {
            file: path.display().to_string(),
            raw_line: String::new(),
            parsed_fields: [("event".to_string(), kind.to_string())].into_iter().collect(),
            score: 0.0,
            severity: SeverityBand::Low,
            received_at: Utc::now(),
        };
        for listener in self.listeners.lock().await.iter() {
            listener(&event);
        }
    }
}

fn synthetic_record(
    path: &Path,
    raw_line: &str,
    fields: &std::collections::BTreeMap<String, String>,
    score: f64,
    severity: SeverityBand,
) -> LogRecord {
    let source = fields
        .get("tag")
        .or_else(|| fields.get("appname"))
        .cloned()
        .unwrap_or_else(|| path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default());
    let message = fields.get("message").cloned().unwrap_or_else(|| raw_line.to_string());

    let mut record = LogRecord::new(Utc::now(), source, message).with_severity(severity_to_severity(severity));
    record.raw = raw_line.to_string();
    record.hostname = fields.get("hostname").cloned();
    record.process_id = fields.get("pid").and_then(|pid| pid.parse().ok());
    record.metadata.insert("tailer_score".to_string(), format!("{score:.4}"));
    record
}

fn severity_to_severity(band: SeverityBand) -> Severity {
    match band {
        SeverityBand::Critical => Severity::Critical,
        SeverityBand::High => Severity::High,
        SeverityBand::Medium => Severity::Medium,
        SeverityBand::Low => Severity::Low,
    }
}
