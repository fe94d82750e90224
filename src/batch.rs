//! Batch orchestration.
//!
//! Runs one tool over every record of a store, strictly in store order and
//! one record at a time, then hands the artifacts to the packager.
//!
//! ## Progress
//!
//! Progress is aggregate: after the i-th of N records completes (produced
//! or skipped) the job reports `i / N × 100`. The values observed by a
//! listener are therefore exactly `0, 100/N, …, 100`, non-decreasing, and
//! an empty batch goes straight to 100.
//!
//! ## Failures
//!
//! A record whose transform fails is skipped: a [`BatchEvent::Skipped`] is
//! emitted and the batch moves on. Only packaging or delivery failure ends
//! a run in [`BatchStatus::Failed`].
//!
//! ## Events
//!
//! Callers may pass an `mpsc` sender; every state change is sent as a
//! [`BatchEvent`] for a printer thread to render (see
//! [`output::format_batch_event`](crate::output::format_batch_event)).

use crate::imaging::{
    ImageBackend, PlannedArtifact, TransformOptions, TransformedArtifact, plan, progress_percent,
    transform,
};
use crate::package::{Delivery, DownloadSink, Packager, PackagingError, deliver};
use crate::store::ImageRecord;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Packaging failed: {0}")]
    Packaging(#[from] PackagingError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchStatus {
    #[default]
    Idle,
    Running,
    Complete,
    Failed,
}

/// Observable state of the current (or last) batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchJob {
    progress_percent: f64,
    status: BatchStatus,
}

impl BatchJob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate progress, 0–100.
    pub fn progress_percent(&self) -> f64 {
        self.progress_percent
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == BatchStatus::Running
    }

    fn start(&mut self) {
        self.status = BatchStatus::Running;
        self.progress_percent = 0.0;
    }

    fn advance(&mut self, completed: usize, total: usize) -> f64 {
        self.progress_percent = progress_percent(completed, total);
        self.progress_percent
    }

    fn complete(&mut self) {
        self.status = BatchStatus::Complete;
        self.progress_percent = 100.0;
    }

    fn fail(&mut self) {
        self.status = BatchStatus::Failed;
    }
}

/// Progress events emitted during a batch run.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started {
        total: usize,
        /// Progress right after the job reset; always 0.
        percent: f64,
    },
    Transformed {
        /// 1-based position in the batch.
        index: usize,
        total: usize,
        source: String,
        filename: String,
        percent: f64,
    },
    Skipped {
        index: usize,
        total: usize,
        source: String,
        reason: String,
        percent: f64,
    },
    Finished {
        produced: usize,
        skipped: usize,
    },
}

/// Result of [`run_and_deliver`].
#[derive(Debug)]
pub struct BatchOutcome {
    pub produced: usize,
    pub skipped: usize,
    pub delivery: Delivery,
    /// Where the sink put the delivery; `None` when nothing was delivered.
    pub saved_to: Option<PathBuf>,
}

fn emit(events: Option<&Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = events {
        tx.send(event).ok();
    }
}

/// Transform every record in order. Leaves the job `Running`.
fn transform_all(
    backend: &impl ImageBackend,
    records: &[ImageRecord],
    options: &TransformOptions,
    job: &mut BatchJob,
    events: Option<&Sender<BatchEvent>>,
) -> (Vec<TransformedArtifact>, usize) {
    let total = records.len();
    job.start();
    emit(
        events,
        BatchEvent::Started {
            total,
            percent: job.progress_percent(),
        },
    );

    let mut artifacts = Vec::with_capacity(total);
    let mut skipped = 0;

    for (i, record) in records.iter().enumerate() {
        let index = i + 1;
        let result = transform(backend, record, options);
        let percent = job.advance(index, total);
        let source = record.display_name().to_string();

        let event = match result {
            Ok(artifact) => {
                let filename = artifact.filename.clone();
                artifacts.push(artifact);
                BatchEvent::Transformed {
                    index,
                    total,
                    source,
                    filename,
                    percent,
                }
            }
            Err(e) => {
                skipped += 1;
                BatchEvent::Skipped {
                    index,
                    total,
                    source,
                    reason: e.source.to_string(),
                    percent,
                }
            }
        };
        emit(events, event);
    }

    emit(
        events,
        BatchEvent::Finished {
            produced: artifacts.len(),
            skipped,
        },
    );
    (artifacts, skipped)
}

/// Transform every record in order and return the artifacts produced.
///
/// Failed records are skipped. The job ends `Complete` at 100%. `events`
/// is borrowed, so the caller's channel stays open after the run.
pub fn run(
    backend: &impl ImageBackend,
    records: &[ImageRecord],
    options: &TransformOptions,
    job: &mut BatchJob,
    events: Option<&Sender<BatchEvent>>,
) -> Vec<TransformedArtifact> {
    let (artifacts, _) = transform_all(backend, records, options, job, events);
    job.complete();
    artifacts
}

/// Run the batch, package the artifacts and hand them to `sink`.
///
/// Packaging or delivery failure leaves the job `Failed` and is returned.
/// `events` is taken by value and dropped on return, which closes the
/// channel and ends a printer thread draining it.
pub fn run_and_deliver(
    backend: &impl ImageBackend,
    records: &[ImageRecord],
    options: &TransformOptions,
    packager: &Packager,
    sink: &impl DownloadSink,
    job: &mut BatchJob,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchOutcome, BatchError> {
    let (artifacts, skipped) = transform_all(backend, records, options, job, events.as_ref());
    let produced = artifacts.len();

    let delivered = packager
        .package(artifacts)
        .and_then(|delivery| deliver(&delivery, sink).map(|saved| (delivery, saved)));

    match delivered {
        Ok((delivery, saved_to)) => {
            job.complete();
            Ok(BatchOutcome {
                produced,
                skipped,
                delivery,
                saved_to,
            })
        }
        Err(e) => {
            job.fail();
            Err(e.into())
        }
    }
}

/// Plan every record without encoding anything.
pub fn plan_batch(records: &[ImageRecord], options: &TransformOptions) -> Vec<PlannedArtifact> {
    records.iter().map(|record| plan(record, options)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{CompressOptions, ConvertOptions, OutputFormat, ResizeOptions};
    use crate::package::tests::RecordingSink;
    use crate::store::ImageStore;
    use crate::test_helpers::{MockBackend, mock_store};
    use std::sync::mpsc;

    /// Store of records named `img0.png`, `img1.png`, … with the given sizes.
    fn store_of(backend: &MockBackend, sizes: &[(u32, u32)]) -> ImageStore {
        let names: Vec<String> = (0..sizes.len()).map(|i| format!("img{i}.png")).collect();
        let files: Vec<(&str, u32, u32)> = names
            .iter()
            .zip(sizes)
            .map(|(name, &(w, h))| (name.as_str(), w, h))
            .collect();
        mock_store(backend, &files)
    }

    fn compress() -> TransformOptions {
        TransformOptions::Compress(CompressOptions::default())
    }

    fn collect_events(rx: mpsc::Receiver<BatchEvent>) -> Vec<BatchEvent> {
        rx.try_iter().collect()
    }

    fn percents(events: &[BatchEvent]) -> Vec<f64> {
        events
            .iter()
            .filter_map(|e| match e {
                BatchEvent::Started { percent, .. }
                | BatchEvent::Transformed { percent, .. }
                | BatchEvent::Skipped { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect()
    }

    struct FailingSink;

    impl DownloadSink for FailingSink {
        fn save(&self, _filename: &str, _bytes: &[u8]) -> std::io::Result<PathBuf> {
            Err(std::io::Error::other("disk full"))
        }
    }

    #[test]
    fn new_job_is_idle() {
        let job = BatchJob::new();
        assert_eq!(job.status(), BatchStatus::Idle);
        assert_eq!(job.progress_percent(), 0.0);
    }

    #[test]
    fn run_processes_in_store_order() {
        let backend = MockBackend::new();
        let store = store_of(&backend, &[(10, 10), (20, 20), (30, 30)]);
        let mut job = BatchJob::new();

        let artifacts = run(&backend, store.records(), &compress(), &mut job, None);

        let names: Vec<&str> = artifacts.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(
            names,
            vec!["img0_compressed.jpg", "img1_compressed.jpg", "img2_compressed.jpg"]
        );
        assert_eq!(job.status(), BatchStatus::Complete);
        assert_eq!(job.progress_percent(), 100.0);
    }

    #[test]
    fn progress_steps_are_exact() {
        let backend = MockBackend::new();
        let store = store_of(&backend, &[(10, 10), (20, 20), (30, 30), (40, 40)]);
        let (tx, rx) = mpsc::channel();

        run(&backend, store.records(), &compress(), &mut BatchJob::new(), Some(&tx));

        let events = collect_events(rx);
        assert_eq!(
            events[0],
            BatchEvent::Started {
                total: 4,
                percent: 0.0
            }
        );
        assert_eq!(percents(&events), vec![0.0, 25.0, 50.0, 75.0, 100.0]);
    }

    #[test]
    fn progress_for_three_records() {
        let backend = MockBackend::new();
        let store = store_of(&backend, &[(10, 10), (20, 20), (30, 30)]);
        let (tx, rx) = mpsc::channel();

        run(&backend, store.records(), &compress(), &mut BatchJob::new(), Some(&tx));

        let steps = percents(&collect_events(rx));
        let expected: Vec<f64> = (0..=3).map(|i| i as f64 / 3.0 * 100.0).collect();
        assert_eq!(steps, expected);
        assert!(steps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn rerun_restarts_progress_from_zero() {
        let backend = MockBackend::new();
        let store = store_of(&backend, &[(10, 10), (20, 20)]);
        let mut job = BatchJob::new();
        run(&backend, store.records(), &compress(), &mut job, None);
        assert_eq!(job.progress_percent(), 100.0);

        let (tx, rx) = mpsc::channel();
        run(&backend, store.records(), &compress(), &mut job, Some(&tx));

        assert_eq!(percents(&collect_events(rx)), vec![0.0, 50.0, 100.0]);
        assert_eq!(job.progress_percent(), 100.0);
    }

    #[test]
    fn failed_record_is_skipped_and_batch_continues() {
        let backend = MockBackend::failing_for_width(20);
        let store = store_of(&backend, &[(10, 10), (20, 20), (30, 30)]);
        let (tx, rx) = mpsc::channel();
        let mut job = BatchJob::new();

        let artifacts = run(&backend, store.records(), &compress(), &mut job, Some(&tx));

        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].filename, "img0_compressed.jpg");
        assert_eq!(artifacts[1].filename, "img2_compressed.jpg");
        assert_eq!(job.status(), BatchStatus::Complete);

        let events = collect_events(rx);
        assert!(matches!(
            &events[2],
            BatchEvent::Skipped { index: 2, total: 3, source, .. } if source == "img1.png"
        ));
        // skipped records still advance progress
        assert_eq!(percents(&events).len(), 4);
        assert_eq!(
            events.last(),
            Some(&BatchEvent::Finished {
                produced: 2,
                skipped: 1
            })
        );
    }

    #[test]
    fn all_records_failing_yields_no_artifacts() {
        let backend = MockBackend::failing_for_width(10);
        let store = store_of(&backend, &[(10, 10), (10, 5)]);
        let mut job = BatchJob::new();

        let artifacts = run(&backend, store.records(), &compress(), &mut job, None);

        assert!(artifacts.is_empty());
        assert_eq!(job.status(), BatchStatus::Complete);
    }

    #[test]
    fn empty_batch_completes_at_100() {
        let backend = MockBackend::new();
        let (tx, rx) = mpsc::channel();
        let mut job = BatchJob::new();

        let artifacts = run(&backend, &[], &compress(), &mut job, Some(&tx));

        assert!(artifacts.is_empty());
        assert_eq!(job.progress_percent(), 100.0);
        assert_eq!(job.status(), BatchStatus::Complete);
        assert_eq!(
            collect_events(rx),
            vec![
                BatchEvent::Started {
                    total: 0,
                    percent: 0.0
                },
                BatchEvent::Finished {
                    produced: 0,
                    skipped: 0
                }
            ]
        );
    }

    #[test]
    fn job_can_run_again_after_completion() {
        let backend = MockBackend::new();
        let store = store_of(&backend, &[(10, 10)]);
        let mut job = BatchJob::new();

        run(&backend, store.records(), &compress(), &mut job, None);
        let second = run(&backend, store.records(), &compress(), &mut job, None);

        assert_eq!(second.len(), 1);
        assert_eq!(job.status(), BatchStatus::Complete);
    }

    #[test]
    fn deliver_single_artifact_directly() {
        let backend = MockBackend::new();
        let store = store_of(&backend, &[(800, 600)]);
        let options = TransformOptions::Resize(ResizeOptions {
            width: 400,
            ..Default::default()
        });
        let sink = RecordingSink::default();
        let mut job = BatchJob::new();

        let outcome = run_and_deliver(
            &backend,
            store.records(),
            &options,
            &Packager::default(),
            &sink,
            &mut job,
            None,
        )
        .unwrap();

        assert_eq!(outcome.produced, 1);
        assert!(matches!(outcome.delivery, Delivery::Single(_)));
        assert_eq!(sink.filenames(), vec!["img0_resized.jpg"]);
        assert_eq!(job.status(), BatchStatus::Complete);
    }

    #[test]
    fn deliver_many_artifacts_as_one_archive() {
        let backend = MockBackend::new();
        let store = store_of(&backend, &[(10, 10), (20, 20), (30, 30)]);
        let options = TransformOptions::Convert(ConvertOptions {
            format: OutputFormat::Webp,
            ..Default::default()
        });
        let sink = RecordingSink::default();

        let outcome = run_and_deliver(
            &backend,
            store.records(),
            &options,
            &Packager::default(),
            &sink,
            &mut BatchJob::new(),
            None,
        )
        .unwrap();

        let Delivery::Archive { entries, .. } = &outcome.delivery else {
            panic!("expected archive");
        };
        assert_eq!(entries, &vec!["img0.webp", "img1.webp", "img2.webp"]);
        assert_eq!(sink.filenames(), vec!["toolkitsol.com_images.zip"]);
    }

    #[test]
    fn deliver_nothing_when_every_record_fails() {
        let backend = MockBackend::failing_for_width(10);
        let store = store_of(&backend, &[(10, 10)]);
        let sink = RecordingSink::default();
        let mut job = BatchJob::new();

        let outcome = run_and_deliver(
            &backend,
            store.records(),
            &compress(),
            &Packager::default(),
            &sink,
            &mut job,
            None,
        )
        .unwrap();

        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.delivery, Delivery::Nothing);
        assert!(sink.filenames().is_empty());
        assert_eq!(job.status(), BatchStatus::Complete);
    }

    #[test]
    fn delivery_failure_marks_job_failed() {
        let backend = MockBackend::new();
        let store = store_of(&backend, &[(10, 10), (20, 20)]);
        let mut job = BatchJob::new();

        let result = run_and_deliver(
            &backend,
            store.records(),
            &compress(),
            &Packager::default(),
            &FailingSink,
            &mut job,
            None,
        );

        assert!(matches!(result, Err(BatchError::Packaging(PackagingError::Io(_)))));
        assert_eq!(job.status(), BatchStatus::Failed);
        assert!(!job.is_running());
    }

    #[test]
    fn plan_batch_matches_record_order() {
        let backend = MockBackend::new();
        let store = store_of(&backend, &[(800, 600), (600, 800)]);
        let options = TransformOptions::Resize(ResizeOptions {
            width: 300,
            ..Default::default()
        });

        let planned = plan_batch(store.records(), &options);

        let dims: Vec<(u32, u32)> = planned.iter().map(|p| (p.width, p.height)).collect();
        assert_eq!(dims, vec![(300, 225), (300, 400)]);
    }
}
