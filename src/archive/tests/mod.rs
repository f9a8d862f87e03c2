use super::*;
use crate::config::{ArchiveConfig, Config, NameCollisionAction, OutputConfig};
use crate::error::Error;
use crate::renamer::render_with_date;
use crate::types::{MemoryFile, NumberingOptions, ProgressEvent, RenamedEntry, SourceFile};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Sink that keeps every delivery in memory
#[derive(Default)]
struct CollectingSink {
    delivered: Mutex<Vec<(String, Vec<u8>)>>,
    cancel_after_first: Option<CancellationToken>,
    fail: bool,
}

impl CollectingSink {
    fn names(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn data(&self, index: usize) -> Vec<u8> {
        self.delivered.lock().unwrap()[index].1.clone()
    }
}

#[async_trait]
impl ArchiveSink for CollectingSink {
    async fn deliver(&self, file_name: &str, data: Vec<u8>) -> std::io::Result<Option<PathBuf>> {
        if self.fail {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only destination",
            ));
        }
        self.delivered
            .lock()
            .unwrap()
            .push((file_name.to_string(), data));
        if let Some(token) = &self.cancel_after_first {
            token.cancel();
        }
        Ok(None)
    }
}

/// Source whose content disappeared after selection
struct VanishedFile {
    name: String,
}

#[async_trait]
impl SourceFile for VanishedFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        10
    }

    async fn read(&self) -> std::io::Result<Vec<u8>> {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file was moved",
        ))
    }
}

/// Source that counts its reads and may cancel a token when read
struct TrackedFile {
    name: String,
    data: Vec<u8>,
    reads: Arc<AtomicUsize>,
    cancel_on_read: Option<CancellationToken>,
}

impl TrackedFile {
    fn new(name: &str, data: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            data: data.to_vec(),
            reads: Arc::new(AtomicUsize::new(0)),
            cancel_on_read: None,
        }
    }
}

#[async_trait]
impl SourceFile for TrackedFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read(&self) -> std::io::Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = &self.cancel_on_read {
            token.cancel();
        }
        Ok(self.data.clone())
    }
}

fn fast_config() -> Config {
    Config {
        archive: ArchiveConfig {
            inter_batch_delay: Duration::ZERO,
            ..Default::default()
        },
        output: OutputConfig {
            individual_delay: Duration::ZERO,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Config that splits anything above 10 bytes into parts of at most 10 bytes
fn split_config() -> Config {
    let mut config = fast_config();
    config.archive.single_archive_threshold = 10;
    config.archive.max_batch_bytes = 10;
    config
}

fn entries_for(names: &[&str]) -> Vec<RenamedEntry> {
    names
        .iter()
        .map(|n| RenamedEntry {
            original: n.to_string(),
            renamed: n.to_string(),
        })
        .collect()
}

fn zip_entries(bytes: Vec<u8>) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut data = Vec::new();
            file.read_to_end(&mut data).unwrap();
            (file.name().to_string(), data)
        })
        .collect()
}

fn assert_non_decreasing(events: &[ProgressEvent]) {
    for pair in events.windows(2) {
        assert!(
            pair[0].percent <= pair[1].percent,
            "progress went backwards: {:?} then {:?}",
            pair[0],
            pair[1]
        );
    }
}

#[tokio::test]
async fn test_three_photos_single_archive() {
    let files: Vec<MemoryFile> = (1..=3)
        .map(|i| MemoryFile::new(format!("IMG_{i}.png"), vec![i as u8; 1024 * 1024]))
        .collect();
    let options = NumberingOptions {
        start_number: "01".into(),
        gap: 1,
        keep_extension: true,
    };
    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let entries = render_with_date(&files, "photo_{index}", &options, date);
    let renamed: Vec<&str> = entries.iter().map(|e| e.renamed.as_str()).collect();
    assert_eq!(renamed, vec!["photo_01.png", "photo_02.png", "photo_03.png"]);

    let sink = CollectingSink::default();
    let events = Mutex::new(Vec::new());
    let reporter = |e: ProgressEvent| events.lock().unwrap().push(e);
    let config = Config::default();

    let report = archive_files(
        ArchiveRequest::new(&files, &entries, &sink, &config).with_progress(&reporter),
    )
    .await
    .unwrap();

    assert_eq!(sink.names(), vec!["renamed-files.zip"]);
    assert_eq!(report.archives.len(), 1);
    assert_eq!(report.archives[0].file_name, "renamed-files.zip");
    assert_eq!(report.archives[0].entries, 3);
    assert_eq!(report.archives[0].input_bytes, 3 * 1024 * 1024);
    assert_eq!(report.archives[0].location, None);

    let packed = zip_entries(sink.data(0));
    let names: Vec<&str> = packed.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["photo_01.png", "photo_02.png", "photo_03.png"]);
    assert!(packed[1].1.iter().all(|&b| b == 2));
    assert_eq!(packed[2].1.len(), 1024 * 1024);

    let events = events.lock().unwrap();
    assert!(events.len() > 3);
    assert_non_decreasing(&events);
    assert_eq!(events.last().unwrap().percent, 100.0);
    // Single archive messages carry no part label
    assert!(events.iter().all(|e| !e.message.starts_with("Part ")));
}

#[tokio::test]
async fn test_cancelled_before_start_delivers_nothing() {
    let files = vec![MemoryFile::new("a.txt", b"a".to_vec())];
    let entries = entries_for(&["a.txt"]);
    let sink = CollectingSink::default();
    let events = Mutex::new(Vec::new());
    let reporter = |e: ProgressEvent| events.lock().unwrap().push(e);
    let config = fast_config();
    let token = CancellationToken::new();
    token.cancel();

    let result = archive_files(
        ArchiveRequest::new(&files, &entries, &sink, &config)
            .with_progress(&reporter)
            .with_cancel(token),
    )
    .await;

    let err = result.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.error_code(), "cancelled");
    assert!(sink.names().is_empty());
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_parts_are_named_and_labelled() {
    let files: Vec<MemoryFile> = ["a.bin", "b.bin", "c.bin"]
        .iter()
        .map(|n| MemoryFile::new(*n, vec![0u8; 8]))
        .collect();
    let entries = entries_for(&["a.bin", "b.bin", "c.bin"]);
    let sink = CollectingSink::default();
    let events = Mutex::new(Vec::new());
    let reporter = |e: ProgressEvent| events.lock().unwrap().push(e);
    let config = split_config();

    let report = archive_files(
        ArchiveRequest::new(&files, &entries, &sink, &config).with_progress(&reporter),
    )
    .await
    .unwrap();

    assert_eq!(
        sink.names(),
        vec![
            "renamed-files-part1-of-3.zip",
            "renamed-files-part2-of-3.zip",
            "renamed-files-part3-of-3.zip",
        ]
    );
    assert_eq!(report.total_entries(), 3);
    assert_eq!(zip_entries(sink.data(1))[0].0, "b.bin");

    let events = events.lock().unwrap();
    assert_non_decreasing(&events);
    assert_eq!(events.last().unwrap().percent, 100.0);
    assert!(events[0].message.starts_with("Part 1 of 3: Reading a.bin"));
    assert!(
        events
            .iter()
            .any(|e| e.message == "Part 2 of 3: Saved renamed-files-part2-of-3.zip")
    );
    // Each part owns a third of the range
    let first_part_max = events
        .iter()
        .filter(|e| e.message.starts_with("Part 1 of 3"))
        .map(|e| e.percent)
        .fold(0.0f32, f32::max);
    assert!((first_part_max - 100.0 / 3.0).abs() < 0.01);
}

#[tokio::test]
async fn test_cancel_during_delay_keeps_earlier_parts() {
    let files: Vec<MemoryFile> = ["a.bin", "b.bin"]
        .iter()
        .map(|n| MemoryFile::new(*n, vec![0u8; 8]))
        .collect();
    let entries = entries_for(&["a.bin", "b.bin"]);
    let token = CancellationToken::new();
    let sink = CollectingSink {
        cancel_after_first: Some(token.clone()),
        ..Default::default()
    };
    let mut config = split_config();
    config.archive.inter_batch_delay = Duration::from_secs(3600);

    let result = archive_files(
        ArchiveRequest::new(&files, &entries, &sink, &config).with_cancel(token),
    )
    .await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(sink.names(), vec!["renamed-files-part1-of-2.zip"]);
}

#[tokio::test]
async fn test_read_failure_names_the_file() {
    let files: Vec<Arc<dyn SourceFile>> = vec![
        Arc::new(MemoryFile::new("ok.txt", b"fine".to_vec())),
        Arc::new(VanishedFile {
            name: "gone.png".into(),
        }),
    ];
    let entries = entries_for(&["one.txt", "two.png"]);
    let sink = CollectingSink::default();
    let config = fast_config();

    let err = archive_files(ArchiveRequest::new(&files, &entries, &sink, &config))
        .await
        .unwrap_err();

    match &err {
        Error::Read { name, .. } => assert_eq!(name, "gone.png"),
        other => panic!("expected read failure, got {other:?}"),
    }
    assert!(err.to_string().contains("gone.png"));
    assert_eq!(err.error_code(), "read_failed");
    assert!(sink.names().is_empty());
}

#[tokio::test]
async fn test_length_mismatch_is_invalid_input() {
    let files = vec![MemoryFile::new("a.txt", b"a".to_vec())];
    let entries = entries_for(&["a.txt", "b.txt"]);
    let sink = CollectingSink::default();
    let config = fast_config();

    let result = archive_files(ArchiveRequest::new(&files, &entries, &sink, &config)).await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));

    let result = save_individually(ArchiveRequest::new(&files, &entries, &sink, &config)).await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[tokio::test]
async fn test_empty_selection_produces_nothing() {
    let files: Vec<MemoryFile> = Vec::new();
    let sink = CollectingSink::default();
    let config = fast_config();

    let report = archive_files(ArchiveRequest::new(&files, &[], &sink, &config))
        .await
        .unwrap();
    assert!(report.archives.is_empty());
    assert!(sink.names().is_empty());
}

#[tokio::test]
async fn test_entry_names_are_sanitized() {
    let files = vec![
        MemoryFile::new("1.txt", b"1".to_vec()),
        MemoryFile::new("2.txt", b"2".to_vec()),
    ];
    let entries = entries_for(&["a/b:c*.txt", "...hidden"]);
    let sink = CollectingSink::default();
    let config = fast_config();

    archive_files(ArchiveRequest::new(&files, &entries, &sink, &config))
        .await
        .unwrap();

    let names: Vec<String> = zip_entries(sink.data(0)).into_iter().map(|e| e.0).collect();
    assert_eq!(names, vec!["a_b_c_.txt", "_hidden"]);
}

#[tokio::test]
async fn test_colliding_names_get_suffixes() {
    let files = vec![
        MemoryFile::new("1.txt", b"1".to_vec()),
        MemoryFile::new("2.txt", b"2".to_vec()),
    ];
    let entries = entries_for(&["same.txt", "SAME.txt"]);
    let sink = CollectingSink::default();
    let config = fast_config();

    archive_files(ArchiveRequest::new(&files, &entries, &sink, &config))
        .await
        .unwrap();

    let packed = zip_entries(sink.data(0));
    assert_eq!(packed[0], ("same.txt".to_string(), b"1".to_vec()));
    assert_eq!(packed[1], ("SAME (1).txt".to_string(), b"2".to_vec()));
}

#[tokio::test]
async fn test_colliding_names_fail_when_configured() {
    let files = vec![
        MemoryFile::new("1.txt", b"1".to_vec()),
        MemoryFile::new("2.txt", b"2".to_vec()),
    ];
    let entries = entries_for(&["same.txt", "same.txt"]);
    let sink = CollectingSink::default();
    let mut config = fast_config();
    config.archive.name_collision = NameCollisionAction::Fail;

    let result = archive_files(ArchiveRequest::new(&files, &entries, &sink, &config)).await;
    assert!(matches!(result, Err(Error::NameCollision { .. })));
    assert!(sink.names().is_empty());
}

#[tokio::test]
async fn test_delivery_failure() {
    let files = vec![MemoryFile::new("a.txt", b"a".to_vec())];
    let entries = entries_for(&["a.txt"]);
    let sink = CollectingSink {
        fail: true,
        ..Default::default()
    };
    let config = fast_config();

    let err = archive_files(ArchiveRequest::new(&files, &entries, &sink, &config))
        .await
        .unwrap_err();
    match err {
        Error::Delivery { name, .. } => assert_eq!(name, "renamed-files.zip"),
        other => panic!("expected delivery failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_oversized_single_file_uses_plain_name() {
    let files = vec![MemoryFile::new("big.bin", vec![0u8; 64])];
    let entries = entries_for(&["big.bin"]);
    let sink = CollectingSink::default();
    let config = split_config();

    archive_files(ArchiveRequest::new(&files, &entries, &sink, &config))
        .await
        .unwrap();
    assert_eq!(sink.names(), vec!["renamed-files.zip"]);
}

#[tokio::test]
async fn test_save_individually() {
    let files = vec![
        MemoryFile::new("IMG_1.png", b"one".to_vec()),
        MemoryFile::new("IMG_2.png", b"two".to_vec()),
        MemoryFile::new("IMG_3.png", b"three".to_vec()),
    ];
    let entries = entries_for(&["photo.png", "photo.png", "x?.png"]);
    let sink = CollectingSink::default();
    let events = Mutex::new(Vec::new());
    let reporter = |e: ProgressEvent| events.lock().unwrap().push(e);
    let config = fast_config();

    let saved = save_individually(
        ArchiveRequest::new(&files, &entries, &sink, &config).with_progress(&reporter),
    )
    .await
    .unwrap();

    assert_eq!(sink.names(), vec!["photo.png", "photo (1).png", "x_.png"]);
    assert_eq!(sink.data(2), b"three");
    assert_eq!(saved.len(), 3);
    assert_eq!(saved[1].file_name, "photo (1).png");
    assert_eq!(saved[2].bytes, 5);

    let percents: Vec<f32> = events.lock().unwrap().iter().map(|e| e.percent).collect();
    assert_eq!(percents.len(), 3);
    assert_eq!(percents[2], 100.0);
    assert!(percents[0] < percents[1]);
}

#[tokio::test]
async fn test_save_individually_stops_on_cancel() {
    let files = vec![
        MemoryFile::new("a.txt", b"a".to_vec()),
        MemoryFile::new("b.txt", b"b".to_vec()),
    ];
    let entries = entries_for(&["a.txt", "b.txt"]);
    let token = CancellationToken::new();
    let sink = CollectingSink {
        cancel_after_first: Some(token.clone()),
        ..Default::default()
    };
    let config = fast_config();

    let result = save_individually(
        ArchiveRequest::new(&files, &entries, &sink, &config).with_cancel(token),
    )
    .await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(sink.names(), vec!["a.txt"]);
}

#[tokio::test]
async fn test_cancel_between_reads_stops_the_batch() {
    let token = CancellationToken::new();
    let mut first = TrackedFile::new("a.txt", b"first");
    first.cancel_on_read = Some(token.clone());
    let second = TrackedFile::new("b.txt", b"second");
    let second_reads = second.reads.clone();
    let files = vec![first, second];
    let entries = entries_for(&["a.txt", "b.txt"]);
    let sink = CollectingSink::default();
    let config = fast_config();

    let result = archive_files(
        ArchiveRequest::new(&files, &entries, &sink, &config).with_cancel(token),
    )
    .await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(sink.names().is_empty());
    assert_eq!(files[0].reads.load(Ordering::SeqCst), 1);
    assert_eq!(second_reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancellation_reported_before_input_errors() {
    let files = vec![MemoryFile::new("a.txt", b"a".to_vec())];
    let sink = CollectingSink::default();
    let mut config = fast_config();
    config.archive.name_collision = NameCollisionAction::Fail;
    let token = CancellationToken::new();
    token.cancel();

    // Length mismatch
    let mismatched = entries_for(&["a.txt", "b.txt"]);
    let result = archive_files(
        ArchiveRequest::new(&files, &mismatched, &sink, &config).with_cancel(token.clone()),
    )
    .await;
    assert!(matches!(result, Err(Error::Cancelled)));

    // Colliding names with the Fail action
    let twice = vec![
        MemoryFile::new("a.txt", b"a".to_vec()),
        MemoryFile::new("b.txt", b"b".to_vec()),
    ];
    let colliding = entries_for(&["same.txt", "same.txt"]);
    let result = save_individually(
        ArchiveRequest::new(&twice, &colliding, &sink, &config).with_cancel(token),
    )
    .await;
    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(sink.names().is_empty());
}

#[tokio::test]
async fn test_oversized_file_rejected_before_reading() {
    let small = TrackedFile::new("small.bin", &[0u8; 4]);
    let big = TrackedFile::new("huge.bin", &[0u8; 32]);
    let reads = [small.reads.clone(), big.reads.clone()];
    let files = vec![small, big];
    let entries = entries_for(&["small.bin", "huge.bin"]);
    let sink = CollectingSink::default();
    let mut config = fast_config();
    config.selection.max_file_size = 16;

    let err = archive_files(ArchiveRequest::new(&files, &entries, &sink, &config))
        .await
        .unwrap_err();

    match &err {
        Error::InvalidInput(message) => assert!(message.contains("\"huge.bin\""), "{message}"),
        other => panic!("expected invalid input, got {other:?}"),
    }
    assert!(reads.iter().all(|r| r.load(Ordering::SeqCst) == 0));
    assert!(sink.names().is_empty());
}

#[tokio::test]
async fn test_selection_limits_apply_to_individual_saves() {
    let files: Vec<MemoryFile> = (0..3)
        .map(|i| MemoryFile::new(format!("f{i}.txt"), vec![0u8; 10]))
        .collect();
    let entries = entries_for(&["f0.txt", "f1.txt", "f2.txt"]);
    let sink = CollectingSink::default();

    let mut config = fast_config();
    config.selection.max_files = 2;
    let result = save_individually(ArchiveRequest::new(&files, &entries, &sink, &config)).await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));

    let mut config = fast_config();
    config.selection.max_total_size = 25;
    let result = save_individually(ArchiveRequest::new(&files, &entries, &sink, &config)).await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert!(sink.names().is_empty());
}
