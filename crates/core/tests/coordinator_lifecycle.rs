//! Run coordinator integration tests.
//!
//! These tests verify per-category run slots end to end, including the
//! built-in image and copy actions.

use std::sync::Arc;

use tempfile::TempDir;

use bambam_core::{
    build_job_set,
    job::{JobOptions, ResizeSpec},
    progress::ChannelReporter,
    testing::{fixtures, MockAction, RecordingReporter},
    Category, JobTemplate, OutputPolicy, ProgressEvent, RunCoordinator, RunStatus, TargetFormat,
};

/// Test helper to create a coordinator over a scratch directory.
struct TestHarness {
    coordinator: RunCoordinator,
    reporter: Arc<RecordingReporter>,
    temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self {
            coordinator: RunCoordinator::default(),
            reporter: Arc::new(RecordingReporter::new()),
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }
}

#[tokio::test]
async fn test_categories_run_independently() {
    let harness = TestHarness::new();
    let held = Arc::new(MockAction::new().hold_until_cancelled());
    let quick = Arc::new(MockAction::new());

    let image_run = harness
        .coordinator
        .start_with_action(
            Category::Image,
            fixtures::jobs(harness.temp_dir.path(), &["a.png", "b.png"], "jpg"),
            held.clone(),
            harness.reporter.clone(),
        )
        .await
        .unwrap();
    held.wait_until_held().await;

    let audio_run = harness
        .coordinator
        .start_with_action(
            Category::Audio,
            fixtures::jobs(harness.temp_dir.path(), &["x.wav", "y.wav"], "mp3"),
            quick.clone(),
            harness.reporter.clone(),
        )
        .await
        .unwrap();
    let audio = audio_run.wait().await;

    assert_eq!(audio.status, RunStatus::Completed);
    assert_eq!(audio.succeeded, 2);
    assert_eq!(harness.coordinator.status(Category::Image).await, RunStatus::Running);
    assert_eq!(
        harness.coordinator.active_categories().await,
        vec![Category::Image]
    );

    assert_eq!(harness.coordinator.cancel_all().await, 1);
    let image = image_run.wait().await;
    assert_eq!(image.status, RunStatus::Cancelled);
    assert_eq!(image.failed, 1);
    assert_eq!(image.cancelled, 1);
    assert_eq!(harness.coordinator.status(Category::Audio).await, RunStatus::Completed);
    assert!(harness.coordinator.active_categories().await.is_empty());
}

#[tokio::test]
async fn test_image_batch_with_builtin_action() {
    let harness = TestHarness::new();
    let src = harness.temp_dir.path().join("photos");
    let out = harness.temp_dir.path().join("converted");
    std::fs::create_dir_all(&src).unwrap();
    fixtures::png_file(&src, "wide.png", 400, 200);
    fixtures::png_file(&src, "small.png", 50, 50);
    fixtures::write_file(&src, "readme.txt");

    let sources = build_job_set(&[], &[src.clone()], &Category::Image);
    assert_eq!(sources.len(), 2);

    let jobs = JobTemplate::new(
        TargetFormat::format("jpeg"),
        OutputPolicy::FixedDirectory(out.clone()),
    )
    .with_options(JobOptions::default().with_resize(ResizeSpec::fit(100, 100)))
    .instantiate(sources)
    .unwrap();

    let handle = harness
        .coordinator
        .start(Category::Image, jobs, harness.reporter.clone())
        .await
        .unwrap();
    let summary = handle.wait().await;

    assert!(summary.is_fully_successful(), "{}", summary);
    assert_eq!(
        image::image_dimensions(out.join("wide.jpg")).unwrap(),
        (100, 100)
    );
    // Already smaller than the box: left untouched.
    assert_eq!(
        image::image_dimensions(out.join("small.jpg")).unwrap(),
        (50, 50)
    );
}

#[tokio::test]
async fn test_rename_batch_moves_files() {
    let harness = TestHarness::new();
    let dir = harness.temp_dir.path();
    let out = dir.join("renamed");

    let jobs = JobTemplate::new(TargetFormat::KeepOriginal, OutputPolicy::FixedDirectory(out.clone()))
        .with_options(
            JobOptions::default()
                .with_rename_pattern("holiday_{index:03}")
                .with_start_index(7)
                .with_move_source(true),
        )
        .instantiate(vec![
            fixtures::write_file(dir, "IMG_1.jpg"),
            fixtures::write_file(dir, "IMG_2.jpg"),
        ])
        .unwrap();

    let (reporter, mut events) = ChannelReporter::new();
    let handle = harness
        .coordinator
        .start(Category::Rename, jobs, Arc::new(reporter))
        .await
        .unwrap();
    let summary = handle.wait().await;

    assert_eq!(
        summary.produced_paths,
        vec![out.join("holiday_007.jpg"), out.join("holiday_008.jpg")]
    );
    assert!(!dir.join("IMG_1.jpg").exists());
    assert_eq!(std::fs::read(out.join("holiday_008.jpg")).unwrap(), b"IMG_2.jpg");

    let mut finished = 0;
    while let Ok(event) = events.try_recv() {
        if let ProgressEvent::BatchFinished { summary: reported } = event {
            assert_eq!(reported.run_id, handle.id());
            finished += 1;
        }
    }
    assert_eq!(finished, 1);
}

#[tokio::test]
async fn test_unsupported_target_fails_each_job() {
    let harness = TestHarness::new();
    let jobs = fixtures::jobs(harness.temp_dir.path(), &["a.png", "b.png"], "mp3");

    let handle = harness
        .coordinator
        .start(Category::Image, jobs, harness.reporter.clone())
        .await
        .unwrap();
    let summary = handle.wait().await;

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.failed, 2);
    assert!(summary
        .first_error
        .unwrap()
        .message
        .contains("Unsupported format: mp3"));
}
