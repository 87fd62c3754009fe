//! Pipeline tests with in-memory ports

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use video2pdf::app::{
    PipelineOrchestrator, PipelineRequest, PipelineRunner, RegionSelector, SourceResolver,
    SourceSettings, Trimmer,
};
use video2pdf::domain::model::*;
use video2pdf::domain::rules::ReencodeProfile;
use video2pdf::error::{Video2PdfError, Video2PdfResult};
use video2pdf::ports::*;
use video2pdf::progress::{progress_channel, ProgressEvent, ProgressSender};

// Fakes

struct FakeDownloader {
    file: PathBuf,
    requests: Mutex<Vec<EngineRequest>>,
    metadata: Option<Value>,
}

impl FakeDownloader {
    fn new(file: &Path) -> Self {
        Self {
            file: file.to_path_buf(),
            requests: Mutex::new(Vec::new()),
            metadata: Some(json!({
                "id": "abc",
                "title": "Lecture",
                "requested_downloads": [{ "filepath": file.to_string_lossy() }],
            })),
        }
    }

    fn without_metadata(file: &Path) -> Self {
        Self {
            metadata: None,
            ..Self::new(file)
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl DownloadPort for FakeDownloader {
    async fn fetch(
        &self,
        request: &EngineRequest,
        on_progress: &(dyn Fn(EngineProgress) + Send + Sync),
    ) -> Video2PdfResult<Option<Value>> {
        self.requests.lock().unwrap().push(request.clone());
        for status in ["downloading", "error", "finished"] {
            on_progress(EngineProgress {
                status: status.to_string(),
                percent: "50.0%".to_string(),
                speed: "1.0MiB/s".to_string(),
                eta: "00:05".to_string(),
                total_bytes: None,
                total_bytes_estimate: Some(2_097_152),
            });
        }
        std::fs::write(&self.file, b"video")?;
        Ok(self.metadata.clone())
    }
}

/// Each run pops `(exit code, bytes written to the output)`
struct FakeTranscoder {
    installed: bool,
    script: Mutex<VecDeque<(i32, &'static [u8])>>,
    calls: Mutex<Vec<Vec<OsString>>>,
}

impl FakeTranscoder {
    fn new(script: &[(i32, &'static [u8])]) -> Self {
        Self {
            installed: true,
            script: Mutex::new(script.iter().copied().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TranscodePort for FakeTranscoder {
    fn locate(&self) -> Option<PathBuf> {
        self.installed.then(|| PathBuf::from("ffmpeg"))
    }

    async fn run(&self, _program: &Path, args: &[OsString]) -> Video2PdfResult<ToolStatus> {
        self.calls.lock().unwrap().push(args.to_vec());
        let (code, bytes) = self.script.lock().unwrap().pop_front().unwrap_or((1, b""));
        if let Some(output) = args.last() {
            std::fs::write(output, bytes)?;
        }
        Ok(ToolStatus {
            exit_code: Some(code),
            stderr_tail: if code == 0 { String::new() } else { "Invalid data".to_string() },
        })
    }
}

struct FakeProbe {
    fails: bool,
    delay: Duration,
}

impl FakeProbe {
    fn ok() -> Self {
        Self {
            fails: false,
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl ProbePort for FakeProbe {
    async fn resolution(&self, _path: &Path) -> Video2PdfResult<Option<Resolution>> {
        tokio::time::sleep(self.delay).await;
        if self.fails {
            return Err(Video2PdfError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "moov atom not found",
            )));
        }
        Ok(Resolution::non_zero(640, 360))
    }
}

enum PickerBehavior {
    Choose(CropRegion),
    Cancel,
    Fail,
}

struct FakePicker(PickerBehavior);

#[async_trait]
impl RegionPickerPort for FakePicker {
    async fn pick(&self, _video: &Path) -> Video2PdfResult<Option<CropRegion>> {
        match &self.0 {
            PickerBehavior::Choose(crop) => Ok(Some(*crop)),
            PickerBehavior::Cancel => Ok(None),
            PickerBehavior::Fail => Err(Video2PdfError::Extraction {
                message: "no display".to_string(),
            }),
        }
    }
}

struct FakeDetector(Option<CropRegion>);

#[async_trait]
impl GeometryDetector for FakeDetector {
    async fn detect(&self, _video: &Path) -> Video2PdfResult<Option<CropRegion>> {
        Ok(self.0)
    }
}

struct FakeExtractor;

#[async_trait]
impl FrameExtractorPort for FakeExtractor {
    async fn extract(
        &self,
        result: &PipelineResult,
        progress: &ProgressSender,
    ) -> Video2PdfResult<PathBuf> {
        progress.message("extracting");
        let pdf = result
            .option("output_pdf")
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .ok_or_else(|| Video2PdfError::Extraction {
                message: "missing output_pdf".to_string(),
            })?;
        Ok(pdf)
    }
}

// Harness

fn settings() -> SourceSettings {
    SourceSettings {
        merge_format: "mp4".to_string(),
        concurrent_fragments: 4,
        retries: 10,
        fragment_retries: 10,
        title_max: 200,
        subtitle_langs: vec!["en".to_string()],
    }
}

struct Harness {
    downloader: Arc<FakeDownloader>,
    transcoder: Arc<FakeTranscoder>,
    probe: Arc<FakeProbe>,
    picker: Option<Arc<dyn RegionPickerPort>>,
    detector: Option<Arc<dyn GeometryDetector>>,
    extractor: Option<Arc<dyn FrameExtractorPort>>,
}

impl Harness {
    fn new(dir: &Path) -> Self {
        Self {
            downloader: Arc::new(FakeDownloader::new(&dir.join("Lecture [abc].mp4"))),
            transcoder: Arc::new(FakeTranscoder::new(&[(0, b"clip")])),
            probe: Arc::new(FakeProbe::ok()),
            picker: None,
            detector: None,
            extractor: None,
        }
    }

    fn orchestrator(&self) -> PipelineOrchestrator {
        PipelineOrchestrator::new(
            SourceResolver::new(self.downloader.clone(), settings()),
            Arc::new(Trimmer::new(self.transcoder.clone(), ReencodeProfile::default())),
            self.probe.clone(),
            RegionSelector::new(self.picker.clone(), self.detector.clone()),
            self.extractor.clone(),
        )
    }
}

fn local_video(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("lecture.mp4");
    std::fs::write(&path, b"video").unwrap();
    path
}

// Orchestrator

#[tokio::test]
async fn test_local_input_without_range() {
    let tmp = TempDir::new().unwrap();
    let video = local_video(&tmp);
    let harness = Harness::new(tmp.path());
    let (tx, mut rx) = progress_channel();

    let request = PipelineRequest::new(video.to_string_lossy());
    let result = harness.orchestrator().prepare(&request, &tx).await.unwrap();

    assert_eq!(result.final_video_path, video);
    assert_eq!(result.crop, None);
    assert_eq!(result.resolution, Resolution::non_zero(640, 360));
    assert_eq!(result.option("output_pdf"), Some(&json!(tmp.path().join("lecture.pdf").to_string_lossy())));
    assert_eq!(result.option("auto_crop"), Some(&json!(false)));
    assert_eq!(harness.transcoder.calls(), 0);
    assert_eq!(harness.downloader.calls(), 0);

    let events = rx.drain();
    assert!(events.contains(&ProgressEvent::Probed { width: 640, height: 360 }));
}

#[tokio::test]
async fn test_reversed_range_rejected_before_any_work() {
    let tmp = TempDir::new().unwrap();
    let harness = Harness::new(tmp.path());

    let mut request = PipelineRequest::new("https://example.com/watch?v=abc");
    request.start = "90".to_string();
    request.end = "01:30".to_string();

    let result = harness
        .orchestrator()
        .prepare(&request, &ProgressSender::detached())
        .await;

    assert!(matches!(result, Err(Video2PdfError::InvalidRange { .. })));
    assert_eq!(harness.downloader.calls(), 0);
    assert_eq!(harness.transcoder.calls(), 0);
}

#[tokio::test]
async fn test_bad_time_text_rejected() {
    let tmp = TempDir::new().unwrap();
    let video = local_video(&tmp);
    let harness = Harness::new(tmp.path());

    let mut request = PipelineRequest::new(video.to_string_lossy());
    request.end = "1:2:3:4".to_string();

    let result = harness
        .orchestrator()
        .prepare(&request, &ProgressSender::detached())
        .await;
    assert!(matches!(result, Err(Video2PdfError::TimeFormat { .. })));
}

#[tokio::test]
async fn test_blank_input_rejected() {
    let tmp = TempDir::new().unwrap();
    let harness = Harness::new(tmp.path());

    let result = harness
        .orchestrator()
        .prepare(&PipelineRequest::new("  "), &ProgressSender::detached())
        .await;
    assert!(matches!(result, Err(Video2PdfError::MissingInput)));
}

#[tokio::test]
async fn test_remote_input_downloads_with_height_cap() {
    let tmp = TempDir::new().unwrap();
    let harness = Harness::new(tmp.path());
    let (tx, mut rx) = progress_channel();

    let mut request = PipelineRequest::new("https://example.com/watch?v=abc");
    request.download.quality = QualityTier::parse("720p");
    request.download_dir = Some(tmp.path().to_path_buf());

    let result = harness.orchestrator().prepare(&request, &tx).await.unwrap();
    assert_eq!(result.final_video_path, tmp.path().join("Lecture [abc].mp4"));

    let requests = harness.downloader.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].format.matches("[height<=?720]").count(), 2);
    assert_eq!(requests[0].output_dir, tmp.path());

    let events = rx.drain();
    let downloading = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::Downloading { .. }))
        .count();
    assert_eq!(downloading, 1);
    assert!(events.contains(&ProgressEvent::Finished {
        total_bytes: Some(2_097_152)
    }));
}

#[tokio::test]
async fn test_remote_input_without_metadata_fails() {
    let tmp = TempDir::new().unwrap();
    let mut harness = Harness::new(tmp.path());
    harness.downloader = Arc::new(FakeDownloader::without_metadata(&tmp.path().join("x.mp4")));

    let mut request = PipelineRequest::new("https://example.com/watch?v=abc");
    request.download_dir = Some(tmp.path().to_path_buf());

    let result = harness
        .orchestrator()
        .prepare(&request, &ProgressSender::detached())
        .await;
    assert!(matches!(result, Err(Video2PdfError::Download { .. })));
}

#[tokio::test]
async fn test_bounded_range_trims_into_segment_dir() {
    let tmp = TempDir::new().unwrap();
    let video = local_video(&tmp);
    let harness = Harness::new(tmp.path());
    let (tx, mut rx) = progress_channel();

    let mut request = PipelineRequest::new(video.to_string_lossy());
    request.start = "00:30".to_string();
    request.end = "2:00".to_string();
    request.segment_dir = Some(tmp.path().join("segments"));

    let result = harness.orchestrator().prepare(&request, &tx).await.unwrap();
    let clip = tmp.path().join("segments").join("lecture.clip.mp4");
    assert_eq!(result.final_video_path, clip);
    assert_eq!(
        result.option("output_pdf"),
        Some(&json!(tmp.path().join("segments").join("lecture.clip.pdf").to_string_lossy()))
    );

    let events = rx.drain();
    assert!(events.contains(&ProgressEvent::TrimStarted {
        start: Some(30.0),
        end: Some(120.0)
    }));
    assert!(events.contains(&ProgressEvent::TrimFinished {
        output: clip,
        strategy: TrimStrategy::Copy
    }));
}

#[tokio::test]
async fn test_missing_local_file() {
    let tmp = TempDir::new().unwrap();
    let harness = Harness::new(tmp.path());
    let request = PipelineRequest::new(tmp.path().join("nope.mp4").to_string_lossy());

    match harness.orchestrator().prepare(&request, &ProgressSender::detached()).await {
        Err(Video2PdfError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_explicit_crop() {
    let tmp = TempDir::new().unwrap();
    let video = local_video(&tmp);
    let harness = Harness::new(tmp.path());

    let mut request = PipelineRequest::new(video.to_string_lossy());
    request.crop_spec = "10,20,300,400".to_string();
    let result = harness
        .orchestrator()
        .prepare(&request, &ProgressSender::detached())
        .await
        .unwrap();
    assert_eq!(result.crop, Some(CropRegion::new(10, 20, 300, 400)));

    request.crop_spec = "10,20,300".to_string();
    let result = harness
        .orchestrator()
        .prepare(&request, &ProgressSender::detached())
        .await;
    assert!(matches!(result, Err(Video2PdfError::RegionSpec { .. })));
}

#[tokio::test]
async fn test_probe_failure_degrades() {
    let tmp = TempDir::new().unwrap();
    let video = local_video(&tmp);
    let mut harness = Harness::new(tmp.path());
    harness.probe = Arc::new(FakeProbe {
        fails: true,
        delay: Duration::ZERO,
    });
    let (tx, mut rx) = progress_channel();

    let result = harness
        .orchestrator()
        .prepare(&PipelineRequest::new(video.to_string_lossy()), &tx)
        .await
        .unwrap();

    assert_eq!(result.resolution, None);
    assert!(rx
        .drain()
        .iter()
        .any(|e| matches!(e, ProgressEvent::Warning { message } if message.contains("moov atom"))));
}

#[tokio::test]
async fn test_manual_selection_chosen() {
    let tmp = TempDir::new().unwrap();
    let video = local_video(&tmp);
    let mut harness = Harness::new(tmp.path());
    harness.picker = Some(Arc::new(FakePicker(PickerBehavior::Choose(CropRegion::new(
        5, 5, 100, 80,
    )))));
    let (tx, mut rx) = progress_channel();

    let mut request = PipelineRequest::new(video.to_string_lossy());
    request.region_mode = RegionMode::Manual;
    request.crop_spec = "1,1,10,10".to_string();

    let result = harness.orchestrator().prepare(&request, &tx).await.unwrap();
    assert_eq!(result.crop, Some(CropRegion::new(5, 5, 100, 80)));
    assert_eq!(result.option("auto_crop"), Some(&json!(false)));
    assert!(rx.drain().contains(&ProgressEvent::RegionChosen { x: 5, y: 5, w: 100, h: 80 }));
}

#[tokio::test]
async fn test_manual_selection_cancel_keeps_explicit_crop() {
    let tmp = TempDir::new().unwrap();
    let video = local_video(&tmp);
    let mut harness = Harness::new(tmp.path());
    harness.picker = Some(Arc::new(FakePicker(PickerBehavior::Cancel)));
    let (tx, mut rx) = progress_channel();

    let mut request = PipelineRequest::new(video.to_string_lossy());
    request.region_mode = RegionMode::Manual;
    request.crop_spec = "1,1,10,10".to_string();

    let result = harness.orchestrator().prepare(&request, &tx).await.unwrap();
    assert_eq!(result.crop, Some(CropRegion::new(1, 1, 10, 10)));
    assert!(rx.drain().contains(&ProgressEvent::RegionCancelled));
}

#[tokio::test]
async fn test_manual_selection_failure_degrades() {
    let tmp = TempDir::new().unwrap();
    let video = local_video(&tmp);
    let mut harness = Harness::new(tmp.path());
    harness.picker = Some(Arc::new(FakePicker(PickerBehavior::Fail)));
    let (tx, mut rx) = progress_channel();

    let mut request = PipelineRequest::new(video.to_string_lossy());
    request.region_mode = RegionMode::Manual;

    let result = harness.orchestrator().prepare(&request, &tx).await.unwrap();
    assert_eq!(result.crop, None);
    assert!(rx
        .drain()
        .iter()
        .any(|e| matches!(e, ProgressEvent::Warning { message } if message.contains("no display"))));
}

#[tokio::test]
async fn test_auto_mode_refines_detected_region() {
    let tmp = TempDir::new().unwrap();
    let video = local_video(&tmp);
    let mut harness = Harness::new(tmp.path());
    harness.detector = Some(Arc::new(FakeDetector(Some(CropRegion::new(100, 100, 400, 300)))));

    let mut request = PipelineRequest::new(video.to_string_lossy());
    request.region_mode = RegionMode::Auto(AutoCropSettings::default());

    let result = harness
        .orchestrator()
        .prepare(&request, &ProgressSender::detached())
        .await
        .unwrap();
    assert_eq!(result.crop, Some(CropRegion::new(94, 94, 412, 266)));
    assert_eq!(result.option("auto_crop"), Some(&json!(false)));
}

#[tokio::test]
async fn test_auto_mode_unusable_detection_forwards_flag() {
    let tmp = TempDir::new().unwrap();
    let video = local_video(&tmp);

    // nothing found, then a sliver well under the minimum area
    for candidate in [None, Some(CropRegion::new(0, 0, 20, 20))] {
        let mut harness = Harness::new(tmp.path());
        harness.detector = Some(Arc::new(FakeDetector(candidate)));
        let (tx, mut rx) = progress_channel();

        let mut request = PipelineRequest::new(video.to_string_lossy());
        request.region_mode = RegionMode::Auto(AutoCropSettings::default());

        let result = harness.orchestrator().prepare(&request, &tx).await.unwrap();
        assert_eq!(result.crop, None, "{:?}", candidate);
        assert_eq!(result.option("auto_crop"), Some(&json!(true)), "{:?}", candidate);
        assert!(rx
            .drain()
            .iter()
            .any(|e| matches!(e, ProgressEvent::Warning { .. })));
    }
}

#[tokio::test]
async fn test_auto_mode_without_detector_forwards_flag() {
    let tmp = TempDir::new().unwrap();
    let video = local_video(&tmp);
    let harness = Harness::new(tmp.path());

    let mut request = PipelineRequest::new(video.to_string_lossy());
    request.region_mode = RegionMode::Auto(AutoCropSettings { pad: 12, min_area_ratio: 0.2 });

    let result = harness
        .orchestrator()
        .prepare(&request, &ProgressSender::detached())
        .await
        .unwrap();
    assert_eq!(result.crop, None);
    assert_eq!(result.option("auto_crop"), Some(&json!(true)));
    assert_eq!(result.option("auto_crop_pad"), Some(&json!(12)));
}

#[tokio::test]
async fn test_run_hands_off_to_extractor() {
    let tmp = TempDir::new().unwrap();
    let video = local_video(&tmp);
    let mut harness = Harness::new(tmp.path());
    harness.extractor = Some(Arc::new(FakeExtractor));
    let (tx, mut rx) = progress_channel();

    let outcome = harness
        .orchestrator()
        .run(PipelineRequest::new(video.to_string_lossy()), &tx)
        .await
        .unwrap();

    assert_eq!(outcome.document, Some(tmp.path().join("lecture.pdf")));
    assert!(rx.drain().contains(&ProgressEvent::Message {
        text: "extracting".to_string()
    }));
}

// Runner

#[tokio::test]
async fn test_runner_rejects_second_start() {
    let tmp = TempDir::new().unwrap();
    let video = local_video(&tmp);
    let mut harness = Harness::new(tmp.path());
    harness.probe = Arc::new(FakeProbe {
        fails: false,
        delay: Duration::from_millis(300),
    });
    let runner = PipelineRunner::new(Arc::new(harness.orchestrator()));

    let first = runner.start(PipelineRequest::new(video.to_string_lossy())).unwrap();
    assert!(runner.is_running());
    assert!(matches!(
        runner.start(PipelineRequest::new(video.to_string_lossy())),
        Err(Video2PdfError::Busy)
    ));

    let outcome = first.outcome().await.unwrap();
    assert_eq!(outcome.result.final_video_path, video);

    assert!(!runner.is_running());
    assert!(runner.start(PipelineRequest::new(video.to_string_lossy())).is_ok());
}

#[tokio::test]
async fn test_runner_reports_one_error_event() {
    let tmp = TempDir::new().unwrap();
    let harness = Harness::new(tmp.path());
    let runner = PipelineRunner::new(Arc::new(harness.orchestrator()));

    let mut request = PipelineRequest::new(tmp.path().join("lecture.mp4").to_string_lossy());
    request.start = "90".to_string();
    request.end = "01:30".to_string();

    let mut handle = runner.start(request).unwrap();
    let outcome = loop {
        if let Some(outcome) = handle.try_outcome() {
            break outcome;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };
    assert!(matches!(outcome, Err(Video2PdfError::InvalidRange { .. })));
    assert!(runner.start(PipelineRequest::new("  ")).is_ok());

    let errors: Vec<_> = handle
        .events
        .drain()
        .into_iter()
        .filter(|e| matches!(e, ProgressEvent::Error { .. }))
        .collect();
    assert_eq!(errors.len(), 1);
}

// Resolver

#[tokio::test]
async fn test_resolver_builds_engine_request() {
    let tmp = TempDir::new().unwrap();
    let downloader = Arc::new(FakeDownloader::new(&tmp.path().join("Lecture [abc].mp4")));
    let resolver = SourceResolver::new(downloader, settings());

    let options = DownloadOptions {
        proxy: Some("socks5://127.0.0.1:1080".to_string()),
        allow_playlist: true,
        ..DownloadOptions::default()
    };
    let request = resolver.build_request("https://example.com/v", tmp.path(), &options);

    assert_eq!(request.format, "bv*+ba/b");
    assert_eq!(request.output_template, "%(title).200s [%(id)s].%(ext)s");
    assert_eq!(request.options.proxy.as_deref(), Some("socks5://127.0.0.1:1080"));
    assert!(request.options.allow_playlist);
    assert_eq!(request.subtitle_langs, ["en"]);
}

#[tokio::test]
async fn test_resolver_creates_destination() {
    let tmp = TempDir::new().unwrap();
    let destination = tmp.path().join("downloads");
    let downloader = Arc::new(FakeDownloader::new(&tmp.path().join("Lecture [abc].mp4")));
    let resolver = SourceResolver::new(downloader, settings());

    resolver
        .resolve(
            "https://example.com/v",
            &destination,
            &DownloadOptions::default(),
            &ProgressSender::detached(),
        )
        .await
        .unwrap();
    assert!(destination.is_dir());
}
