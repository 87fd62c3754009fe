// Region interactor - Resolves the crop rectangle for a run

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::model::*;
use crate::domain::rules::RegionRules;
use crate::error::PipelineWarning;
use crate::ports::*;
use crate::progress::{ProgressEvent, ProgressSender};

/// Outcome of region resolution. Never an error: every failure degrades to
/// the explicit crop or none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionSelection {
    pub crop: Option<CropRegion>,
    /// Whether the frame extractor should run its own automatic cropping
    pub forward_auto: bool,
}

/// Region selector
pub struct RegionSelector {
    picker: Option<Arc<dyn RegionPickerPort>>,
    detector: Option<Arc<dyn GeometryDetector>>,
}

impl RegionSelector {
    pub fn new(
        picker: Option<Arc<dyn RegionPickerPort>>,
        detector: Option<Arc<dyn GeometryDetector>>,
    ) -> Self {
        Self { picker, detector }
    }

    pub async fn select(
        &self,
        mode: RegionMode,
        video: &Path,
        explicit: Option<CropRegion>,
        frame: Option<Resolution>,
        progress: &ProgressSender,
    ) -> RegionSelection {
        match mode {
            RegionMode::Off => RegionSelection {
                crop: explicit,
                forward_auto: false,
            },
            RegionMode::Manual => RegionSelection {
                crop: self.select_manual(video, progress).await.or(explicit),
                forward_auto: false,
            },
            RegionMode::Auto(settings) => {
                if explicit.is_some() {
                    return RegionSelection {
                        crop: explicit,
                        forward_auto: true,
                    };
                }
                match &self.detector {
                    Some(detector) => self.select_auto(detector.as_ref(), video, frame, &settings, progress).await,
                    None => RegionSelection {
                        crop: None,
                        forward_auto: true,
                    },
                }
            }
        }
    }

    async fn select_manual(&self, video: &Path, progress: &ProgressSender) -> Option<CropRegion> {
        let Some(picker) = &self.picker else {
            progress.warn(PipelineWarning::RegionSelection(
                "no interactive picker available".to_string(),
            ));
            return None;
        };

        progress.message("Select the slide region on the first frame");
        match picker.pick(video).await {
            Ok(Some(crop)) if crop.is_selected() => {
                info!("Region chosen: {}", crop);
                emit_chosen(progress, crop);
                Some(crop)
            }
            Ok(_) => {
                info!("Region selection cancelled");
                progress.emit(ProgressEvent::RegionCancelled);
                None
            }
            Err(e) => {
                warn!("Region selection failed: {}", e);
                progress.warn(PipelineWarning::RegionSelection(e.to_string()));
                None
            }
        }
    }

    async fn select_auto(
        &self,
        detector: &dyn GeometryDetector,
        video: &Path,
        frame: Option<Resolution>,
        settings: &AutoCropSettings,
        progress: &ProgressSender,
    ) -> RegionSelection {
        match detector.detect(video).await {
            Ok(candidate) => {
                let crop = candidate.and_then(|c| RegionRules::refine_candidate(c, frame, settings));
                match crop {
                    Some(crop) => {
                        info!("Region detected: {}", crop);
                        emit_chosen(progress, crop);
                    }
                    None => progress.warn(PipelineWarning::RegionSelection(
                        "no usable region detected".to_string(),
                    )),
                }
                RegionSelection {
                    crop,
                    forward_auto: crop.is_none(),
                }
            }
            Err(e) => {
                warn!("Region detection failed: {}", e);
                progress.warn(PipelineWarning::RegionSelection(e.to_string()));
                RegionSelection {
                    crop: None,
                    forward_auto: true,
                }
            }
        }
    }
}

fn emit_chosen(progress: &ProgressSender, crop: CropRegion) {
    progress.emit(ProgressEvent::RegionChosen {
        x: crop.x,
        y: crop.y,
        w: crop.w,
        h: crop.h,
    });
}
