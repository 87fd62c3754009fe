// Probe LibAV adapter - Frame geometry via libav

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ffmpeg_next::{
    codec::context::Context as CodecContext,
    format::Pixel,
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;
use tracing::debug;

use crate::domain::model::Resolution;
use crate::error::{Video2PdfError, Video2PdfResult};
use crate::ports::ProbePort;

/// LibAV-based media probing adapter
pub struct ProbeLibavAdapter;

impl ProbeLibavAdapter {
    /// Create new LibAV probing adapter
    pub fn new() -> Video2PdfResult<Self> {
        ffmpeg_next::init()?;
        Ok(Self)
    }

    /// Declared dimensions, or the size of the first decoded frame when the
    /// container declares none
    pub fn read_resolution(path: &Path) -> Video2PdfResult<Option<Resolution>> {
        let mut input = ffmpeg_next::format::input(&path)?;
        let declared = match input.streams().best(Type::Video) {
            Some(stream) => {
                let decoder = CodecContext::from_parameters(stream.parameters())?
                    .decoder()
                    .video()?;
                Resolution::non_zero(decoder.width(), decoder.height())
            }
            None => return Ok(None),
        };

        if declared.is_some() {
            return Ok(declared);
        }

        debug!("No declared dimensions for {}; decoding one frame", path.display());
        Ok(decode_first(&mut input)?.and_then(|frame| Resolution::non_zero(frame.width(), frame.height())))
    }

    /// Decode the first video frame as RGB
    pub fn decode_first_frame(path: &Path) -> Video2PdfResult<RgbImage> {
        let mut input = ffmpeg_next::format::input(&path)?;
        let frame = decode_first(&mut input)?.ok_or(ffmpeg_next::Error::StreamNotFound)?;
        let (width, height) = (frame.width(), frame.height());

        let mut scaler = ScalingContext::get(
            frame.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;
        let mut rgb_frame = VideoFrame::empty();
        scaler.run(&frame, &mut rgb_frame)?;

        let buffer = frame_to_rgb_buffer(&rgb_frame, width, height);
        RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
            Video2PdfError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "decoded frame does not match its declared size",
            ))
        })
    }
}

fn decode_first(input: &mut ffmpeg_next::format::context::Input) -> Video2PdfResult<Option<VideoFrame>> {
    let (index, mut decoder) = match input.streams().best(Type::Video) {
        Some(stream) => (
            stream.index(),
            CodecContext::from_parameters(stream.parameters())?
                .decoder()
                .video()?,
        ),
        None => return Ok(None),
    };

    let mut frame = VideoFrame::empty();
    for (stream, packet) in input.packets() {
        if stream.index() != index {
            continue;
        }
        decoder.send_packet(&packet)?;
        if decoder.receive_frame(&mut frame).is_ok() {
            return Ok(Some(frame));
        }
    }

    decoder.send_eof()?;
    if decoder.receive_frame(&mut frame).is_ok() {
        return Ok(Some(frame));
    }
    Ok(None)
}

/// Copy an RGB24 plane, dropping any row padding
fn frame_to_rgb_buffer(frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = frame.stride(0);
    let row_bytes = width as usize * 3;
    let data = frame.data(0);

    if stride == row_bytes {
        return data[..row_bytes * height as usize].to_vec();
    }

    let mut buffer = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        buffer.extend_from_slice(&data[start..start + row_bytes]);
    }
    buffer
}

#[async_trait]
impl ProbePort for ProbeLibavAdapter {
    async fn resolution(&self, path: &Path) -> Video2PdfResult<Option<Resolution>> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::read_resolution(&path))
            .await?
    }
}
