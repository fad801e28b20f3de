//! Frame source backed by still images in a directory.
//!
//! Images are replayed in file-name order. Each one is decoded, checked for
//! darkness and re-encoded as a baseline JPEG before it is handed to the
//! enrollment session, so any format the `image` crate reads can be used.

use async_trait::async_trait;
use faceroll_core::FrameCapture;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};

const EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Fraction of near-black pixels above which a frame counts as dark.
const DARK_FRACTION: f32 = 0.95;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to read frame directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no images found in {0}")]
    NoFrames(PathBuf),
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to encode frame: {0}")]
    Encode(#[source] image::ImageError),
    #[error("frame {0} is too dark")]
    Dark(PathBuf),
}

pub struct DirectoryCapture {
    frames: Vec<PathBuf>,
    next: usize,
    cycle: bool,
}

impl DirectoryCapture {
    /// List the images in `dir`. With `cycle` the list restarts after the
    /// last image; without it, later captures come back empty.
    pub fn open(dir: &Path, cycle: bool) -> Result<Self, CaptureError> {
        let entries = std::fs::read_dir(dir).map_err(|source| CaptureError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_image(path))
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(CaptureError::NoFrames(dir.to_path_buf()));
        }
        tracing::info!(dir = %dir.display(), frames = frames.len(), cycle, "frame directory opened");
        Ok(Self {
            frames,
            next: 0,
            cycle,
        })
    }

    fn next_path(&mut self) -> Option<PathBuf> {
        if self.next >= self.frames.len() {
            if !self.cycle {
                return None;
            }
            self.next = 0;
        }
        let path = self.frames[self.next].clone();
        self.next += 1;
        Some(path)
    }
}

#[async_trait]
impl FrameCapture for DirectoryCapture {
    async fn take_picture(&mut self) -> Option<Vec<u8>> {
        let path = self.next_path()?;
        let loaded = tokio::task::spawn_blocking(move || read_frame(&path)).await;
        match loaded {
            Ok(Ok(frame)) => Some(frame),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "frame skipped");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "frame loader panicked");
                None
            }
        }
    }
}

/// Decode `path`, reject dark frames and re-encode as JPEG.
pub fn read_frame(path: &Path) -> Result<Vec<u8>, CaptureError> {
    let image = image::open(path).map_err(|source| CaptureError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let gray = image.to_luma8();
    if is_dark_frame(gray.as_raw(), DARK_FRACTION) {
        return Err(CaptureError::Dark(path.to_path_buf()));
    }

    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, ImageFormat::Jpeg).map_err(CaptureError::Encode)?;
    Ok(out.into_inner())
}

/// True if more than `threshold_pct` of pixels sit in the darkest
/// histogram bucket (0-31).
pub fn is_dark_frame(gray: &[u8], threshold_pct: f32) -> bool {
    if gray.is_empty() {
        return true;
    }
    let dark_count = gray.iter().filter(|&&p| p < 32).count();
    (dark_count as f32 / gray.len() as f32) > threshold_pct
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}
