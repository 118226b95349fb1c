//! Companion picture normalization and republishing.
//!
//! Every source picture is cropped to a 2:3 window along the overflowing axis
//! by repeatedly discarding the lower-entropy edge strip, scaled to fill the
//! 500×750 canvas, and re-encoded as JPEG. Failures are isolated per companion.

use std::io::Cursor;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GrayImage;
use tracing::{info, warn};

use crate::error::{Result, SyncError};
use crate::traits::{ImageFetcher, ObjectSink};
use crate::types::CompanionRecord;

pub const TARGET_WIDTH: u32 = 500;
pub const TARGET_HEIGHT: u32 = 750;
pub const JPEG_QUALITY: u8 = 80;

/// Width (or height) of the strip compared on each trimming step.
const ENTROPY_STRIP: u32 = 10;

/// Blob path of a companion's published picture.
pub fn image_path(companion_id: &str) -> String {
    format!("img/companions/{companion_id}.jpg")
}

/// Decode, cover-fit to the target canvas, and encode as JPEG.
///
/// The crop is chosen in source coordinates and only the kept window is
/// resized, so the intermediate buffer never exceeds the source.
pub fn normalize(raw: &[u8]) -> Result<Vec<u8>> {
    let img = image::load_from_memory(raw)?;
    if img.width() == 0 || img.height() == 0 {
        return Err(SyncError::ImageProcessing("image has no pixels".to_string()));
    }

    let (win_w, win_h) = source_window(img.width(), img.height(), TARGET_WIDTH, TARGET_HEIGHT);
    let strip = ((ENTROPY_STRIP as u64 * win_w as u64) / TARGET_WIDTH as u64).max(1) as u32;
    let (x, y) = crop_window(&img.to_luma8(), win_w, win_h, strip);

    let rgb = img
        .crop_imm(x, y, win_w, win_h)
        .resize_exact(TARGET_WIDTH, TARGET_HEIGHT, FilterType::Lanczos3)
        .to_rgb8();

    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&rgb)?;
    Ok(out.into_inner())
}

/// Largest window with the target aspect ratio that fits inside the source.
fn source_window(width: u32, height: u32, target_w: u32, target_h: u32) -> (u32, u32) {
    let (w, h) = (width as u64, height as u64);
    let (tw, th) = (target_w as u64, target_h as u64);
    if w * th > h * tw {
        let win_w = (h * tw / th).clamp(1, w);
        (win_w as u32, height)
    } else {
        let win_h = (w * th / tw).clamp(1, h);
        (width, win_h as u32)
    }
}

/// Top-left corner of the `win_w`×`win_h` window to keep, trimming `strip`
/// pixels per step.
fn crop_window(gray: &GrayImage, win_w: u32, win_h: u32, strip: u32) -> (u32, u32) {
    let (width, height) = gray.dimensions();
    let step = strip.max(1);

    let (mut left, mut right) = (0, width);
    while right - left > win_w {
        let strip = (right - left - win_w).min(step);
        let head = region_entropy(gray, left, 0, strip, height);
        let tail = region_entropy(gray, right - strip, 0, strip, height);
        if head < tail {
            left += strip;
        } else {
            right -= strip;
        }
    }

    let (mut top, mut bottom) = (0, height);
    while bottom - top > win_h {
        let strip = (bottom - top - win_h).min(step);
        let head = region_entropy(gray, left, top, win_w, strip);
        let tail = region_entropy(gray, left, bottom - strip, win_w, strip);
        if head < tail {
            top += strip;
        } else {
            bottom -= strip;
        }
    }

    (left, top)
}

/// Shannon entropy (bits) of the luminance histogram over a rectangle.
fn region_entropy(gray: &GrayImage, x0: u32, y0: u32, w: u32, h: u32) -> f64 {
    let mut histogram = [0u64; 256];
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            histogram[gray.get_pixel(x, y)[0] as usize] += 1;
        }
    }

    let total = (w as u64 * h as u64) as f64;
    if total == 0.0 {
        return 0.0;
    }
    histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Outcome of one refresh pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImageStats {
    pub refreshed: u32,
    pub failed: u32,
}

/// Downloads, normalizes and republishes companion pictures.
pub struct ImageRefresher {
    fetcher: Arc<dyn ImageFetcher>,
    sink: Arc<dyn ObjectSink>,
    /// Pictures processed at once. 1 keeps processing sequential.
    concurrency: usize,
}

impl ImageRefresher {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, sink: Arc<dyn ObjectSink>, concurrency: usize) -> Self {
        Self {
            fetcher,
            sink,
            concurrency: concurrency.max(1),
        }
    }

    /// Refresh one companion's picture. Companions without a picture are a no-op.
    pub async fn refresh(&self, companion: &CompanionRecord) -> Result<()> {
        let Some(url) = companion.primary_image() else {
            return Ok(());
        };

        let raw = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|e| SyncError::ImageProcessing(format!("download failed: {e}")))?;

        let jpeg = tokio::task::spawn_blocking(move || normalize(&raw))
            .await
            .map_err(|e| SyncError::ImageProcessing(format!("resize task failed: {e}")))??;

        self.sink
            .put(&image_path(&companion.id), jpeg, "image/jpeg")
            .await
            .map_err(|e| SyncError::ImageProcessing(format!("upload failed: {e}")))
    }

    /// Refresh every companion. A failure is logged and counted, never propagated.
    pub async fn refresh_all(&self, companions: &[&CompanionRecord]) -> ImageStats {
        info!(count = companions.len(), concurrency = self.concurrency, "Refreshing pictures");

        let results: Vec<bool> = stream::iter(companions.iter().copied())
            .map(|companion| async move {
                match self.refresh(companion).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(
                            companion = companion.name.as_str(),
                            error = %e,
                            "Something went wrong with picture"
                        );
                        false
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let refreshed = results.iter().filter(|ok| **ok).count() as u32;
        let stats = ImageStats {
            refreshed,
            failed: results.len() as u32 - refreshed,
        };
        info!(refreshed = stats.refreshed, failed = stats.failed, "Pictures refreshed");
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Luma, Rgb, RgbImage};

    fn encode_png(img: RgbImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn source_window_keeps_target_aspect() {
        // landscape: full height, 2:3 slice of the width
        assert_eq!(source_window(2000, 1000, 500, 750), (666, 1000));
        // portrait narrower than 2:3: full width, trimmed height
        assert_eq!(source_window(1000, 3000, 500, 750), (1000, 1500));
        // exact aspect
        assert_eq!(source_window(1000, 1500, 500, 750), (1000, 1500));
        // small images are upscaled later, not here
        assert_eq!(source_window(100, 150, 500, 750), (100, 150));
    }

    #[test]
    fn source_window_of_extreme_aspect_stays_inside_source() {
        assert_eq!(source_window(1, 3000, 500, 750), (1, 1));
        assert_eq!(source_window(3000, 1, 500, 750), (1, 1));
    }

    #[test]
    fn crop_keeps_the_detailed_region() {
        // flat on the left, checkerboard from x=700 onward
        let gray = GrayImage::from_fn(1200, 750, |x, y| {
            if x >= 700 && (x + y) % 2 == 0 {
                Luma([255])
            } else if x >= 700 {
                Luma([0])
            } else {
                Luma([128])
            }
        });

        assert_eq!(crop_window(&gray, 500, 750, 10), (700, 0));
    }

    #[test]
    fn crop_on_flat_image_is_deterministic() {
        let gray = GrayImage::from_pixel(500, 1000, Luma([40]));
        assert_eq!(crop_window(&gray, 500, 750, 10), (0, 0));
        assert_eq!(crop_window(&gray, 500, 750, 10), crop_window(&gray, 500, 750, 10));
    }

    #[test]
    fn entropy_of_flat_region_is_zero() {
        let gray = GrayImage::from_pixel(20, 20, Luma([7]));
        assert_eq!(region_entropy(&gray, 0, 0, 20, 20), 0.0);

        let halves = GrayImage::from_fn(20, 20, |x, _| Luma([if x < 10 { 0 } else { 255 }]));
        assert!((region_entropy(&halves, 0, 0, 20, 20) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn normalize_produces_fixed_size_jpeg() {
        let png = encode_png(RgbImage::from_fn(900, 600, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 90])
        }));

        let jpeg = normalize(&png).unwrap();

        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (TARGET_WIDTH, TARGET_HEIGHT));
    }

    #[test]
    fn sliver_source_normalizes_without_blowing_up() {
        let png = encode_png(RgbImage::from_fn(1, 3000, |_, y| Rgb([(y % 256) as u8, 10, 200])));

        let jpeg = normalize(&png).unwrap();

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (TARGET_WIDTH, TARGET_HEIGHT));
    }

    #[test]
    fn garbage_bytes_are_an_image_error() {
        let err = normalize(b"definitely not an image").unwrap_err();
        assert!(matches!(err, SyncError::ImageProcessing(_)));
    }

    #[test]
    fn image_path_is_keyed_by_id() {
        assert_eq!(image_path("abc-123"), "img/companions/abc-123.jpg");
    }
}
