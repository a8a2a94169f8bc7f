//! Demo frame sources for the preview window.
//!
//! Real deployments feed the pipeline decoded video; the preview makes do
//! with two stand-ins that exercise the chain: a slowly scrolling
//! low-contrast gradient whose coarse quantisation shows banding clearly,
//! and a still image looped as the latest frame.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use pipeline::{FrameRef, FrameSource, OverlayAnchor, Rect, SourceId};

/// Quantisation step for the test pattern, in 8-bit code values. Coarse
/// enough that the banding is obvious at default monitor brightness.
const BAND_STEP: u8 = 16;

/// Byte length of an RGBA8 frame, widened before multiplying so sizes near
/// the GPU texture limit cannot overflow `u32`.
fn rgba_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

/// Animated dark gradient with deliberate banding.
pub struct TestPatternSource {
    id: SourceId,
    width: u32,
    height: u32,
    started: Instant,
    frame: Vec<u8>,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            id: SourceId::new("test-pattern"),
            width,
            height,
            started: Instant::now(),
            frame: vec![0u8; rgba_len(width, height)],
        }
    }

    fn fill(&mut self) {
        let width = self.width.max(1);
        let phase = (self.started.elapsed().as_secs_f32() * 8.0) as u32 % width;
        let step = u32::from(BAND_STEP);
        for y in 0..self.height {
            for x in 0..self.width {
                // Shallow 96-code ramp, quantised onto band boundaries.
                let ramp = (x + phase) * 96 / width % 96;
                let value = (16 + ramp / step * step) as u8;
                let offset = (y as usize * self.width as usize + x as usize) * 4;
                self.frame[offset] = value;
                self.frame[offset + 1] = value;
                self.frame[offset + 2] = value.saturating_add(8);
                self.frame[offset + 3] = 255;
            }
        }
    }
}

impl FrameSource for TestPatternSource {
    fn id(&self) -> SourceId {
        self.id.clone()
    }

    fn intrinsic_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn pull_frame(&mut self) -> Option<FrameRef<'_>> {
        self.fill();
        Some(FrameRef {
            width: self.width,
            height: self.height,
            pixels: &self.frame,
        })
    }

    fn is_live(&self) -> bool {
        true
    }
}

impl OverlayAnchor for TestPatternSource {
    fn display_rect(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    fn has_positioning_context(&self) -> bool {
        // The preview window is its own reference frame.
        true
    }

    fn establish_positioning_context(&mut self) {}
}

/// A decoded still image served as the latest frame forever.
pub struct ImageSource {
    id: SourceId,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ImageSource {
    pub fn load(path: &Path) -> Result<Self> {
        let decoded = image::open(path)
            .with_context(|| format!("failed to decode image at {}", path.display()))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        Ok(Self {
            id: SourceId::new(format!("image:{}", path.display())),
            width,
            height,
            pixels: decoded.into_raw(),
        })
    }
}

impl FrameSource for ImageSource {
    fn id(&self) -> SourceId {
        self.id.clone()
    }

    fn intrinsic_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn pull_frame(&mut self) -> Option<FrameRef<'_>> {
        Some(FrameRef {
            width: self.width,
            height: self.height,
            pixels: &self.pixels,
        })
    }

    fn is_live(&self) -> bool {
        true
    }
}

impl OverlayAnchor for ImageSource {
    fn display_rect(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    fn has_positioning_context(&self) -> bool {
        true
    }

    fn establish_positioning_context(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_fills_a_full_rgba_frame() {
        let mut source = TestPatternSource::new(64, 32);
        let frame = source.pull_frame().expect("pattern is always ready");
        assert_eq!(frame.width, 64);
        assert_eq!(frame.height, 32);
        assert_eq!(frame.pixels.len(), 64 * 32 * 4);
        assert!(frame.pixels.chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn test_pattern_values_land_on_band_boundaries() {
        let mut source = TestPatternSource::new(128, 8);
        let frame = source.pull_frame().unwrap();
        for px in frame.pixels.chunks_exact(4) {
            assert_eq!((px[0] - 16) % BAND_STEP, 0, "red channel off-band");
            assert_eq!(px[0], px[1], "pattern is near-achromatic");
        }
    }

    #[test]
    fn frame_length_survives_sizes_past_u32_pixels() {
        assert_eq!(rgba_len(80_000, 80_000), 25_600_000_000);
        assert_eq!(rgba_len(0, 80_000), 0);
    }
}
