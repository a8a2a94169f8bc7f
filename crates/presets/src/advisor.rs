//! Advisory preset recommendation.
//!
//! The pipeline's behaviour is fully determined by the parameters it is
//! given; how those parameters were chosen is external policy. This module
//! hosts the pluggable policy seam plus a simple heuristic implementation.
//! The thresholds are empirical, tuned against typical streaming ladders,
//! and intentionally not part of any tested pipeline contract.

use crate::{builtin_presets, Preset};

/// Coarse description of a source used to pick a starting preset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceProfile {
    pub width: u32,
    pub height: u32,
    /// Average stream bitrate when known.
    pub bitrate_kbps: Option<f32>,
}

impl SourceProfile {
    pub fn pixel_area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Pluggable recommendation policy.
pub trait PresetAdvisor {
    /// Suggests a preset for the given source, or `None` to leave the
    /// current selection alone.
    fn recommend(&self, profile: &SourceProfile) -> Option<Preset>;
}

/// Bitrate-per-pixel heuristic: starved encodes get stronger cleanup.
pub struct HeuristicAdvisor;

impl PresetAdvisor for HeuristicAdvisor {
    fn recommend(&self, profile: &SourceProfile) -> Option<Preset> {
        let area = profile.pixel_area();
        if area == 0 {
            return None;
        }

        let name = match profile.bitrate_kbps {
            Some(kbps) => {
                let bits_per_pixel = kbps * 1000.0 / area as f32;
                if bits_per_pixel < 0.04 {
                    "strong"
                } else if bits_per_pixel < 0.09 {
                    "medium"
                } else {
                    "light"
                }
            }
            // No bitrate signal: lean on resolution alone.
            None if area <= 640 * 360 => "strong",
            None if area <= 1280 * 720 => "medium",
            None => "light",
        };

        builtin_presets()
            .into_iter()
            .find(|preset| preset.name == name)
    }
}
