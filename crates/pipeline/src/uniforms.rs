//! CPU-side mirror of the shader chain's uniform block.

use bytemuck::{Pod, Zeroable};
use presets::EnhancementParameters;

/// Uniform block bound at `@group(0) @binding(0)`.
///
/// The layout matches the WGSL `ChainParams` struct and observes uniform
/// buffer alignment rules; the trailing pad rounds the block to 32 bytes.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChainUniforms {
    /// Output surface size in physical pixels.
    pub resolution: [f32; 2],
    /// Wall-clock seconds since session start; only the debanding noise
    /// phase consumes this.
    pub time: f32,
    pub debanding: f32,
    pub smoothing: f32,
    pub sharpening: f32,
    pub _padding: [f32; 2],
}

unsafe impl Zeroable for ChainUniforms {}
unsafe impl Pod for ChainUniforms {}

impl ChainUniforms {
    pub fn new(size: (u32, u32), parameters: EnhancementParameters, time: f32) -> Self {
        Self {
            resolution: [size.0 as f32, size.1 as f32],
            time,
            debanding: parameters.debanding,
            smoothing: parameters.smoothing,
            sharpening: parameters.sharpening,
            _padding: [0.0; 2],
        }
    }
}
