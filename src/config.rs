use anyhow::{Error, Result};
use clap::Args;
use std::path::PathBuf;

/// A candidate must score strictly above this to be accepted.
pub const MIN_CONFIDENCE: f32 = 0.5;
/// Square input edge the detector letterboxes every image into.
pub const DET_SIZE: u32 = 640;
/// Coarsest detector stride. The input edge must divide evenly by it so every
/// stride's score map lines up with its anchor grid.
pub const DET_SIZE_ALIGN: u32 = 32;
/// Per-anchor score cutoff applied inside the detector.
pub const DET_THRESHOLD: f32 = 0.5;
/// Gaussian blur kernel edge, in pixels. Must be odd.
pub const BLUR_KERNEL: u32 = 5;

#[derive(Args, Debug, Clone)]
pub struct ModelConfig {
    /// Directory holding det_10g.onnx, genderage.onnx and w600k_r50.onnx
    #[arg(long, env = "FACE_SELECT_MODELS_DIR", default_value = "./models")]
    pub models_dir: PathBuf,

    /// Detector input size (square)
    #[arg(long, env = "FACE_SELECT_DET_SIZE", default_value_t = DET_SIZE)]
    pub det_size: u32,

    /// Minimum per-anchor detector score
    #[arg(long, env = "FACE_SELECT_DET_THRESHOLD", default_value_t = DET_THRESHOLD)]
    pub det_threshold: f32,

    /// ONNX intra-op threads. Defaults to half the logical CPUs
    #[arg(long, env = "FACE_SELECT_THREADS")]
    pub threads: Option<usize>,
}

impl ModelConfig {
    pub fn threads(&self) -> usize {
        self.threads.unwrap_or(num_cpus::get() / 2).max(1)
    }
}

#[derive(Args, Debug, Clone, Copy)]
pub struct PreprocessConfig {
    /// Gaussian blur kernel size (odd)
    #[arg(long, env = "FACE_SELECT_BLUR_KERNEL", default_value_t = BLUR_KERNEL)]
    pub blur_kernel: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        PreprocessConfig {
            blur_kernel: BLUR_KERNEL,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct Config {
    #[command(flatten)]
    pub model: ModelConfig,

    #[command(flatten)]
    pub preprocess: PreprocessConfig,

    /// Best face must score above this to be returned
    #[arg(long, env = "FACE_SELECT_MIN_CONFIDENCE", default_value_t = MIN_CONFIDENCE)]
    pub min_confidence: f32,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let k = self.preprocess.blur_kernel;
        if k == 0 || k % 2 == 0 {
            return Err(Error::msg(format!(
                "blur kernel must be a positive odd number, got {k}"
            )));
        }
        if self.model.det_size == 0 {
            return Err(Error::msg("detector size must be non-zero"));
        }
        if self.model.det_size % DET_SIZE_ALIGN != 0 {
            return Err(Error::msg(format!(
                "detector size must be a multiple of {DET_SIZE_ALIGN}, got {}",
                self.model.det_size
            )));
        }
        for (name, v) in [
            ("min confidence", self.min_confidence),
            ("detector threshold", self.model.det_threshold),
        ] {
            if !(0. ..=1.).contains(&v) {
                return Err(Error::msg(format!("{name} must be within [0, 1], got {v}")));
            }
        }

        Ok(())
    }
}
