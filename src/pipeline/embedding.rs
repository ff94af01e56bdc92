use super::align::{estimate_similarity, warp_affine};
use super::model::{Session, initialize_model, run};
use crate::shapes::point::PointF32;
use anyhow::{Error, Result};
use image::RgbImage;
use ndarray::Array;
use std::path::Path;
use tracing::{Level, span, trace};

const MODEL_FILE: &str = "w600k_r50.onnx";
const SIZE: u32 = 112;
const INPUT_MEAN: f32 = 127.5;
const INPUT_STD: f32 = 127.5;

// Canonical keypoint positions in a 112x112 ArcFace crop
const TEMPLATE: [PointF32; 5] = [
    PointF32 { x: 38.2946, y: 51.6963 },
    PointF32 { x: 73.5318, y: 51.5014 },
    PointF32 { x: 56.0252, y: 71.7366 },
    PointF32 { x: 41.5493, y: 92.3655 },
    PointF32 { x: 70.7299, y: 92.2041 },
];

pub struct FaceEmbedder {
    model: Session,
}

impl FaceEmbedder {
    pub fn new(models_dir: &Path, threads: usize) -> Result<FaceEmbedder> {
        Ok(FaceEmbedder {
            model: initialize_model(models_dir, MODEL_FILE, threads)?,
        })
    }

    /// Raw (not L2 normalized) embedding of the face with keypoints `kps`.
    pub fn run(&self, img: &RgbImage, kps: &[PointF32; 5]) -> Result<Vec<f32>> {
        let span = span!(Level::DEBUG, "embedding");
        let _guard = span.enter();

        let m = estimate_similarity(kps, &TEMPLATE)
            .ok_or_else(|| Error::msg("keypoints too close together to align"))?;
        let aligned = warp_affine(img, &m, SIZE)?;

        let size = SIZE as usize;
        let input = Array::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            (aligned.get_pixel(x as u32, y as u32)[c] as f32 - INPUT_MEAN) / INPUT_STD
        });

        let embedding = run(&self.model, input)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::msg("recognition model returned nothing"))?;
        trace!("Embedding dimensions: {}", embedding.len());

        Ok(embedding)
    }
}
