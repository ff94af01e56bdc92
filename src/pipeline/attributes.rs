use super::align::{center_crop_transform, warp_affine};
use super::model::{Session, initialize_model, run};
use crate::shapes::rect::BBox;
use anyhow::{Error, Result};
use image::RgbImage;
use ndarray::Array;
use std::path::Path;
use tracing::{Level, span, trace};

const MODEL_FILE: &str = "genderage.onnx";
const SIZE: u32 = 96;
// crop spans 1.5x the longest face edge
const CROP_MARGIN: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    pub age: i32,
    /// 1 male, 0 female
    pub gender: i32,
}

pub struct AttributeEstimator {
    model: Session,
}

impl AttributeEstimator {
    pub fn new(models_dir: &Path, threads: usize) -> Result<AttributeEstimator> {
        Ok(AttributeEstimator {
            model: initialize_model(models_dir, MODEL_FILE, threads)?,
        })
    }

    pub fn run(&self, img: &RgbImage, bounds: &BBox) -> Result<Attributes> {
        let span = span!(Level::DEBUG, "attributes");
        let _guard = span.enter();

        let edge = bounds.width().max(bounds.height()) * CROP_MARGIN;
        if edge <= 0. {
            return Err(Error::msg(format!("empty face box {bounds:?}")));
        }

        let m = center_crop_transform(bounds.center(), SIZE as f32 / edge, SIZE);
        let crop = warp_affine(img, &m, SIZE)?;

        // raw 0-255 values, no normalization
        let size = SIZE as usize;
        let input = Array::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            crop.get_pixel(x as u32, y as u32)[c] as f32
        });

        let outputs = run(&self.model, input)?;
        let attrs = outputs
            .first()
            .ok_or_else(|| Error::msg("gender/age model returned nothing"))
            .and_then(|o| interpret(o))?;
        trace!("{attrs:?}");

        Ok(attrs)
    }
}

/// `[female, male, age / 100]`
fn interpret(output: &[f32]) -> Result<Attributes> {
    if output.len() < 3 {
        return Err(Error::msg(format!(
            "expected 3 gender/age values, got {}",
            output.len()
        )));
    }

    Ok(Attributes {
        gender: if output[1] > output[0] { 1 } else { 0 },
        age: (output[2] * 100.).round() as i32,
    })
}
