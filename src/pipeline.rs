use crate::config::{Config, PreprocessConfig};
use crate::decode::{EncodedImage, decode_image};
use crate::encode::{AnalysisResult, encode};
use crate::error::{AnalysisError, ImageError};
use crate::preprocess::preprocess;
use crate::shapes::rect::BBox;
use anyhow::Result;
use image::RgbImage;
use std::time::Instant;
use tracing::{Level, debug, error, info, span, warn};
use uuid::Uuid;

mod align;
mod attributes;
mod detection;
mod embedding;
mod insightface;
mod model;

pub use insightface::InsightFace;

/// A single face as reported by a [`FaceModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct FaceCandidate {
    pub bounds: BBox,
    pub score: f32,
    pub age: i32,
    pub gender: i32,
    pub embedding: Vec<f32>,
}

/// Face detection plus attribute estimation for one image.
///
/// Implementations must not keep per-call state that changes later results.
pub trait FaceModel {
    fn detect(&self, img: &RgbImage) -> Result<Vec<FaceCandidate>>;
}

impl<M: FaceModel + ?Sized> FaceModel for &M {
    fn detect(&self, img: &RgbImage) -> Result<Vec<FaceCandidate>> {
        (**self).detect(img)
    }
}

impl<M: FaceModel + ?Sized> FaceModel for Box<M> {
    fn detect(&self, img: &RgbImage) -> Result<Vec<FaceCandidate>> {
        (**self).detect(img)
    }
}

/// Keep the face with the biggest box. Earlier faces win ties.
pub fn largest_face(faces: Vec<FaceCandidate>) -> Option<FaceCandidate> {
    faces.into_iter().fold(None, |best, face| match best {
        Some(b) if b.bounds.area() >= face.bounds.area() => Some(b),
        _ => Some(face),
    })
}

/// Running best candidate while a batch is scanned.
#[derive(Debug, Default)]
pub struct Selection {
    best_score: f32,
    best: Option<FaceCandidate>,
}

#[derive(Debug, PartialEq)]
pub enum ScanOutcome {
    Found(FaceCandidate),
    NotFound,
}

impl Selection {
    /// Replaces the current best only on a strictly greater score.
    /// Returns whether the candidate was kept.
    pub fn offer(&mut self, candidate: FaceCandidate) -> bool {
        if candidate.score > self.best_score {
            self.best_score = candidate.score;
            self.best = Some(candidate);
            true
        } else {
            false
        }
    }

    pub fn best_score(&self) -> f32 {
        self.best_score
    }

    pub fn finish(self) -> ScanOutcome {
        match self.best {
            Some(c) => ScanOutcome::Found(c),
            None => ScanOutcome::NotFound,
        }
    }
}

pub struct Analyzer<M> {
    model: M,
    preprocess: PreprocessConfig,
    min_confidence: f32,
}

impl<M: FaceModel> Analyzer<M> {
    pub fn new(model: M, config: &Config) -> Analyzer<M> {
        Analyzer::with_settings(model, config.preprocess, config.min_confidence)
    }

    pub fn with_settings(
        model: M,
        preprocess: PreprocessConfig,
        min_confidence: f32,
    ) -> Analyzer<M> {
        Analyzer {
            model,
            preprocess,
            min_confidence,
        }
    }

    /// Decode, normalize and run the model on one image, reducing its faces
    /// to the largest one.
    pub fn process_image(&self, img: &EncodedImage) -> Result<Option<FaceCandidate>, ImageError> {
        let pixels = decode_image(img)?;
        let normalized = preprocess(&pixels, &self.preprocess);
        let faces = self.model.detect(&normalized).map_err(ImageError::Model)?;
        debug!("Model found {} faces", faces.len());

        Ok(largest_face(faces))
    }

    /// Scan the batch in order, keeping the highest scoring face. A failing
    /// image counts as an image without a face.
    pub fn select(&self, images: &[EncodedImage]) -> ScanOutcome {
        images
            .iter()
            .enumerate()
            .fold(Selection::default(), |mut selection, (idx, img)| {
                let n = idx + 1;
                let span = span!(Level::DEBUG, "image", n);
                let _guard = span.enter();

                match self.process_image(img) {
                    Ok(Some(face)) => {
                        let (score, age, gender) = (face.score, face.age, face.gender);
                        if selection.offer(face) {
                            info!(age, gender, score, "Image {n} is the best so far");
                        } else {
                            debug!(
                                "Image {n}: score {score} does not beat {}",
                                selection.best_score()
                            );
                        }
                    }
                    Ok(None) => warn!("Image {n}: No face detected"),
                    Err(e) => error!("Error processing image {n}: {e}"),
                }

                selection
            })
            .finish()
    }

    pub fn analyze(&self, images: &[EncodedImage]) -> Result<AnalysisResult, AnalysisError> {
        let request_id = Uuid::new_v4();
        let span = span!(Level::INFO, "analyze", %request_id);
        let _guard = span.enter();

        info!("Received request with {} images", images.len());
        let start = Instant::now();
        let outcome = self.select(images);
        debug!("Scanned batch in {:?}", start.elapsed());

        let result = encode(outcome, self.min_confidence);
        match &result {
            Ok(_) => info!("Best face analysis result selected"),
            Err(e) => warn!("{e}"),
        }

        result
    }
}

/// Liveness probe payload.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

pub fn health_check() -> HealthStatus {
    HealthStatus { status: "healthy" }
}
