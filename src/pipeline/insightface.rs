use super::attributes::AttributeEstimator;
use super::detection::FaceDetector;
use super::embedding::FaceEmbedder;
use super::{FaceCandidate, FaceModel};
use crate::config::ModelConfig;
use anyhow::Result;
use image::RgbImage;
use std::time::Instant;
use tracing::{Level, debug, info, span};

/// InsightFace style model bundle: SCRFD detection, gender/age estimation
/// and ArcFace embeddings, all through ONNX Runtime.
///
/// Load once at startup and share across requests.
pub struct InsightFace {
    detector: FaceDetector,
    attributes: AttributeEstimator,
    embedder: FaceEmbedder,
}

impl InsightFace {
    pub fn new(config: &ModelConfig) -> Result<InsightFace> {
        ort::init().with_name("face-select").commit()?;

        let threads = config.threads();
        let dir = config.models_dir.as_path();
        info!("Loading face models from {} with {threads} threads", dir.display());

        Ok(InsightFace {
            detector: FaceDetector::new(dir, config.det_size, config.det_threshold, threads)?,
            attributes: AttributeEstimator::new(dir, threads)?,
            embedder: FaceEmbedder::new(dir, threads)?,
        })
    }
}

impl FaceModel for InsightFace {
    fn detect(&self, img: &RgbImage) -> Result<Vec<FaceCandidate>> {
        let span = span!(Level::DEBUG, "insightface");
        let _guard = span.enter();

        let start = Instant::now();
        let detections = self.detector.run(img)?;
        debug!("Took {:?} to detect {} faces", start.elapsed(), detections.len());

        detections
            .into_iter()
            .map(|d| -> Result<FaceCandidate> {
                let attrs = self.attributes.run(img, &d.bounds)?;
                let embedding = self.embedder.run(img, &d.kps)?;

                Ok(FaceCandidate {
                    bounds: d.bounds,
                    score: d.score,
                    age: attrs.age,
                    gender: attrs.gender,
                    embedding,
                })
            })
            .collect()
    }
}
