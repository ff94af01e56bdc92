use crate::error::AnalysisError;
use crate::pipeline::ScanOutcome;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Output record for the winning face.
///
/// `encrypted_embedding` is the embedding as a JSON array string. Nothing is
/// encrypted; the name is kept for wire compatibility with existing clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub age: i32,
    pub gender: String,
    pub is_face: bool,
    pub encrypted_embedding: String,
}

pub fn gender_label(code: i32) -> &'static str {
    if code == 1 { "Male" } else { "Female" }
}

/// Gate the scan outcome on `min_confidence` (exclusive) and build the record.
pub fn encode(outcome: ScanOutcome, min_confidence: f32) -> Result<AnalysisResult, AnalysisError> {
    let face = match outcome {
        ScanOutcome::Found(face) if face.score > min_confidence => face,
        ScanOutcome::Found(face) => {
            debug!(
                "Best score {} is not above {min_confidence}",
                face.score
            );
            return Err(AnalysisError::NoValidFace);
        }
        ScanOutcome::NotFound => return Err(AnalysisError::NoValidFace),
    };

    info!("Embedding dimensions: {}", face.embedding.len());
    let encrypted_embedding = serde_json::to_string(&face.embedding)?;
    info!("encrypted_embedding size: {}", encrypted_embedding.len());

    Ok(AnalysisResult {
        age: face.age,
        gender: gender_label(face.gender).to_string(),
        is_face: true,
        encrypted_embedding,
    })
}
