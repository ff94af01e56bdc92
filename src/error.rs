use thiserror::Error;

/// An image payload that could not be turned into pixels.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("empty image payload")]
    Empty,
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unreadable image: {0}")]
    Image(#[from] image::ImageError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure scoped to a single image of a batch. Never aborts the scan.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("face model failed: {0:#}")]
    Model(anyhow::Error),
}

/// Batch level failure surfaced to the caller.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No valid faces detected in any of the images")]
    NoValidFace,
    #[error("could not serialize embedding: {0}")]
    Encode(#[from] serde_json::Error),
}
