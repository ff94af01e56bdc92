//! Pick the best quality face out of a batch of images of one subject and
//! produce its biometric record (age, gender, embedding).
//!
//! ```no_run
//! use face_select::config::PreprocessConfig;
//! use face_select::decode::EncodedImage;
//! use face_select::pipeline::{Analyzer, FaceCandidate, FaceModel};
//!
//! struct NoFaces;
//! impl FaceModel for NoFaces {
//!     fn detect(&self, _img: &image::RgbImage) -> anyhow::Result<Vec<FaceCandidate>> {
//!         Ok(vec![])
//!     }
//! }
//!
//! let analyzer = Analyzer::with_settings(NoFaces, PreprocessConfig::default(), 0.5);
//! let bytes = std::fs::read("face.jpg").unwrap();
//! let outcome = analyzer.analyze(&[EncodedImage::from_bytes(&bytes)]);
//! assert!(outcome.is_err());
//! ```

pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod pipeline;
pub mod preprocess;
pub mod shapes;
