use super::model::{Session, initialize_model, run};
use crate::shapes::point::PointF32;
use crate::shapes::rect::BBox;
use anchors::anchor_centers;
use anyhow::{Error, Result};
use image::RgbImage;
use image::imageops::{self, FilterType};
use ndarray::Array;
use std::path::Path;
use tracing::{Level, span, trace};

mod anchors;

const MODEL_FILE: &str = "det_10g.onnx";
const STRIDES: [u32; 3] = [8, 16, 32];
const NUM_ANCHORS: usize = 2;
const NMS_THRESHOLD: f32 = 0.4;
const INPUT_MEAN: f32 = 127.5;
const INPUT_STD: f32 = 128.;

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bounds: BBox,
    pub score: f32,
    /// left eye, right eye, nose, left mouth corner, right mouth corner
    pub kps: [PointF32; 5],
}

pub struct FaceDetector {
    model: Session,
    size: u32,
    threshold: f32,
}

impl FaceDetector {
    /*
    SCRFD wrapper.

    Model Input: 1x3xSxS f32, image letterboxed into the top left corner
    Model Output, for each stride 8, 16, 32 in that order:
    - scores    (N x 1)
    - box dists (N x 4) left, top, right, bottom, in stride units
    - kps dists (N x 10)

    N is (S / stride)^2 * 2, two anchors per grid cell. Outputs are
    grouped scores first, then boxes, then keypoints.
     */
    pub fn new(
        models_dir: &Path,
        size: u32,
        threshold: f32,
        threads: usize,
    ) -> Result<FaceDetector> {
        Ok(FaceDetector {
            model: initialize_model(models_dir, MODEL_FILE, threads)?,
            size,
            threshold,
        })
    }

    pub fn run(&self, img: &RgbImage) -> Result<Vec<Detection>> {
        let span = span!(Level::DEBUG, "face_detector");
        let _guard = span.enter();

        let (input_img, det_scale) = letterbox(img, self.size);
        let size = self.size as usize;
        let input = Array::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            (input_img.get_pixel(x as u32, y as u32)[c] as f32 - INPUT_MEAN) / INPUT_STD
        });

        let outputs = run(&self.model, input)?;
        let mut detections = decode(&outputs, self.size, self.threshold)?;
        for d in detections.iter_mut() {
            d.bounds.scale(1. / det_scale);
            for p in d.kps.iter_mut() {
                p.x /= det_scale;
                p.y /= det_scale;
            }
        }

        let results = nms(detections, NMS_THRESHOLD);
        trace!("Detected {} faces", results.len());

        Ok(results)
    }
}

/// Resize keeping aspect ratio so the long side is `size`, pasted into the
/// top left of a black `size`x`size` canvas. Returns the canvas and the scale
/// applied to the source.
fn letterbox(img: &RgbImage, size: u32) -> (RgbImage, f32) {
    let (w, h) = img.dimensions();
    let im_ratio = h as f32 / w as f32;
    let (new_w, new_h) = if im_ratio > 1. {
        ((size as f32 / im_ratio) as u32, size)
    } else {
        (size, (size as f32 * im_ratio) as u32)
    };
    let (new_w, new_h) = (new_w.max(1), new_h.max(1));
    let det_scale = new_h as f32 / h as f32;

    let resized = imageops::resize(img, new_w, new_h, FilterType::Triangle);
    let mut canvas = RgbImage::new(size, size);
    imageops::replace(&mut canvas, &resized, 0, 0);

    (canvas, det_scale)
}

fn decode(outputs: &[Vec<f32>], size: u32, threshold: f32) -> Result<Vec<Detection>> {
    let fmc = STRIDES.len();
    if outputs.len() != fmc * 3 {
        return Err(Error::msg(format!(
            "expected {} detector outputs (scores, boxes, keypoints), got {}",
            fmc * 3,
            outputs.len()
        )));
    }

    let mut detections = Vec::new();
    for (i, stride) in STRIDES.into_iter().enumerate() {
        let scores = &outputs[i];
        let boxes = &outputs[i + fmc];
        let kps = &outputs[i + fmc * 2];

        let grid = (size / stride) as usize;
        let centers = anchor_centers(grid, grid, stride, NUM_ANCHORS);
        if scores.len() != centers.len()
            || boxes.len() != centers.len() * 4
            || kps.len() != centers.len() * 10
        {
            return Err(Error::msg(format!(
                "stride {stride}: unexpected output sizes {}/{}/{} for {} anchors",
                scores.len(),
                boxes.len(),
                kps.len(),
                centers.len()
            )));
        }

        let s = stride as f32;
        for (idx, c) in centers.iter().enumerate() {
            let score = scores[idx];
            if score < threshold {
                continue;
            }

            let b = &boxes[idx * 4..idx * 4 + 4];
            let bounds = BBox::new(
                c.x - b[0] * s,
                c.y - b[1] * s,
                c.x + b[2] * s,
                c.y + b[3] * s,
            );

            let k = &kps[idx * 10..idx * 10 + 10];
            let kps = std::array::from_fn(|j| {
                PointF32::new(c.x + k[j * 2] * s, c.y + k[j * 2 + 1] * s)
            });

            detections.push(Detection { bounds, score, kps });
        }
    }

    Ok(detections)
}

/// Greedy non-maximum suppression, highest score first.
fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Detection> = Vec::new();
    for d in detections {
        if kept.iter().all(|k| k.bounds.iou(&d.bounds) <= iou_threshold) {
            kept.push(d);
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: u32 = 64;

    // strides 8, 16, 32 over 64px: 8x8, 4x4, 2x2 grids, 2 anchors each
    fn empty_outputs() -> Vec<Vec<f32>> {
        let counts = [128, 32, 8];
        let mut outputs: Vec<Vec<f32>> = counts.iter().map(|n| vec![0.; *n]).collect();
        outputs.extend(counts.iter().map(|n| vec![0.; n * 4]));
        outputs.extend(counts.iter().map(|n| vec![0.; n * 10]));
        outputs
    }

    fn set_anchor(outputs: &mut [Vec<f32>], level: usize, idx: usize, score: f32, dist: [f32; 4]) {
        outputs[level][idx] = score;
        outputs[level + 3][idx * 4..idx * 4 + 4].copy_from_slice(&dist);
        outputs[level + 6][idx * 10..idx * 10 + 10].fill(0.5);
    }

    #[test]
    fn test_decode_distances() {
        let mut outputs = empty_outputs();
        // stride 8, cell x=2 y=1, anchor 0 -> center (16, 8)
        set_anchor(&mut outputs, 0, 20, 0.9, [1., 1., 2., 2.]);

        let detections = decode(&outputs, SIZE, 0.5).unwrap();
        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        assert_eq!(d.bounds, BBox::new(8., 0., 32., 24.));
        assert_eq!(d.score, 0.9);
        assert_eq!(d.kps[0], PointF32::new(20., 12.));
    }

    #[test]
    fn test_decode_thresholds() {
        let mut outputs = empty_outputs();
        set_anchor(&mut outputs, 0, 20, 0.3, [1., 1., 1., 1.]);
        // stride 32, last cell
        set_anchor(&mut outputs, 2, 7, 0.6, [0.5, 0.5, 0.5, 0.5]);

        let detections = decode(&outputs, SIZE, 0.5).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].bounds, BBox::new(16., 16., 48., 48.));
    }

    #[test]
    fn test_decode_rejects_bad_shapes() {
        let outputs = empty_outputs();
        assert!(decode(&outputs[..6], SIZE, 0.5).is_err());
        assert!(decode(&outputs, 128, 0.5).is_err());
    }

    #[test]
    fn test_nms_drops_overlaps() {
        let det = |score, x1| Detection {
            bounds: BBox::new(x1, 0., x1 + 10., 10.),
            score,
            kps: [PointF32::default(); 5],
        };
        let kept = nms(vec![det(0.7, 1.), det(0.9, 0.), det(0.8, 50.)], NMS_THRESHOLD);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.9);
        assert_eq!(kept[1].score, 0.8);
    }

    #[test]
    fn test_letterbox_landscape() {
        let img = RgbImage::from_pixel(200, 100, image::Rgb([255, 255, 255]));
        let (canvas, scale) = letterbox(&img, SIZE);
        assert_eq!(canvas.dimensions(), (SIZE, SIZE));
        assert!((scale - 0.32).abs() < 1e-6);
        assert_eq!(canvas.get_pixel(10, 10)[0], 255);
        assert_eq!(canvas.get_pixel(10, 40)[0], 0);
    }

    #[test]
    fn test_letterbox_portrait() {
        let img = RgbImage::new(50, 100);
        let (_, scale) = letterbox(&img, SIZE);
        assert!((scale - 0.64).abs() < 1e-6);
    }
}
