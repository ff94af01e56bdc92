use crate::shapes::point::PointF32;

/// Grid cell origins for one SCRFD feature map, row major, each repeated
/// `num_anchors` times back to back.
pub fn anchor_centers(
    width: usize,
    height: usize,
    stride: u32,
    num_anchors: usize,
) -> Vec<PointF32> {
    let stride = stride as f32;
    let mut centers = Vec::with_capacity(width * height * num_anchors);

    for y in 0..height {
        for x in 0..width {
            let p = PointF32::new(x as f32 * stride, y as f32 * stride);
            centers.extend(std::iter::repeat_n(p, num_anchors));
        }
    }

    centers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_layout() {
        let centers = anchor_centers(3, 2, 8, 2);
        assert_eq!(centers.len(), 12);
        assert_eq!(centers[0], PointF32::new(0., 0.));
        assert_eq!(centers[1], PointF32::new(0., 0.));
        assert_eq!(centers[2], PointF32::new(8., 0.));
        assert_eq!(centers[6], PointF32::new(0., 8.));
        assert_eq!(centers[11], PointF32::new(16., 8.));
    }
}
