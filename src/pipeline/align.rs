use crate::shapes::point::PointF32;
use anyhow::{Error, Result};
use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};

/// Row major 2x3 affine matrix mapping source pixels to output pixels.
pub type Affine = [f32; 6];

/// Least squares similarity transform (rotation, uniform scale,
/// translation) taking `src` onto `dst`. `None` when `src` is degenerate.
pub fn estimate_similarity(src: &[PointF32], dst: &[PointF32]) -> Option<Affine> {
    let n = src.len().min(dst.len());
    if n < 2 {
        return None;
    }

    let mean = |pts: &[PointF32]| {
        let (sx, sy) = pts[..n]
            .iter()
            .fold((0., 0.), |(sx, sy), p| (sx + p.x, sy + p.y));
        PointF32::new(sx / n as f32, sy / n as f32)
    };
    let src_mean = mean(src);
    let dst_mean = mean(dst);

    let (mut a, mut b, mut norm) = (0f32, 0f32, 0f32);
    for (p, q) in src.iter().zip(dst.iter()).take(n) {
        let (px, py) = (p.x - src_mean.x, p.y - src_mean.y);
        let (qx, qy) = (q.x - dst_mean.x, q.y - dst_mean.y);
        a += px * qx + py * qy;
        b += px * qy - py * qx;
        norm += px * px + py * py;
    }

    if norm <= f32::EPSILON {
        return None;
    }

    let (c, s) = (a / norm, b / norm);
    let tx = dst_mean.x - (c * src_mean.x - s * src_mean.y);
    let ty = dst_mean.y - (s * src_mean.x + c * src_mean.y);

    Some([c, -s, tx, s, c, ty])
}

/// Scale about `center` then move it to the middle of a `size` square.
pub fn center_crop_transform(center: PointF32, scale: f32, size: u32) -> Affine {
    let half = size as f32 / 2.;
    [
        scale,
        0.,
        half - scale * center.x,
        0.,
        scale,
        half - scale * center.y,
    ]
}

/// Sample a `size`x`size` image through `m`, black outside the source.
pub fn warp_affine(img: &RgbImage, m: &Affine, size: u32) -> Result<RgbImage> {
    let projection = Projection::from_matrix([m[0], m[1], m[2], m[3], m[4], m[5], 0., 0., 1.])
        .ok_or_else(|| Error::msg("alignment transform is not invertible"))?;

    let mut out = RgbImage::new(size, size);
    warp_into(img, &projection, Interpolation::Bilinear, Rgb([0, 0, 0]), &mut out);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(m: &Affine, p: PointF32) -> PointF32 {
        PointF32::new(
            m[0] * p.x + m[1] * p.y + m[2],
            m[3] * p.x + m[4] * p.y + m[5],
        )
    }

    #[test]
    fn test_recovers_known_similarity() {
        let theta = 30f32.to_radians();
        let (scale, tx, ty) = (1.7, 5., -3.);
        let known: Affine = [
            scale * theta.cos(),
            -scale * theta.sin(),
            tx,
            scale * theta.sin(),
            scale * theta.cos(),
            ty,
        ];

        let src = [
            PointF32::new(30., 40.),
            PointF32::new(70., 41.),
            PointF32::new(50., 60.),
            PointF32::new(35., 80.),
            PointF32::new(66., 79.),
        ];
        let dst: Vec<PointF32> = src.iter().map(|p| apply(&known, *p)).collect();

        let m = estimate_similarity(&src, &dst).unwrap();
        for (a, b) in m.iter().zip(known.iter()) {
            assert!((a - b).abs() < 1e-3, "{m:?} vs {known:?}");
        }
    }

    #[test]
    fn test_degenerate_points() {
        let p = PointF32::new(3., 3.);
        assert!(estimate_similarity(&[p, p, p], &[p, p, p]).is_none());
        assert!(estimate_similarity(&[p], &[p]).is_none());
    }

    #[test]
    fn test_center_crop_transform() {
        let m = center_crop_transform(PointF32::new(100., 50.), 0.5, 96);
        assert_eq!(apply(&m, PointF32::new(100., 50.)), PointF32::new(48., 48.));
        assert_eq!(apply(&m, PointF32::new(120., 50.)), PointF32::new(58., 48.));
    }

    #[test]
    fn test_warp_output_size_and_fill() {
        let img = RgbImage::from_pixel(40, 40, Rgb([200, 100, 50]));
        // shrink by half around the image center into a 40px square
        let m = center_crop_transform(PointF32::new(20., 20.), 0.5, 40);
        let out = warp_affine(&img, &m, 40).unwrap();

        assert_eq!(out.dimensions(), (40, 40));
        let mid = out.get_pixel(20, 20);
        assert!((mid[0] as i32 - 200).abs() <= 1);
        assert!((mid[1] as i32 - 100).abs() <= 1);
        assert_eq!(out.get_pixel(1, 1), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_warp_rejects_singular() {
        let img = RgbImage::new(4, 4);
        assert!(warp_affine(&img, &[0., 0., 0., 0., 0., 0.], 4).is_err());
    }
}
