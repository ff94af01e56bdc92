use crate::config::PreprocessConfig;
use image::{DynamicImage, GrayImage, RgbImage, imageops};
use imageproc::{contrast, filter};
use tracing::{Level, span, trace};

/// Normalize illumination and noise so the detector sees a steadier image.
///
/// grayscale -> histogram equalization -> gaussian blur -> back to 3 channels.
/// Output has the same dimensions as the input.
pub fn preprocess(img: &RgbImage, config: &PreprocessConfig) -> RgbImage {
    let span = span!(Level::DEBUG, "preprocess");
    let _guard = span.enter();

    // Rec. 709 luma weights, not the BT.601 ones OpenCV's BGR2GRAY uses
    let gray = imageops::grayscale(img);
    let equalized = contrast::equalize_histogram(&gray);

    let kernel = gaussian_kernel(config.blur_kernel, 0.);
    trace!("Blur kernel {kernel:?}");
    let blurred: GrayImage = filter::separable_filter_equal(&equalized, &kernel);

    DynamicImage::ImageLuma8(blurred).into_rgb8()
}

/// Fixed binomial kernels OpenCV uses for sizes 1, 3, 5 and 7 when no sigma
/// is given.
const SMALL_KERNELS: [&[f32]; 4] = [
    &[1.],
    &[0.25, 0.5, 0.25],
    &[0.0625, 0.25, 0.375, 0.25, 0.0625],
    &[0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
];

/// 1D normalized gaussian weights of length `size`.
///
/// With a non-positive sigma this matches OpenCV's `getGaussianKernel`: odd
/// sizes up to 7 use its fixed binomial table, larger sizes derive sigma
/// from the size.
pub fn gaussian_kernel(size: u32, sigma: f32) -> Vec<f32> {
    let size = size.max(1) as usize;
    if sigma <= 0. && size % 2 == 1 && size <= 7 {
        return SMALL_KERNELS[size / 2].to_vec();
    }

    let sigma = if sigma > 0. {
        sigma
    } else {
        0.3 * ((size as f32 - 1.) * 0.5 - 1.) + 0.8
    };

    let center = (size / 2) as f32;
    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2. * sigma * sigma)).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= sum);

    kernel
}
