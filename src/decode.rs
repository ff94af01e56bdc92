use crate::error::DecodeError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageReader, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// One base64 encoded image of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedImage(String);

impl EncodedImage {
    pub fn new(payload: impl Into<String>) -> EncodedImage {
        EncodedImage(payload.into())
    }

    pub fn from_bytes(bytes: &[u8]) -> EncodedImage {
        EncodedImage(STANDARD.encode(bytes))
    }

    /// Payload with whitespace and any `data:*;base64,` prefix removed.
    fn payload(&self) -> &str {
        let s = self.0.trim();
        match s.strip_prefix("data:") {
            Some(rest) => rest.split_once(',').map_or(rest, |(_, data)| data),
            None => s,
        }
    }
}

pub fn decode_image(img: &EncodedImage) -> Result<RgbImage, DecodeError> {
    // line-wrapped (MIME style) payloads carry whitespace inside the data
    let payload: String = img
        .payload()
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if payload.is_empty() {
        return Err(DecodeError::Empty);
    }

    let bytes = STANDARD.decode(&payload)?;
    decode_bytes(&bytes)
}

pub fn decode_bytes(bytes: &[u8]) -> Result<RgbImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?
        .into_rgb8();

    Ok(img)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                128,
            ])
        });
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let encoded = EncodedImage::from_bytes(&png_bytes(12, 7));
        let img = decode_image(&encoded).unwrap();
        assert_eq!(img.dimensions(), (12, 7));
        assert_eq!(img.get_pixel(0, 0)[2], 128);
    }

    #[test]
    fn test_decode_data_url() {
        let b64 = STANDARD.encode(png_bytes(4, 4));
        let encoded = EncodedImage::new(format!("data:image/png;base64,{b64}\n"));
        assert_eq!(decode_image(&encoded).unwrap().dimensions(), (4, 4));
    }

    #[test]
    fn test_decode_line_wrapped() {
        let b64 = STANDARD.encode(png_bytes(40, 40));
        let wrapped = b64
            .as_bytes()
            .chunks(76)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\r\n");
        assert!(wrapped.contains('\n'));

        let img = decode_image(&EncodedImage::new(wrapped)).unwrap();
        assert_eq!(img.dimensions(), (40, 40));
    }

    #[test]
    fn test_reject_invalid_base64() {
        let err = decode_image(&EncodedImage::new("not base64 !!")).unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)));
    }

    #[test]
    fn test_reject_non_image() {
        let encoded = EncodedImage::from_bytes(b"definitely not an image");
        assert!(decode_image(&encoded).is_err());
    }

    #[test]
    fn test_reject_empty() {
        assert!(matches!(
            decode_image(&EncodedImage::new("  ")),
            Err(DecodeError::Empty)
        ));
    }
}
