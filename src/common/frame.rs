use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::sync::Arc;
use uuid::Uuid;

/// One sampled video frame.
#[derive(Clone)]
pub struct Frame {
    source_id: Uuid,
    image: Arc<DynamicImage>,
    captured_at: DateTime<Utc>,
    frame_id: Uuid,
}

impl Frame {
    pub fn new(
        source_id: Uuid,
        image: DynamicImage,
        captured_at: DateTime<Utc>,
        frame_id: Uuid,
    ) -> Self {
        Self {
            source_id,
            image: Arc::new(image),
            captured_at,
            frame_id,
        }
    }

    pub fn source_id(&self) -> Uuid {
        self.source_id
    }

    pub fn frame_id(&self) -> Uuid {
        self.frame_id
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    /// Encodes the frame as PNG, the format the upload endpoint expects.
    pub fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut buffer = Cursor::new(Vec::new());
        self.image.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("source_id", &self.source_id)
            .field("frame_id", &self.frame_id)
            .field("captured_at", &self.captured_at)
            .field("dimensions", &self.dimensions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn solid_frame() -> Frame {
        let img: DynamicImage = DynamicImage::ImageRgb8(
            ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(16, 16, Rgb([1, 2, 3])),
        );
        Frame::new(Uuid::new_v4(), img, Utc::now(), Uuid::new_v4())
    }

    #[test]
    fn cloning_frame_shares_image_buffer() {
        let f1 = solid_frame();
        let f2 = f1.clone();
        assert!(Arc::ptr_eq(&f1.image, &f2.image));
        assert_eq!(f1.frame_id(), f2.frame_id());
    }

    #[test]
    fn encodes_png_with_signature() {
        let bytes = solid_frame().encode_png().expect("png encoding");
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
