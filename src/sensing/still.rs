use async_trait::async_trait;
use chrono::Utc;
use image::{DynamicImage, ImageBuffer, Rgb};
use std::path::Path;
use uuid::Uuid;

use crate::common::Frame;
use crate::error::SensingError;
use crate::sensing::FrameSource;

/// Serves the same picture on every grab, stamped as a fresh frame.
pub struct StillFrameSource {
    id: Uuid,
    image: DynamicImage,
}

impl StillFrameSource {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            id: Uuid::new_v4(),
            image,
        }
    }

    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(DynamicImage::ImageRgb8(
            ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(width, height, Rgb([0, 0, 0])),
        ))
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, SensingError> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| SensingError::Frame(format!("{}: {}", path.display(), e)))?;
        Ok(Self::new(image))
    }
}

#[async_trait]
impl FrameSource for StillFrameSource {
    async fn grab(&mut self) -> Result<Frame, SensingError> {
        Ok(Frame::new(
            self.id,
            self.image.clone(),
            Utc::now(),
            Uuid::new_v4(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_grab_is_a_new_frame_from_the_same_source() {
        let mut source = StillFrameSource::blank(32, 24);
        let a = source.grab().await.unwrap();
        let b = source.grab().await.unwrap();
        assert_eq!(a.dimensions(), (32, 24));
        assert_eq!(a.source_id(), b.source_id());
        assert_ne!(a.frame_id(), b.frame_id());
    }

    #[test]
    fn missing_image_is_a_frame_error() {
        let err = StillFrameSource::open("/nonexistent/frame.png").err().unwrap();
        assert!(matches!(err, SensingError::Frame(_)));
    }
}
