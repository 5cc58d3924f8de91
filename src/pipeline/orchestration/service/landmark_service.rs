use std::pin::Pin;
use std::sync::Arc;

use crate::common::{Frame, HandLandmarks};
use crate::sensing::LandmarkSource;
use futures::Future;
use futures::task::Context;
use futures::task::Poll;
use tower::Service;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Exposes a [`LandmarkSource`] as a tower service so it can be layered.
#[derive(Clone)]
pub struct LandmarkService {
    inner: Arc<dyn LandmarkSource>,
}

impl LandmarkService {
    pub fn new(inner: Arc<dyn LandmarkSource>) -> Self {
        Self { inner }
    }
}

impl Service<Arc<Frame>> for LandmarkService {
    type Response = Vec<HandLandmarks>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, frame: Arc<Frame>) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move {
            let hands = inner.estimate(&frame).await?;
            Ok(hands)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::gesture::tests::open_hand;
    use crate::sensing::{FrameSource, ReplayLandmarkSource, StillFrameSource};

    #[tokio::test]
    async fn test_landmark_service() {
        let source = ReplayLandmarkSource::new(vec![vec![open_hand()]]);
        let mut service = LandmarkService::new(Arc::new(source));
        let frame = StillFrameSource::blank(8, 8).grab().await.unwrap();
        let hands = service.call(Arc::new(frame)).await.unwrap();
        assert_eq!(hands, vec![open_hand()]);
    }
}
