use std::sync::Arc;
use std::time::{Duration, Instant};

use tower::Service;
use tower::ServiceBuilder;
use tower::ServiceExt;
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower::util::BoxService;
use tracing::{debug, warn};

use crate::common::{Frame, HandLandmarks};
use crate::error::SensingError;
use crate::pipeline::context::{ClassifiedState, FrameContext, SensingOutcome};
use crate::pipeline::domain::gesture::{ClassifierConfig, FingerClassifier};
use crate::pipeline::orchestration::service::{BoxError, LandmarkService};
use crate::sensing::{HandSelection, LandmarkSource};

pub struct GesturePipelineBuilder {
    source: Arc<dyn LandmarkSource>,
    sensing_timeout: Option<Duration>,
    classifier: ClassifierConfig,
    hand_selection: HandSelection,
}

impl GesturePipelineBuilder {
    // Bounds a single landmark estimation; a stalled model counts as no hand.
    pub fn sensing_timeout(mut self, sensing_timeout: Duration) -> Self {
        self.sensing_timeout = Some(sensing_timeout);
        self
    }

    pub fn classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn hand_selection(mut self, hand_selection: HandSelection) -> Self {
        self.hand_selection = hand_selection;
        self
    }

    pub fn build(self) -> GesturePipeline {
        let sensing = ServiceBuilder::new()
            .option_layer(self.sensing_timeout.map(TimeoutLayer::new))
            .service(LandmarkService::new(self.source));

        GesturePipeline {
            sensing: BoxService::new(sensing),
            classifier: FingerClassifier::new(self.classifier),
            hand_selection: self.hand_selection,
        }
    }
}

/// Landmark source -> hand selection -> finger classifier, for one frame at a time.
pub struct GesturePipeline {
    sensing: BoxService<Arc<Frame>, Vec<HandLandmarks>, BoxError>,
    classifier: FingerClassifier,
    hand_selection: HandSelection,
}

impl GesturePipeline {
    pub fn builder(source: Arc<dyn LandmarkSource>) -> GesturePipelineBuilder {
        GesturePipelineBuilder {
            source,
            sensing_timeout: None,
            classifier: ClassifierConfig::default(),
            hand_selection: HandSelection::default(),
        }
    }

    /// Never fails: sensing errors are folded into the outcome as "no hand".
    pub async fn evaluate(&mut self, frame: Frame) -> FrameContext<ClassifiedState> {
        let mut context = FrameContext::new(frame);
        let started = Instant::now();

        let sensing = match self.sense(context.shared_frame()).await {
            Ok(hands) => {
                let reported = hands.len();
                match self.hand_selection.select(hands) {
                    Some(hand) => {
                        if reported > 1 {
                            debug!(reported, "Multiple hands reported, using one");
                        }
                        SensingOutcome::Hand(hand)
                    }
                    None => SensingOutcome::NoHand,
                }
            }
            Err(e) => {
                warn!("Landmark estimation failed: {}", e);
                SensingOutcome::Failed(e.to_string())
            }
        };
        context.record_sensing_duration(started.elapsed());

        let hand = match &sensing {
            SensingOutcome::Hand(hand) => Some(hand),
            _ => None,
        };
        let classify_started = Instant::now();
        let classification = self.classifier.classify(hand);
        let classify_duration = classify_started.elapsed();
        debug!(
            verdict = classification.verdict.as_str(),
            open = classification.open_fingers,
            closed = classification.closed_fingers,
            "Frame classified"
        );
        context.record_classification_duration(classify_duration);
        context.into_classified(sensing, classification)
    }

    async fn sense(&mut self, frame: Arc<Frame>) -> Result<Vec<HandLandmarks>, SensingError> {
        let service = self.sensing.ready().await.map_err(into_sensing_error)?;
        service.call(frame).await.map_err(into_sensing_error)
    }
}

fn into_sensing_error(err: BoxError) -> SensingError {
    if err.is::<Elapsed>() {
        return SensingError::Timeout;
    }
    match err.downcast::<SensingError>() {
        Ok(err) => *err,
        Err(err) => SensingError::Estimation(err.to_string()),
    }
}
