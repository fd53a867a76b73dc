//! Orientation-aware batched prediction.

mod inference;
mod orientation;
mod record;

pub use inference::Inference;
pub use orientation::{OrientationBatchPredictor, PredictorConfig};
pub use record::{partition, Orientation, Partition, PredictionRecord};
