//! # `orientcrop`
//!
//! Image preprocessing for batched model inference.
//!
//! Images are resized with their aspect ratio preserved and then center or
//! randomly cropped to an exact input size. A dataset is split into landscape
//! and portrait images, each orientation is run through the model as one batch
//! at its own input size, and the outputs are merged back in dataset order.
//!
//! ## Example
//!
//! ```no_run
//! use orientcrop::{OnnxModel, OrientationBatchPredictor, PredictionRecord, PredictorConfig};
//!
//! # fn main() -> orientcrop::Result<()> {
//! let predictor = OrientationBatchPredictor::new(PredictorConfig::default())?;
//! let mut model = OnnxModel::load("model.onnx")?;
//!
//! let records = vec![
//!     PredictionRecord::new(0, "wide.jpg", true),
//!     PredictionRecord::new(1, "tall.jpg", false),
//! ];
//! let predictions = predictor.predict(&records, &mut model)?;
//! assert_eq!(predictions.shape()[0], 2);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod image;
pub mod manifest;
pub mod model;
pub mod predict;

pub use error::{Error, Result};
pub use image::{ImageSpec, ImageTransformer};
pub use manifest::Manifest;
pub use model::OnnxModel;
pub use predict::{Inference, OrientationBatchPredictor, PredictionRecord, PredictorConfig};
