//! Contract between the predictor and a trained model.

use ndarray::ArrayD;

use crate::error::Result;
use crate::image::ImageTensor;

/// A model that maps a batch of images to one output row per image.
///
/// Output row `i` must belong to batch item `i`.
pub trait Inference {
    /// Run the model on an NCHW batch, returning an array of shape
    /// `(batch_size, *F)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model fails to run.
    fn infer(&mut self, batch: ImageTensor) -> Result<ArrayD<f32>>;

    /// Per-row output shape `F`, when known without running the model.
    fn output_shape(&self) -> Option<Vec<usize>> {
        None
    }
}

impl<F> Inference for F
where
    F: FnMut(ImageTensor) -> Result<ArrayD<f32>>,
{
    fn infer(&mut self, batch: ImageTensor) -> Result<ArrayD<f32>> {
        self(batch)
    }
}
