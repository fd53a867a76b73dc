//! ONNX Runtime model adapter.

use std::path::Path;

use ndarray::{ArrayD, Axis, IxDyn};
use ort::session::Session;
use ort::value::Tensor;

use crate::error::{Error, Result};
use crate::image::ImageTensor;
use crate::predict::Inference;

/// An ONNX classifier or regressor taking one NCHW `f32` input.
pub struct OnnxModel {
    name: String,
    session: Session,
    output_shape: Option<Vec<usize>>,
}

impl OnnxModel {
    /// Load an ONNX model session from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        tracing::info!("Loading model {name} from {}", path.display());

        let session = Session::builder()
            .map_err(|source| Error::ModelLoad {
                name: name.clone(),
                source,
            })?
            .commit_from_file(path)
            .map_err(|source| Error::ModelLoad {
                name: name.clone(),
                source,
            })?;

        Ok(Self {
            name,
            session,
            output_shape: None,
        })
    }

    /// Declare the per-row output shape, letting empty datasets produce an
    /// empty result instead of [`Error::EmptyDataset`].
    #[must_use]
    pub fn with_output_shape(mut self, shape: Vec<usize>) -> Self {
        self.output_shape = Some(shape);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Inference for OnnxModel {
    fn infer(&mut self, batch: ImageTensor) -> Result<ArrayD<f32>> {
        let rows = batch.len_of(Axis(0));
        let input = Tensor::from_array(batch).map_err(|source| Error::Inference { source })?;
        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|source| Error::Inference { source })?;

        // Only the first declared output is read; extra heads are ignored.
        let Some(scores) = outputs.values().next() else {
            return Err(Error::ShapeMismatch {
                expected: format!("a score tensor for {rows} images from {}", self.name),
                actual: "a model with no outputs".to_string(),
            });
        };

        scores_to_array(&scores)
    }

    fn output_shape(&self) -> Option<Vec<usize>> {
        self.output_shape.clone()
    }
}

/// Copy an `f32` output tensor into an owned array of the same shape.
fn scores_to_array(value: &ort::value::ValueRef<'_>) -> Result<ArrayD<f32>> {
    let (shape, data) = value
        .try_extract_tensor::<f32>()
        .map_err(|source| Error::Inference { source })?;

    let dims = concrete_dims(shape)?;

    ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec()).map_err(|err| Error::ShapeMismatch {
        expected: format!("{} values for shape {dims:?}", dims.iter().product::<usize>()),
        actual: format!("{} values ({err})", data.len()),
    })
}

/// Output dimensions as sizes. Symbolic (negative) dimensions are refused.
fn concrete_dims(shape: &[i64]) -> Result<Vec<usize>> {
    shape
        .iter()
        .map(|&d| usize::try_from(d))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| Error::ShapeMismatch {
            expected: "a concrete output shape".to_string(),
            actual: format!("dimensions {shape:?}"),
        })
}
