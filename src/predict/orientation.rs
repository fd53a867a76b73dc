//! Batched prediction with a separate input size per orientation.

use image::DynamicImage;
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{ArrayD, Axis, IxDyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::image::{
    images_to_batch, ColorMode, CropFraction, CropMethod, FsImageStore, ImageSpec, ImageStore, ImageTensor,
    ImageTransformer, Interpolation, TargetSize, LANDSCAPE_SIZE, PORTRAIT_SIZE,
};

use super::inference::Inference;
use super::record::{partition, Orientation, Partition, PredictionRecord};

/// Configuration for orientation-aware prediction.
#[derive(Debug, Clone)]
pub struct PredictorConfig {
    /// Model input size for landscape images.
    pub landscape_size: TargetSize,

    /// Model input size for portrait images.
    pub portrait_size: TargetSize,

    /// Resampling kernel.
    pub interpolation: Interpolation,

    /// How images reach the input size.
    pub crop: CropMethod,

    /// Overrides the crop method's fraction preset.
    pub crop_fraction: Option<CropFraction>,

    /// Pixel format fed to the model.
    pub color_mode: ColorMode,

    /// Factor applied to raw 0-255 pixel values.
    pub rescale: f32,

    /// Random seed for reproducible random crops. None for random.
    pub seed: Option<u64>,

    /// Draw a progress bar while images are prepared.
    pub show_progress: bool,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            landscape_size: LANDSCAPE_SIZE,
            portrait_size: PORTRAIT_SIZE,
            interpolation: Interpolation::Bicubic,
            crop: CropMethod::CenterFull,
            crop_fraction: None,
            color_mode: ColorMode::Rgb,
            rescale: 1.0 / 255.0,
            seed: None,
            show_progress: true,
        }
    }
}

impl PredictorConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        for (name, size) in [
            ("landscape_size", self.landscape_size),
            ("portrait_size", self.portrait_size),
        ] {
            if size.height == 0 || size.width == 0 {
                return Err(Error::invalid(name, format!("{size} has a zero dimension")));
            }
        }

        if !self.rescale.is_finite() {
            return Err(Error::invalid("rescale", "must be finite"));
        }

        Ok(())
    }

    /// Input size used for `orientation`.
    #[must_use]
    pub const fn target_size(&self, orientation: Orientation) -> TargetSize {
        match orientation {
            Orientation::Landscape => self.landscape_size,
            Orientation::Portrait => self.portrait_size,
        }
    }
}

/// Runs a model over a dataset, batching landscape and portrait images apart.
///
/// Each orientation is transformed to its own input size and sent to the model
/// as one batch; the outputs are written back at the records' original
/// indices.
pub struct OrientationBatchPredictor<S = FsImageStore> {
    config: PredictorConfig,
    transformer: ImageTransformer<S>,
}

impl OrientationBatchPredictor<FsImageStore> {
    /// Create a predictor reading images from the filesystem.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: PredictorConfig) -> Result<Self> {
        Self::with_store(config, FsImageStore)
    }
}

impl<S: ImageStore> OrientationBatchPredictor<S> {
    /// Create a predictor over a custom image store.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_store(config: PredictorConfig, store: S) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            transformer: ImageTransformer::with_store(store),
        })
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn transformer(&self) -> &ImageTransformer<S> {
        &self.transformer
    }

    /// The spec `record` is transformed with.
    #[must_use]
    pub fn spec_for(&self, record: &PredictionRecord) -> ImageSpec {
        let spec = ImageSpec::new(&record.image)
            .with_target_size(self.config.target_size(record.orientation()))
            .with_color_mode(self.config.color_mode)
            .with_interpolation(self.config.interpolation)
            .with_crop(self.config.crop);

        match self.config.crop_fraction {
            Some(fraction) => spec.with_crop_fraction(fraction),
            None => spec,
        }
    }

    /// Predict on every record, returning an array of shape `(N, *F)` whose
    /// row `r.index` holds the model output for record `r`.
    ///
    /// The model is called at most twice, once per non-empty orientation.
    /// With no records the model is not called at all and `F` must come from
    /// [`Inference::output_shape`].
    ///
    /// Each call receives the whole partition as a single `f32` NCHW tensor,
    /// so memory grows with the partition: one 512x768 RGB image takes about
    /// 4.7 MB and a few thousand images need tens of GB. Split large datasets
    /// into several `predict` calls.
    ///
    /// Images are decoded and cropped on the rayon thread pool. Every record
    /// gets its own crop seed, drawn in partition order from the configured
    /// seed, so seeded runs give the same batches whatever the scheduling.
    ///
    /// # Errors
    ///
    /// Any failed image, failed model call or inconsistent output shape fails
    /// the whole call. Returns [`Error::EmptyDataset`] if there are no records
    /// and the model cannot report its output shape.
    pub fn predict<M: Inference + ?Sized>(&self, records: &[PredictionRecord], model: &mut M) -> Result<ArrayD<f32>> {
        let (landscape, portrait) = partition(records)?;

        tracing::info!(
            "Predicting {} images ({} landscape, {} portrait)",
            records.len(),
            landscape.len(),
            portrait.len()
        );

        let mut rng = self
            .config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

        let mut outputs = Vec::with_capacity(2);
        for part in [landscape, portrait] {
            if part.is_empty() {
                tracing::debug!("No {:?} images, skipping", part.orientation);
                continue;
            }

            let batch = self.load_batch(&part, &mut rng)?;
            tracing::debug!("Running model on {:?} batch {:?}", part.orientation, batch.shape());
            let rows = model.infer(batch)?;

            if rows.ndim() == 0 || rows.len_of(Axis(0)) != part.len() {
                return Err(Error::ShapeMismatch {
                    expected: format!("{} {:?} output rows", part.len(), part.orientation),
                    actual: format!("output of shape {:?}", rows.shape()),
                });
            }

            outputs.push((part, rows));
        }

        let feature_shape = match outputs.first() {
            Some((_, rows)) => rows.shape()[1..].to_vec(),
            None => model.output_shape().ok_or(Error::EmptyDataset)?,
        };

        for (part, rows) in &outputs {
            if rows.shape()[1..] != feature_shape[..] {
                return Err(Error::ShapeMismatch {
                    expected: format!("per-row shape {feature_shape:?}"),
                    actual: format!("{:?} rows of shape {:?}", part.orientation, &rows.shape()[1..]),
                });
            }
        }

        let mut shape = Vec::with_capacity(feature_shape.len() + 1);
        shape.push(records.len());
        shape.extend_from_slice(&feature_shape);

        let mut predictions = ArrayD::<f32>::zeros(IxDyn(&shape));
        for (part, rows) in &outputs {
            scatter(rows, part, &mut predictions);
        }

        tracing::info!("Prediction complete, output shape {:?}", predictions.shape());
        Ok(predictions)
    }

    /// Transform every image of `part` in parallel and stack them into one
    /// batch, in partition order.
    fn load_batch<R: Rng + ?Sized>(&self, part: &Partition<'_>, rng: &mut R) -> Result<ImageTensor> {
        let pb = if self.config.show_progress {
            ProgressBar::new(part.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .expect("valid template")
                .progress_chars("#>-"),
        );
        pb.set_message(format!("{:?}", part.orientation));

        let jobs: Vec<(&PredictionRecord, u64)> =
            part.records.iter().map(|&record| (record, rng.random())).collect();

        let images = jobs
            .into_par_iter()
            .map(|(record, seed)| {
                let spec = self.spec_for(record);
                let img = self.transformer.transform(&spec, &mut StdRng::seed_from_u64(seed));
                pb.inc(1);
                img
            })
            .collect::<Result<Vec<DynamicImage>>>();

        pb.finish_and_clear();
        let images = images?;
        images_to_batch(&images, self.config.color_mode, self.config.rescale)
    }
}

/// Write row `i` of `rows` to `predictions[part.indices()[i]]`.
fn scatter(rows: &ArrayD<f32>, part: &Partition<'_>, predictions: &mut ArrayD<f32>) {
    for (row, index) in rows.axis_iter(Axis(0)).zip(part.indices()) {
        predictions.index_axis_mut(Axis(0), index).assign(&row);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use image::{GenericImageView, Rgb, RgbImage};
    use ndarray::Array2;

    use super::*;
    use crate::image::MemoryImageStore;

    fn config() -> PredictorConfig {
        PredictorConfig {
            landscape_size: TargetSize::new(8, 12),
            portrait_size: TargetSize::new(12, 8),
            show_progress: false,
            seed: Some(0),
            ..PredictorConfig::default()
        }
    }

    fn solid(width: u32, height: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([value, value, value])))
    }

    /// Five records, landscape at 0, 2, 4 and portrait at 1, 3. Every image is
    /// filled with `10 * index` so the model can tell them apart.
    fn dataset() -> (MemoryImageStore, Vec<PredictionRecord>) {
        let mut store = MemoryImageStore::new();
        let mut records = Vec::new();
        for i in 0..5u8 {
            let landscape = i % 2 == 0;
            let img = if landscape { solid(40, 30, i * 10) } else { solid(30, 40, i * 10) };
            let path = format!("{i}.png");
            store.insert(path.as_str(), img);
            records.push(PredictionRecord::new(usize::from(i), path, landscape));
        }
        (store, records)
    }

    /// Reports `[pixel value, batch height]` for each image.
    fn pixel_and_height(batch: ImageTensor) -> Result<ArrayD<f32>> {
        let rows = batch.len_of(Axis(0));
        let height = batch.len_of(Axis(2)) as f32;
        let out = Array2::from_shape_fn((rows, 2), |(n, col)| {
            if col == 0 {
                (batch[[n, 0, 0, 0]] * 255.0).round()
            } else {
                height
            }
        });
        Ok(out.into_dyn())
    }

    #[test]
    fn test_scatter_restores_input_order() {
        let (store, records) = dataset();
        let predictor = OrientationBatchPredictor::with_store(config(), store).unwrap();

        let calls = Cell::new(0);
        let mut model = |batch: ImageTensor| {
            calls.set(calls.get() + 1);
            pixel_and_height(batch)
        };
        let out = predictor.predict(&records, &mut model).unwrap();

        assert_eq!(calls.get(), 2);
        assert_eq!(out.shape(), &[5, 2]);
        for i in 0..5 {
            let expected_height = if i % 2 == 0 { 8.0 } else { 12.0 };
            assert_eq!(out[[i, 0]], (i * 10) as f32, "row {i}");
            assert_eq!(out[[i, 1]], expected_height, "row {i}");
        }
    }

    #[test]
    fn test_rows_map_to_partition_outputs() {
        let (store, records) = dataset();
        let predictor = OrientationBatchPredictor::with_store(config(), store).unwrap();

        // Landscape batch gets rows 100.., portrait batch 200..
        let mut model = |batch: ImageTensor| -> Result<ArrayD<f32>> {
            let rows = batch.len_of(Axis(0));
            let base = if batch.len_of(Axis(2)) == 8 { 100.0 } else { 200.0 };
            Ok(ArrayD::from_shape_fn(IxDyn(&[rows, 1]), |idx| base + idx[0] as f32))
        };
        let out = predictor.predict(&records, &mut model).unwrap();

        let column: Vec<f32> = out.iter().copied().collect();
        assert_eq!(column, vec![100.0, 200.0, 101.0, 201.0, 102.0]);
    }

    #[test]
    fn test_single_orientation_calls_model_once() {
        let (store, mut records) = dataset();
        for record in &mut records {
            record.is_landscape = true;
        }
        let predictor = OrientationBatchPredictor::with_store(config(), store).unwrap();

        let calls = Cell::new(0);
        let mut model = |batch: ImageTensor| {
            calls.set(calls.get() + 1);
            pixel_and_height(batch)
        };
        let out = predictor.predict(&records, &mut model).unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(out.shape(), &[5, 2]);
        assert!(out.index_axis(Axis(1), 1).iter().all(|&h| h == 8.0));
    }

    struct Fixed {
        calls: usize,
    }

    impl Inference for Fixed {
        fn infer(&mut self, batch: ImageTensor) -> Result<ArrayD<f32>> {
            self.calls += 1;
            pixel_and_height(batch)
        }

        fn output_shape(&self) -> Option<Vec<usize>> {
            Some(vec![2])
        }
    }

    #[test]
    fn test_empty_input_skips_model() {
        let predictor = OrientationBatchPredictor::with_store(config(), MemoryImageStore::new()).unwrap();

        let mut model = Fixed { calls: 0 };
        let out = predictor.predict(&[], &mut model).unwrap();
        assert_eq!(out.shape(), &[0, 2]);
        assert_eq!(model.calls, 0);
    }

    #[test]
    fn test_empty_input_without_shape_is_error() {
        let predictor = OrientationBatchPredictor::with_store(config(), MemoryImageStore::new()).unwrap();

        let mut model = pixel_and_height;
        let err = predictor.predict(&[], &mut model).unwrap_err();
        assert!(matches!(err, Error::EmptyDataset));
    }

    #[test]
    fn test_short_output_aborts() {
        let (store, records) = dataset();
        let predictor = OrientationBatchPredictor::with_store(config(), store).unwrap();

        // Landscape succeeds, portrait drops a row.
        let mut model = |batch: ImageTensor| -> Result<ArrayD<f32>> {
            let rows = batch.len_of(Axis(0));
            let rows = if batch.len_of(Axis(2)) == 12 { rows - 1 } else { rows };
            Ok(ArrayD::zeros(IxDyn(&[rows, 3])))
        };
        let err = predictor.predict(&records, &mut model).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_inconsistent_feature_shapes_abort() {
        let (store, records) = dataset();
        let predictor = OrientationBatchPredictor::with_store(config(), store).unwrap();

        let mut model = |batch: ImageTensor| -> Result<ArrayD<f32>> {
            let rows = batch.len_of(Axis(0));
            let width = if batch.len_of(Axis(2)) == 8 { 3 } else { 4 };
            Ok(ArrayD::zeros(IxDyn(&[rows, width])))
        };
        let err = predictor.predict(&records, &mut model).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_missing_image_aborts_before_model() {
        let (store, mut records) = dataset();
        records[3].image = "missing.png".into();
        let predictor = OrientationBatchPredictor::with_store(config(), store).unwrap();

        let mut model = pixel_and_height;
        let err = predictor.predict(&records, &mut model).unwrap_err();
        assert!(matches!(err, Error::ImageLoad { .. }));
    }

    #[test]
    fn test_model_error_propagates() {
        let (store, records) = dataset();
        let predictor = OrientationBatchPredictor::with_store(config(), store).unwrap();

        let mut model = |_: ImageTensor| -> Result<ArrayD<f32>> { Err(Error::invalid("model", "boom")) };
        let err = predictor.predict(&records, &mut model).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn test_multi_dim_features() {
        let (store, records) = dataset();
        let predictor = OrientationBatchPredictor::with_store(config(), store).unwrap();

        let mut model = |batch: ImageTensor| -> Result<ArrayD<f32>> {
            let rows = batch.len_of(Axis(0));
            Ok(ArrayD::from_elem(IxDyn(&[rows, 2, 3]), batch[[0, 0, 0, 0]]))
        };
        let out = predictor.predict(&records, &mut model).unwrap();
        assert_eq!(out.shape(), &[5, 2, 3]);
    }

    #[test]
    fn test_spec_for_uses_orientation_size() {
        let predictor = OrientationBatchPredictor::with_store(PredictorConfig::default(), MemoryImageStore::new()).unwrap();

        let landscape = predictor.spec_for(&PredictionRecord::new(0, "a.jpg", true));
        let portrait = predictor.spec_for(&PredictionRecord::new(1, "b.jpg", false));

        assert_eq!(landscape.target_size, Some(TargetSize::new(512, 768)));
        assert_eq!(portrait.target_size, Some(TargetSize::new(768, 512)));
        assert_eq!(landscape.crop, CropMethod::CenterFull);
        assert_eq!(landscape.interpolation, Interpolation::Bicubic);
        assert_eq!(portrait.crop_fraction, CropFraction::FULL);
    }

    #[test]
    fn test_crop_fraction_override() {
        let config = PredictorConfig {
            crop: CropMethod::Center,
            crop_fraction: Some(CropFraction::new(0.5).unwrap()),
            ..config()
        };
        let predictor = OrientationBatchPredictor::with_store(config, MemoryImageStore::new()).unwrap();
        let spec = predictor.spec_for(&PredictionRecord::new(0, "a.jpg", true));
        assert_eq!(spec.crop_fraction.get(), 0.5);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PredictorConfig {
            portrait_size: TargetSize::new(0, 8),
            ..config()
        };
        assert!(OrientationBatchPredictor::with_store(config, MemoryImageStore::new()).is_err());
    }

    #[test]
    fn test_seeded_random_crops_are_reproducible() {
        let mut store = MemoryImageStore::new();
        let mut records = Vec::new();
        for i in 0..8u32 {
            let (w, h) = if i % 3 == 0 { (60, 120) } else { (120, 60) };
            let img = RgbImage::from_fn(w, h, |x, y| Rgb([(x * 2) as u8, (y * 2) as u8, i as u8]));
            let path = format!("{i}.png");
            store.insert(path.as_str(), DynamicImage::ImageRgb8(img));
            records.push(PredictionRecord::new(i as usize, path, w > h));
        }
        let config = PredictorConfig {
            crop: CropMethod::Random,
            seed: Some(3),
            ..config()
        };
        let predictor = OrientationBatchPredictor::with_store(config, store).unwrap();

        let run = || {
            let mut batches = Vec::new();
            let mut model = |batch: ImageTensor| -> Result<ArrayD<f32>> {
                let rows = batch.len_of(Axis(0));
                batches.push(batch);
                Ok(ArrayD::zeros(IxDyn(&[rows, 1])))
            };
            predictor.predict(&records, &mut model).unwrap();
            batches
        };

        let first = run();
        assert_eq!(first.len(), 2);
        for _ in 0..3 {
            assert_eq!(run(), first);
        }
    }

    #[test]
    fn test_transformed_batch_matches_orientation() {
        let (store, records) = dataset();
        let predictor = OrientationBatchPredictor::with_store(config(), store).unwrap();
        let img = predictor
            .transformer()
            .transform(&predictor.spec_for(&records[1]), &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(img.dimensions(), (8, 12));
    }
}
