//! Image loading, resize-and-crop, batching and saving.

mod load;
#[cfg(test)]
mod memory;
mod save;
mod spec;
mod tensor;
mod transform;

pub use load::{convert_color, image_dimensions, resize_exact, FsImageStore, ImageStore};
#[cfg(test)]
pub(crate) use memory::MemoryImageStore;
pub use save::save_image;
pub use spec::{
    parse_method_token, ColorMode, CropFraction, CropMethod, CropPlacement, ImageSpec, Interpolation,
    TargetSize,
};
pub use tensor::images_to_batch;
pub use transform::{
    center_offset, pre_crop_canvas, random_offset, resize_and_crop, resized_dimensions, ImageTransformer,
    MAX_RESIZED_PIXELS,
};

use ndarray::Array4;

/// Image batch in NCHW format (batch, channels, height, width).
pub type ImageTensor = Array4<f32>;

/// Model input size for landscape images, 512 high by 768 wide.
pub const LANDSCAPE_SIZE: TargetSize = TargetSize::new(512, 768);

/// Model input size for portrait images, 768 high by 512 wide.
pub const PORTRAIT_SIZE: TargetSize = LANDSCAPE_SIZE.rotated();
