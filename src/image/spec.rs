//! Typed description of how a single image is loaded, resized and cropped.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::imageops::FilterType;

use crate::error::{Error, Result};

/// Output size as `(height, width)`, matching the usual model input convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetSize {
    pub height: u32,
    pub width: u32,
}

impl TargetSize {
    #[must_use]
    pub const fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    /// The same size with height and width swapped.
    #[must_use]
    pub const fn rotated(self) -> Self {
        Self {
            height: self.width,
            width: self.height,
        }
    }

    /// Size in `image` crate order, `(width, height)`.
    #[must_use]
    pub const fn dimensions(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl From<(u32, u32)> for TargetSize {
    /// Builds a size from a `(height, width)` tuple.
    fn from((height, width): (u32, u32)) -> Self {
        Self { height, width }
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

impl FromStr for TargetSize {
    type Err = Error;

    /// Parses `HEIGHTxWIDTH`, e.g. `512x768`.
    fn from_str(s: &str) -> Result<Self> {
        let parse = |part: Option<&str>| -> Result<u32> {
            part.and_then(|p| p.trim().parse::<u32>().ok())
                .filter(|&v| v > 0)
                .ok_or_else(|| Error::invalid("target_size", format!("expected HEIGHTxWIDTH, got {s:?}")))
        };
        let mut parts = s.split(['x', 'X']);
        let height = parse(parts.next())?;
        let width = parse(parts.next())?;
        if parts.next().is_some() {
            return Err(Error::invalid("target_size", format!("expected HEIGHTxWIDTH, got {s:?}")));
        }
        Ok(Self { height, width })
    }
}

/// Pixel format an image is converted to after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    Grayscale,
    #[default]
    Rgb,
    Rgba,
}

impl ColorMode {
    /// Number of channels in the converted image.
    #[must_use]
    pub const fn channels(self) -> usize {
        match self {
            Self::Grayscale => 1,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

impl FromStr for ColorMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "grayscale" => Ok(Self::Grayscale),
            "rgb" => Ok(Self::Rgb),
            "rgba" => Ok(Self::Rgba),
            other => Err(Error::invalid(
                "color_mode",
                format!("{other:?} is not one of grayscale, rgb, rgba"),
            )),
        }
    }
}

/// Resampling kernel used whenever an image is resized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos,
    Box,
    Hamming,
}

impl Interpolation {
    /// The `image` crate kernel for this method.
    ///
    /// Box and Hamming have no dedicated kernel; they resolve to the closest
    /// available one (Triangle and Catmull-Rom).
    #[must_use]
    pub const fn filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear | Self::Box => FilterType::Triangle,
            Self::Bicubic | Self::Hamming => FilterType::CatmullRom,
            Self::Lanczos => FilterType::Lanczos3,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
            Self::Bicubic => "bicubic",
            Self::Lanczos => "lanczos",
            Self::Box => "box",
            Self::Hamming => "hamming",
        }
    }
}

impl FromStr for Interpolation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nearest" => Ok(Self::Nearest),
            "bilinear" => Ok(Self::Bilinear),
            "bicubic" => Ok(Self::Bicubic),
            "lanczos" => Ok(Self::Lanczos),
            "box" => Ok(Self::Box),
            "hamming" => Ok(Self::Hamming),
            other => Err(Error::UnsupportedInterpolation {
                name: other.to_string(),
            }),
        }
    }
}

/// Where the crop window is placed on the resized canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropPlacement {
    Center,
    Random,
}

/// How an image reaches its exact target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropMethod {
    /// Resize directly to the target size, ignoring aspect ratio.
    #[default]
    None,
    Center,
    Random,
    /// Center crop with no safety margin.
    CenterFull,
    /// Random crop with no safety margin.
    RandomFull,
}

impl CropMethod {
    /// Placement of the crop window, `None` for a plain resize.
    #[must_use]
    pub const fn placement(self) -> Option<CropPlacement> {
        match self {
            Self::None => None,
            Self::Center | Self::CenterFull => Some(CropPlacement::Center),
            Self::Random | Self::RandomFull => Some(CropPlacement::Random),
        }
    }

    /// Fraction preset that goes with this method.
    #[must_use]
    pub const fn default_fraction(self) -> CropFraction {
        match self {
            Self::CenterFull | Self::RandomFull => CropFraction::FULL,
            Self::None | Self::Center | Self::Random => CropFraction::DEFAULT,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Center => "center",
            Self::Random => "random",
            Self::CenterFull => "center_full",
            Self::RandomFull => "random_full",
        }
    }
}

impl FromStr for CropMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "center" => Ok(Self::Center),
            "random" => Ok(Self::Random),
            "center_full" | "center-full" => Ok(Self::CenterFull),
            "random_full" | "random-full" => Ok(Self::RandomFull),
            other => Err(Error::InvalidCropMethod {
                name: other.to_string(),
            }),
        }
    }
}

/// Share of the pre-crop canvas covered by the final crop, in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct CropFraction(f64);

impl CropFraction {
    /// The crop covers the whole short side of the canvas.
    pub const FULL: Self = Self(1.0);

    /// Leaves a 12.5% margin around the crop.
    pub const DEFAULT: Self = Self(0.875);

    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] unless `0 < value <= 1`.
    pub fn new(value: f64) -> Result<Self> {
        if value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(Error::invalid("crop_fraction", format!("{value} is not in (0, 1]")))
        }
    }

    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }
}

impl Default for CropFraction {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Splits an `interpolation[:crop]` token into its two typed halves.
///
/// # Errors
///
/// Returns [`Error::UnsupportedInterpolation`] or [`Error::InvalidCropMethod`]
/// when either half is unknown.
pub fn parse_method_token(token: &str) -> Result<(Interpolation, CropMethod)> {
    let (interpolation, crop) = token.split_once(':').unwrap_or((token, "none"));
    Ok((interpolation.parse()?, crop.parse()?))
}

/// Everything needed to turn one file into one correctly sized image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSpec {
    pub path: PathBuf,
    pub target_size: Option<TargetSize>,
    pub color_mode: ColorMode,
    pub interpolation: Interpolation,
    pub crop: CropMethod,
    pub crop_fraction: CropFraction,
}

impl ImageSpec {
    /// A spec that loads the image at native size, RGB, without cropping.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            target_size: None,
            color_mode: ColorMode::default(),
            interpolation: Interpolation::default(),
            crop: CropMethod::None,
            crop_fraction: CropMethod::None.default_fraction(),
        }
    }

    /// Builds a spec from an `interpolation[:crop]` token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed or the resulting spec is
    /// inconsistent (see [`ImageSpec::validate`]).
    pub fn from_token<P: AsRef<Path>>(
        path: P,
        target_size: Option<TargetSize>,
        color_mode: ColorMode,
        token: &str,
    ) -> Result<Self> {
        let (interpolation, crop) = parse_method_token(token)?;
        let spec = Self::new(path)
            .with_color_mode(color_mode)
            .with_interpolation(interpolation)
            .with_crop(crop);
        let spec = match target_size {
            Some(size) => spec.with_target_size(size),
            None => spec,
        };
        spec.validate()?;
        Ok(spec)
    }

    #[must_use]
    pub fn with_target_size(mut self, size: impl Into<TargetSize>) -> Self {
        self.target_size = Some(size.into());
        self
    }

    #[must_use]
    pub fn with_color_mode(mut self, color_mode: ColorMode) -> Self {
        self.color_mode = color_mode;
        self
    }

    #[must_use]
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Sets the crop method and resets the fraction to its preset.
    #[must_use]
    pub fn with_crop(mut self, crop: CropMethod) -> Self {
        self.crop = crop;
        self.crop_fraction = crop.default_fraction();
        self
    }

    #[must_use]
    pub fn with_crop_fraction(mut self, fraction: CropFraction) -> Self {
        self.crop_fraction = fraction;
        self
    }

    /// Check the spec is self-consistent.
    ///
    /// # Errors
    ///
    /// Returns an error if a crop is requested without a target size, or the
    /// target size has a zero dimension.
    pub fn validate(&self) -> Result<()> {
        match self.target_size {
            None if self.crop != CropMethod::None => Err(Error::invalid(
                "target_size",
                format!("crop method {} requires a target size", self.crop.name()),
            )),
            Some(size) if size.height == 0 || size.width == 0 => Err(Error::invalid(
                "target_size",
                format!("{size} has a zero dimension"),
            )),
            _ => Ok(()),
        }
    }
}
