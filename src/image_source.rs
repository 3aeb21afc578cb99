//! Source images and patch region extraction
//!
//! Two buffer layouts are supported: demosaiced RGB rasters (8 or 16 bits per
//! channel, e.g. TIFF scans) and single-channel RAW sensor mosaics with a 2x2
//! colour filter array.

use std::path::Path;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::geometry::{Point, Size};
use crate::mosaic::{CfaPattern, MosaicInfo};

/// How pixel values are laid out in a [`SourceImage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// Interleaved R, G, B
    Rgb,
    /// One value per pixel, colour given by the pattern
    Mosaic(CfaPattern),
}

/// Decoded capture, read-only during sampling
#[derive(Debug, Clone)]
pub struct SourceImage {
    width: u32,
    height: u32,
    white_level: f64,
    layout: PixelLayout,
    data: Vec<u16>,
}

/// Integer pixel box `[x, x + width) x [y, y + height)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PatchBox {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl PatchBox {
    /// Box of `size * scale_percent / 100` around `center`, clamped to the image
    pub fn around(center: Point, size: Size, scale_percent: u32, img_w: u32, img_h: u32) -> Self {
        let s = scale_percent as f64 / 100.0;
        let (half_w, half_h) = (size.w * s / 2.0, size.h * s / 2.0);
        let clamp = |v: f64, max: u32| (v.trunc().max(0.0) as usize).min(max as usize);

        let x1 = clamp(center.x - half_w, img_w);
        let y1 = clamp(center.y - half_h, img_h);
        let x2 = clamp(center.x + half_w, img_w);
        let y2 = clamp(center.y + half_h, img_h);

        Self {
            x: x1,
            y: y1,
            width: x2.saturating_sub(x1),
            height: y2.saturating_sub(y1),
        }
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }
}

/// Pixels of one patch, copied out of the source as `f64`
#[derive(Debug, Clone, PartialEq)]
pub struct PatchPixels {
    pub width: usize,
    pub height: usize,
    /// Interleaved RGB, or one value per pixel when `mosaic` is set
    pub data: Vec<f64>,
    pub mosaic: Option<MosaicInfo>,
}

impl PatchPixels {
    pub fn rgb(width: usize, height: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != width * height * 3 {
            return Err(Error::dimension("RGB patch buffer", width * height * 3, data.len()));
        }
        Ok(Self {
            width,
            height,
            data,
            mosaic: None,
        })
    }

    pub fn mosaic(width: usize, height: usize, data: Vec<f64>, info: MosaicInfo) -> Result<Self> {
        if data.len() != width * height {
            return Err(Error::dimension("mosaic patch buffer", width * height, data.len()));
        }
        Ok(Self {
            width,
            height,
            data,
            mosaic: Some(info),
        })
    }
}

impl SourceImage {
    fn checked(
        width: u32,
        height: u32,
        white_level: f64,
        layout: PixelLayout,
        data: Vec<u16>,
    ) -> Result<Self> {
        let per_pixel = match layout {
            PixelLayout::Rgb => 3,
            PixelLayout::Mosaic(_) => 1,
        };
        let expected = width as usize * height as usize * per_pixel;
        if data.len() != expected {
            return Err(Error::ImageMismatch(format!(
                "{}x{} image needs {} values, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            white_level,
            layout,
            data,
        })
    }

    pub fn from_rgb8(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let data = data.into_iter().map(u16::from).collect();
        Self::checked(width, height, u8::MAX as f64, PixelLayout::Rgb, data)
    }

    pub fn from_rgb16(width: u32, height: u32, data: Vec<u16>) -> Result<Self> {
        Self::checked(width, height, u16::MAX as f64, PixelLayout::Rgb, data)
    }

    pub fn from_mosaic(
        width: u32,
        height: u32,
        data: Vec<u16>,
        pattern: CfaPattern,
        white_level: f64,
    ) -> Result<Self> {
        Self::checked(width, height, white_level, PixelLayout::Mosaic(pattern), data)
    }

    /// Decode an RGB raster, keeping 16-bit precision when the file has it
    pub fn open(path: &Path) -> Result<Self> {
        let img = image::open(path)?;
        let (w, h) = (img.width(), img.height());
        let image = if is_16bit(&img) {
            Self::from_rgb16(w, h, img.into_rgb16().into_raw())?
        } else {
            Self::from_rgb8(w, h, img.into_rgb8().into_raw())?
        };
        info!("Loaded {:?}: {}x{} RGB, white level {}", path, w, h, image.white_level);
        Ok(image)
    }

    /// Decode a single-channel sensor dump and attach its filter pattern
    pub fn open_mosaic(path: &Path, pattern: CfaPattern) -> Result<Self> {
        let img = image::open(path)?;
        let (w, h) = (img.width(), img.height());
        let white_level = if is_16bit(&img) {
            u16::MAX as f64
        } else {
            u8::MAX as f64
        };
        let data = if is_16bit(&img) {
            img.into_luma16().into_raw()
        } else {
            img.into_luma8().into_raw().into_iter().map(u16::from).collect()
        };
        info!("Loaded {:?}: {}x{} mosaic {:?}", path, w, h, pattern);
        Self::from_mosaic(w, h, data, pattern, white_level)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Value of a fully saturated channel (255 or 65535)
    pub fn white_level(&self) -> f64 {
        self.white_level
    }

    /// Copy the pixels under `pbox`; parts outside the image are dropped
    pub fn region(&self, pbox: &PatchBox) -> PatchPixels {
        let w = self.width as usize;
        let h = self.height as usize;
        let x0 = pbox.x.min(w);
        let y0 = pbox.y.min(h);
        let x_end = pbox.x.saturating_add(pbox.width).min(w);
        let y_end = pbox.y.saturating_add(pbox.height).min(h);
        let width = x_end - x0;
        let height = y_end - y0;

        match self.layout {
            PixelLayout::Rgb => {
                let mut data = Vec::with_capacity(width * height * 3);
                for y in y0..y_end {
                    let row = &self.data[(y * w + x0) * 3..(y * w + x_end) * 3];
                    data.extend(row.iter().map(|&v| v as f64));
                }
                PatchPixels {
                    width,
                    height,
                    data,
                    mosaic: None,
                }
            }
            PixelLayout::Mosaic(pattern) => {
                let mut data = Vec::with_capacity(width * height);
                for y in y0..y_end {
                    let row = &self.data[y * w + x0..y * w + x_end];
                    data.extend(row.iter().map(|&v| v as f64));
                }
                PatchPixels {
                    width,
                    height,
                    data,
                    mosaic: Some(MosaicInfo::new(x0, y0, pattern)),
                }
            }
        }
    }
}

fn is_16bit(img: &DynamicImage) -> bool {
    img.color().bytes_per_pixel() / img.color().channel_count() > 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::{sample, SamplerConfig, SamplingMethod};

    #[test]
    fn test_patch_box_truncates_and_clamps() {
        let b = PatchBox::around(Point::new(25.0, 25.0), Size::new(10.0, 10.0), 100, 100, 100);
        assert_eq!(b, PatchBox { x: 20, y: 20, width: 10, height: 10 });

        let half = PatchBox::around(Point::new(25.0, 25.0), Size::new(10.0, 10.0), 50, 100, 100);
        assert_eq!(half.width, 5);
        assert_eq!(half.x, 22);

        let edge = PatchBox::around(Point::new(2.0, 98.0), Size::new(10.0, 10.0), 100, 100, 100);
        assert_eq!(edge, PatchBox { x: 0, y: 93, width: 7, height: 7 });
    }

    #[test]
    fn test_rgb_region() {
        let data: Vec<u8> = (0..4 * 3 * 3).map(|i| i as u8).collect();
        let img = SourceImage::from_rgb8(4, 3, data).unwrap();
        let px = img.region(&PatchBox { x: 1, y: 1, width: 2, height: 2 });
        assert!(px.mosaic.is_none());
        assert_eq!(px.data.len(), 12);
        // Pixel (1,1) starts at (1 * 4 + 1) * 3 = 15
        assert_eq!(&px.data[..3], &[15.0, 16.0, 17.0]);
        assert_eq!(img.white_level(), 255.0);
    }

    #[test]
    fn test_mosaic_region_keeps_origin() {
        let img = SourceImage::from_mosaic(4, 4, vec![7; 16], CfaPattern::RGGB, 4095.0).unwrap();
        let px = img.region(&PatchBox { x: 1, y: 2, width: 3, height: 2 });
        let info = px.mosaic.unwrap();
        assert_eq!((info.origin_x, info.origin_y), (1, 2));
        assert_eq!(px.data.len(), 6);
    }

    #[test]
    fn test_region_outside_image_is_empty() {
        let img = SourceImage::from_rgb8(4, 3, vec![9; 4 * 3 * 3]).unwrap();
        let past = img.region(&PatchBox { x: 10, y: 1, width: 5, height: 5 });
        assert_eq!((past.width, past.height), (0, 2));
        assert!(past.data.is_empty());

        let below = img.region(&PatchBox { x: 0, y: 7, width: usize::MAX, height: 2 });
        assert_eq!((below.width, below.height), (4, 0));

        let overlap = img.region(&PatchBox { x: 3, y: 2, width: 4, height: 4 });
        assert_eq!((overlap.width, overlap.height), (1, 1));
        assert_eq!(overlap.data, vec![9.0; 3]);

        let raw = SourceImage::from_mosaic(4, 4, vec![7; 16], CfaPattern::RGGB, 4095.0).unwrap();
        let past = raw.region(&PatchBox { x: 6, y: 6, width: 2, height: 2 });
        assert!(past.data.is_empty());
        assert_eq!(sample(&past, &SamplerConfig::default()).method, SamplingMethod::NotApplicable);
    }

    #[test]
    fn test_buffer_length_checked() {
        assert!(matches!(
            SourceImage::from_rgb16(2, 2, vec![0; 11]),
            Err(Error::ImageMismatch(_))
        ));
        assert!(PatchPixels::rgb(2, 2, vec![0.0; 4]).is_err());
    }
}
