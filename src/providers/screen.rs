//! Screen capture using xcap
//!
//! xcap handles X11 and Wayland (via portal). Its calls block, so they run on
//! the blocking pool.

use async_trait::async_trait;
use image::{ImageEncoder, RgbaImage};

use super::{Region, ScreenProvider, ScreenSize};

#[derive(Debug, Default)]
pub struct XcapScreen;

impl XcapScreen {
    pub fn new() -> Self {
        Self
    }
}

fn primary_monitor() -> anyhow::Result<xcap::Monitor> {
    let monitors = xcap::Monitor::all()?;
    let primary = monitors
        .iter()
        .position(|m| m.is_primary().unwrap_or(false))
        .unwrap_or(0);
    monitors
        .into_iter()
        .nth(primary)
        .ok_or_else(|| anyhow::anyhow!("No monitors found"))
}

fn size_blocking() -> anyhow::Result<ScreenSize> {
    let monitor = primary_monitor()?;
    Ok(ScreenSize {
        width: monitor.width()?,
        height: monitor.height()?,
    })
}

fn capture_blocking(region: Option<Region>) -> anyhow::Result<Vec<u8>> {
    let full = primary_monitor()?.capture_image()?;
    let image = match region {
        Some(region) => crop(&full, region)?,
        None => full,
    };
    encode_png(&image)
}

fn crop(image: &RgbaImage, region: Region) -> anyhow::Result<RgbaImage> {
    let x = u32::try_from(region.x).unwrap_or(0);
    let y = u32::try_from(region.y).unwrap_or(0);
    if x >= image.width() || y >= image.height() {
        anyhow::bail!(
            "region origin ({}, {}) is outside the {}x{} screen",
            region.x,
            region.y,
            image.width(),
            image.height()
        );
    }
    // crop_imm clamps the size to the image bounds
    Ok(image::imageops::crop_imm(image, x, y, region.width, region.height).to_image())
}

fn encode_png(image: &RgbaImage) -> anyhow::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buffer).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(buffer)
}

#[async_trait]
impl ScreenProvider for XcapScreen {
    fn name(&self) -> &'static str {
        "xcap"
    }

    async fn size(&self) -> anyhow::Result<ScreenSize> {
        tokio::task::spawn_blocking(size_blocking).await?
    }

    async fn capture(&self, region: Option<Region>) -> anyhow::Result<Vec<u8>> {
        tokio::task::spawn_blocking(move || capture_blocking(region)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_clamps_to_bounds() {
        let image = RgbaImage::new(100, 50);
        let region = Region {
            x: 90,
            y: 40,
            width: 30,
            height: 30,
        };
        let cropped = crop(&image, region).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (10, 10));
    }

    #[test]
    fn test_crop_outside_screen_fails() {
        let image = RgbaImage::new(10, 10);
        let region = Region {
            x: 10,
            y: 0,
            width: 1,
            height: 1,
        };
        assert!(crop(&image, region).is_err());
    }

    #[test]
    fn test_png_signature() {
        let png = encode_png(&RgbaImage::new(2, 2)).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
