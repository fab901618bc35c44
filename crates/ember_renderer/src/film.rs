//! Shared accumulation buffer that every render thread writes into.

use crate::error::RenderError;
use crate::material::Color;
use image::{Rgb, RgbImage};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Written for pixels that received a non-finite sample.
pub const ERROR_COLOR: Color = Color::new(1.0, 0.0, 1.0);

/// `f32` stored as bits in an `AtomicU32`, with a lock-free add.
#[derive(Debug, Default)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn add(&self, value: f32) {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f32::from_bits(current) + value).to_bits();
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

#[derive(Debug, Default)]
struct FilmPixel {
    rgb: [AtomicF32; 3],
    error: AtomicBool,
}

/// Image-sized grid of radiance sums plus a per-pixel error flag.
///
/// Safe to update from many threads at once through `&Film`.
#[derive(Debug)]
pub struct Film {
    width: u32,
    height: u32,
    pixels: Vec<FilmPixel>,
}

impl Film {
    pub fn new(width: u32, height: u32) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: (0..count).map(|_| FilmPixel::default()).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn pixel_at(&self, x: u32, y: u32) -> Option<&FilmPixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize)
    }

    /// Add `color` to the running sum of pixel (x, y). Out-of-range pixels are ignored.
    pub fn accumulate(&self, x: u32, y: u32, color: Color) {
        if let Some(pixel) = self.pixel_at(x, y) {
            pixel.rgb[0].add(color.x);
            pixel.rgb[1].add(color.y);
            pixel.rgb[2].add(color.z);
        }
    }

    pub fn mark_error(&self, x: u32, y: u32) {
        if let Some(pixel) = self.pixel_at(x, y) {
            pixel.error.store(true, Ordering::Relaxed);
        }
    }

    pub fn has_error(&self, x: u32, y: u32) -> bool {
        self.pixel_at(x, y)
            .is_some_and(|p| p.error.load(Ordering::Relaxed))
    }

    pub fn error_count(&self) -> usize {
        self.pixels
            .iter()
            .filter(|p| p.error.load(Ordering::Relaxed))
            .count()
    }

    /// Raw accumulated sum of pixel (x, y).
    pub fn sum(&self, x: u32, y: u32) -> Color {
        self.pixel_at(x, y).map_or(Color::ZERO, |p| {
            Color::new(p.rgb[0].load(), p.rgb[1].load(), p.rgb[2].load())
        })
    }

    /// Convert to 8-bit sRGB-ish output.
    ///
    /// Each sum is multiplied by `scale` (usually `1 / samples`), clamped to
    /// `[0, 1]`, gamma corrected with a square root and quantized. Flagged
    /// pixels are written as [`ERROR_COLOR`].
    pub fn finalize(&self, scale: f32) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let color = if self.has_error(x, y) {
                ERROR_COLOR
            } else {
                self.sum(x, y) * scale
            };
            Rgb(color_to_rgb(color))
        })
    }

    /// Finalize and write the image; the format follows the file extension.
    pub fn save(&self, path: impl AsRef<Path>, scale: f32) -> Result<(), RenderError> {
        let path = path.as_ref();
        self.finalize(scale).save(path)?;
        log::info!("Saved {}x{} image to {}", self.width, self.height, path.display());
        Ok(())
    }
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a linear color to gamma-corrected 8-bit RGB.
pub fn color_to_rgb(color: Color) -> [u8; 3] {
    let quantize = |c: f32| (255.99 * linear_to_gamma(c.clamp(0.0, 1.0))) as u8;
    [quantize(color.x), quantize(color.y), quantize(color.z)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_linear_to_gamma() {
        assert_eq!(linear_to_gamma(0.0), 0.0);
        assert_eq!(linear_to_gamma(-1.0), 0.0);
        assert!((linear_to_gamma(1.0) - 1.0).abs() < 0.0001);
        assert!((linear_to_gamma(0.25) - 0.5).abs() < 0.0001);
    }

    #[test]
    fn test_color_to_rgb_clamps() {
        assert_eq!(color_to_rgb(Color::new(4.0, -1.0, 0.25)), [255, 0, 127]);
        assert_eq!(color_to_rgb(Color::ONE), [255, 255, 255]);
    }

    #[test]
    fn test_film_accumulate_and_finalize() {
        let film = Film::new(2, 1);
        film.accumulate(0, 0, Color::splat(1.0));
        film.accumulate(0, 0, Color::splat(0.0));
        film.accumulate(1, 0, Color::splat(4.0));

        let image = film.finalize(0.5);
        // mean 0.5 -> sqrt -> 0.707
        assert_eq!(image.get_pixel(0, 0)[0], (255.99 * 0.5f32.sqrt()) as u8);
        assert_eq!(image.get_pixel(1, 0)[1], 255);
    }

    #[test]
    fn test_film_error_pixels_use_error_color() {
        let film = Film::new(2, 2);
        film.accumulate(1, 1, Color::splat(0.5));
        film.mark_error(1, 1);

        assert!(film.has_error(1, 1));
        assert!(!film.has_error(0, 0));
        assert_eq!(film.error_count(), 1);
        assert_eq!(film.finalize(1.0).get_pixel(1, 1).0, [255, 0, 255]);
    }

    #[test]
    fn test_film_ignores_out_of_range() {
        let film = Film::new(1, 1);
        film.accumulate(5, 0, Color::ONE);
        film.mark_error(0, 7);
        assert_eq!(film.sum(0, 0), Color::ZERO);
        assert_eq!(film.error_count(), 0);
    }

    #[test]
    fn test_film_concurrent_accumulate() {
        let film = Arc::new(Film::new(1, 1));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let film = Arc::clone(&film);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        film.accumulate(0, 0, Color::ONE);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(film.sum(0, 0), Color::splat(8000.0));
    }
}
