//! The film collects RGB pixel values rendered tile by tile and writes
//! them to an 8-bit image file.

// std
use std::io::{Error, ErrorKind, Result};
use std::path::Path;
use std::sync::RwLock;
// others
use log::info;
// pbrt
use crate::core::pbrt::{clamp_t, gamma_correct, Float};

/// Pixels of one tile, covering `[p0, p1)`.
#[derive(Debug, Clone)]
pub struct FilmTile {
    pub p0: (u32, u32),
    pub p1: (u32, u32),
    pixels: Vec<[Float; 3]>,
}

impl FilmTile {
    pub fn new(p0: (u32, u32), p1: (u32, u32)) -> Self {
        let n: usize = ((p1.0 - p0.0) * (p1.1 - p0.1)) as usize;
        FilmTile {
            p0,
            p1,
            pixels: vec![[0.0 as Float; 3]; n],
        }
    }
    /// Store *rgb* for the pixel at absolute image position `(x, y)`.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [Float; 3]) {
        assert!(x >= self.p0.0 && x < self.p1.0 && y >= self.p0.1 && y < self.p1.1);
        let width: u32 = self.p1.0 - self.p0.0;
        let offset: usize = ((y - self.p0.1) * width + (x - self.p0.0)) as usize;
        self.pixels[offset] = rgb;
    }
}

pub struct Film {
    pub resolution: (u32, u32),
    pub pixels: RwLock<Vec<[Float; 3]>>,
}

impl Film {
    pub fn new(resolution: (u32, u32)) -> Self {
        Film {
            resolution,
            pixels: RwLock::new(vec![[0.0 as Float; 3]; (resolution.0 * resolution.1) as usize]),
        }
    }
    pub fn merge_film_tile(&self, tile: &FilmTile) {
        let mut pixels = self.pixels.write().unwrap_or_else(|e| e.into_inner());
        let width: u32 = tile.p1.0 - tile.p0.0;
        for y in tile.p0.1..tile.p1.1 {
            for x in tile.p0.0..tile.p1.0 {
                let src: usize = ((y - tile.p0.1) * width + (x - tile.p0.0)) as usize;
                let dst: usize = (y * self.resolution.0 + x) as usize;
                pixels[dst] = tile.pixels[src];
            }
        }
    }
    /// Gamma corrected 8-bit RGB values, row by row.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let pixels = self.pixels.read().unwrap_or_else(|e| e.into_inner());
        let mut buffer: Vec<u8> = Vec::with_capacity(pixels.len() * 3);
        for rgb in pixels.iter() {
            for c in rgb.iter() {
                buffer.push(clamp_t(
                    255.0 as Float * gamma_correct(*c) + 0.5,
                    0.0 as Float,
                    255.0 as Float,
                ) as u8);
            }
        }
        buffer
    }
    pub fn write_image(&self, path: &Path) -> Result<()> {
        info!(
            "Writing image {:?} with resolution {:?}",
            path, self.resolution
        );
        let buffer: Vec<u8> = self.to_rgb8();
        image::save_buffer(
            path,
            &buffer,
            self.resolution.0,
            self.resolution.1,
            image::ColorType::Rgb8,
        )
        .map_err(|e| Error::new(ErrorKind::Other, e))
    }
}
