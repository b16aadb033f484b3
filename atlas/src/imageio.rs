//! Raw frame reading and PNG export.
//!
//! Capture dumps are headerless palette-index bytes in row-major order,
//! named by frame number. Results are exported as RGB PNGs.

use std::fs;
use std::path::{Path, PathBuf};

use common::Buffer2;
use image::RgbImage;

use crate::error::{Error, Result};
use crate::feed::{Feed, Frame};
use crate::palette::{self, Nat};
use crate::scratch::FramePool;
use crate::types::{Dimensions, Rect};

/// Read one raw frame dump, validating every palette index.
pub fn read_raw(path: &Path, dims: Dimensions) -> Result<Buffer2<Nat>> {
    let bytes = read_raw_bytes(path, dims)?;
    Ok(Buffer2::new(
        dims.width,
        dims.height,
        bytemuck::cast_slice(&bytes[..dims.area()]).to_vec(),
    ))
}

fn read_raw_bytes(path: &Path, dims: Dimensions) -> Result<Vec<u8>> {
    let bytes = fs::read(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.len() < dims.area() {
        return Err(Error::Truncated {
            path: path.to_path_buf(),
        });
    }
    for (offset, &value) in bytes[..dims.area()].iter().enumerate() {
        if value > 15 {
            return Err(Error::InvalidColor { value, offset });
        }
    }
    Ok(bytes)
}

/// Write a palette-indexed image as an RGB PNG.
pub fn write_png(path: &Path, image: &Buffer2<Nat>) -> Result<()> {
    let mut rgb = Vec::with_capacity(image.len() * 3);
    for &pixel in image.iter() {
        rgb.extend_from_slice(&palette::rgb(pixel));
    }

    let encoded = RgbImage::from_raw(image.width() as u32, image.height() as u32, rgb)
        .expect("buffer length matches dimensions");
    encoded.save(path).map_err(|source| Error::Png {
        path: path.to_path_buf(),
        source,
    })
}

/// Feed over a directory of numerically named raw frame dumps.
#[derive(Debug)]
pub struct FileFeed {
    screen: Dimensions,
    files: Vec<PathBuf>,
    next: usize,
    crop: Option<Rect>,
}

impl FileFeed {
    pub fn from_dir(dir: &Path, screen: Dimensions) -> Result<Self> {
        let entries = fs::read_dir(dir).map_err(|source| Error::Read {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files: Vec<(usize, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| Error::Read {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if let Some(number) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.parse::<usize>().ok())
            {
                files.push((number, path));
            }
        }
        files.sort_unstable_by_key(|&(number, _)| number);

        Ok(Self {
            screen,
            files: files.into_iter().map(|(_, path)| path).collect(),
            next: 0,
            crop: None,
        })
    }

    /// Produce frames cropped to `window` instead of the full screen.
    pub fn with_crop(mut self, window: Rect) -> Self {
        self.crop = Some(window);
        self
    }

    fn frame_dims(&self) -> Dimensions {
        self.crop.map_or(self.screen, |rect| rect.dimensions())
    }
}

impl Feed for FileFeed {
    fn has_more(&self) -> bool {
        self.next < self.files.len()
    }

    fn produce(&mut self, pool: &mut FramePool) -> Result<Frame> {
        let path = self.files.get(self.next).ok_or(Error::FeedExhausted)?;
        let bytes = read_raw_bytes(path, self.screen)?;
        let pixels: &[Nat] = bytemuck::cast_slice(&bytes[..self.screen.area()]);

        let window = self
            .crop
            .unwrap_or_else(|| Rect::from_origin_dims(glam::IVec2::ZERO, self.screen));
        let dims = self.frame_dims();

        let mut image = if pool.dimensions() == dims {
            pool.acquire()
        } else {
            Buffer2::new_default(dims.width, dims.height)
        };
        for y in 0..dims.height {
            let src = (window.top as usize + y) * self.screen.width + window.left as usize;
            image
                .row_mut(y)
                .copy_from_slice(&pixels[src..src + dims.width]);
        }

        let frame = Frame {
            number: self.next,
            image,
        };
        self.next += 1;
        Ok(frame)
    }
}
