//! On-disk fragment checkpoints between pipeline stages.
//!
//! One file per fragment, named by its index, all fields little-endian:
//! dimensions (2 x u64), the dot plane (area x 16 x u16), origin (2 x i32),
//! frame count (u64), then per frame: number (u64), position (2 x i32) and
//! the two length-prefixed compressed payloads.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use common::Buffer2;
use glam::IVec2;

use crate::error::{Error, Result};
use crate::fragment::{Dot, Fragment, FramePayload, FrameRecord};
use crate::types::Dimensions;

pub fn write_fragments(dir: &Path, fragments: &[Fragment]) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| Error::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    for (index, fragment) in fragments.iter().enumerate() {
        let path = dir.join(index.to_string());
        write_fragment(&path, fragment).map_err(|source| Error::Write {
            path: path.clone(),
            source,
        })?;
    }
    Ok(())
}

pub fn read_fragments(dir: &Path) -> Result<Vec<Fragment>> {
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

    files
        .into_iter()
        .map(|(_, path)| read_fragment(&path))
        .collect()
}

fn write_fragment(path: &Path, fragment: &Fragment) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);

    let dims = fragment.dimensions();
    out.write_all(&(dims.width as u64).to_le_bytes())?;
    out.write_all(&(dims.height as u64).to_le_bytes())?;
    write_dots(&mut out, fragment.dots().pixels())?;

    out.write_all(&fragment.origin().x.to_le_bytes())?;
    out.write_all(&fragment.origin().y.to_le_bytes())?;

    out.write_all(&(fragment.frames().len() as u64).to_le_bytes())?;
    for frame in fragment.frames() {
        out.write_all(&(frame.number as u64).to_le_bytes())?;
        out.write_all(&frame.position.x.to_le_bytes())?;
        out.write_all(&frame.position.y.to_le_bytes())?;

        let empty = Vec::new();
        let (image, median) = frame
            .payload
            .as_ref()
            .map_or((&empty, &empty), |p| (&p.image, &p.median));
        out.write_all(&(image.len() as u64).to_le_bytes())?;
        out.write_all(image)?;
        out.write_all(&(median.len() as u64).to_le_bytes())?;
        out.write_all(median)?;
    }

    out.flush()
}

fn read_fragment(path: &Path) -> Result<Fragment> {
    let file = File::open(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut input = BufReader::new(file);

    read_fragment_from(&mut input, path).map_err(|error| match error {
        ReadError::Io(source) if source.kind() == io::ErrorKind::UnexpectedEof => {
            Error::Truncated {
                path: path.to_path_buf(),
            }
        }
        ReadError::Io(source) => Error::Read {
            path: path.to_path_buf(),
            source,
        },
        ReadError::Corrupt => Error::Truncated {
            path: path.to_path_buf(),
        },
    })
}

enum ReadError {
    Io(io::Error),
    Corrupt,
}

impl From<io::Error> for ReadError {
    fn from(source: io::Error) -> Self {
        ReadError::Io(source)
    }
}

fn read_fragment_from<R: Read>(input: &mut R, path: &Path) -> std::result::Result<Fragment, ReadError> {
    let width = read_u64(input)? as usize;
    let height = read_u64(input)? as usize;
    let dims = Dimensions::new(width, height);
    if dims.area() == 0 || dims.area() > (1 << 32) {
        tracing::warn!(?path, width, height, "implausible fragment dimensions");
        return Err(ReadError::Corrupt);
    }

    let dots = read_dots(input, dims)?;
    let origin = IVec2::new(read_i32(input)?, read_i32(input)?);

    let count = read_u64(input)? as usize;
    let mut frames = Vec::with_capacity(count.min(1 << 20));
    for _ in 0..count {
        let number = read_u64(input)? as usize;
        let position = IVec2::new(read_i32(input)?, read_i32(input)?);

        let image = read_bytes(input)?;
        let median = read_bytes(input)?;
        let payload = if image.is_empty() && median.is_empty() {
            None
        } else {
            Some(FramePayload { image, median })
        };

        frames.push(FrameRecord {
            number,
            position,
            payload,
        });
    }

    Ok(Fragment::from_parts(
        dots,
        origin,
        Dimensions::new(1, 1),
        frames,
    ))
}

fn write_dots<W: Write>(out: &mut W, dots: &[Dot]) -> io::Result<()> {
    #[cfg(target_endian = "little")]
    {
        out.write_all(bytemuck::cast_slice(dots))
    }
    #[cfg(target_endian = "big")]
    {
        for dot in dots {
            for &count in dot {
                out.write_all(&count.to_le_bytes())?;
            }
        }
        Ok(())
    }
}

fn read_dots<R: Read>(input: &mut R, dims: Dimensions) -> std::result::Result<Buffer2<Dot>, ReadError> {
    let mut dots: Vec<Dot> = vec![Dot::default(); dims.area()];

    #[cfg(target_endian = "little")]
    input.read_exact(bytemuck::cast_slice_mut(&mut dots))?;

    #[cfg(target_endian = "big")]
    for dot in &mut dots {
        for count in dot.iter_mut() {
            let mut bytes = [0u8; 2];
            input.read_exact(&mut bytes)?;
            *count = u16::from_le_bytes(bytes);
        }
    }

    Ok(Buffer2::new(dims.width, dims.height, dots))
}

fn read_bytes<R: Read>(input: &mut R) -> std::result::Result<Vec<u8>, ReadError> {
    let len = read_u64(input)? as usize;
    if len > (1 << 32) {
        return Err(ReadError::Corrupt);
    }
    let mut bytes = vec![0u8; len];
    input.read_exact(&mut bytes)?;
    Ok(bytes)
}

fn read_u64<R: Read>(input: &mut R) -> io::Result<u64> {
    let mut bytes = [0u8; 8];
    input.read_exact(&mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}

fn read_i32<R: Read>(input: &mut R) -> io::Result<i32> {
    let mut bytes = [0u8; 4];
    input.read_exact(&mut bytes)?;
    Ok(i32::from_le_bytes(bytes))
}
