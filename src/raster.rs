// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Pixel buffers and the blend that merges into them.
//!
//! Every write into a raster goes through `Rgb::lighten`, a per-channel
//! maximum; the shared raster takes the same maximum one atomic channel
//! at a time.  Max is commutative, associative and idempotent, so the
//! finished image does not depend on the order in which points arrive
//! or on how often the same point is plotted.  That is what lets the
//! backends merge work from many units without ordering them.

use crate::error::{RenderError, Result};
use crate::planes::Pixel;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};

const CHANNELS: usize = 3;

/// A 24-bit color.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Nothing drawn yet.
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    /// Every channel saturated.
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    /// The per-channel maximum of two colors.
    #[inline]
    pub fn lighten(self, other: Rgb) -> Rgb {
        Rgb(self.0.max(other.0), self.1.max(other.1), self.2.max(other.2))
    }

    fn channels(self) -> [u8; CHANNELS] {
        [self.0, self.1, self.2]
    }
}

fn buffer_len(what: &'static str, width: usize, height: usize) -> Result<usize> {
    width
        .checked_mul(height)
        .and_then(|pixels| pixels.checked_mul(CHANNELS))
        .ok_or(RenderError::Resource {
            what,
            bytes: usize::max_value(),
        })
}

fn allocate<T>(what: &'static str, len: usize) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| RenderError::Resource { what, bytes: len })?;
    Ok(buffer)
}

/// A row-major RGB image owned by one writer.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Raster {
    /// An all-black image.  Fails, rather than aborting, when the
    /// buffer cannot be allocated.
    pub fn new(width: usize, height: usize) -> Result<Raster> {
        let len = buffer_len("raster", width, height)?;
        let mut pixels = allocate("raster", len)?;
        pixels.resize(len, 0);
        Ok(Raster {
            width,
            height,
            pixels,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The raw bytes, three per pixel, rows from y = 0 upwards.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    fn offset(&self, pixel: Pixel) -> Option<usize> {
        if pixel.0 < self.width && pixel.1 < self.height {
            Some((pixel.1 * self.width + pixel.0) * CHANNELS)
        } else {
            None
        }
    }

    /// The color at a pixel, if the pixel is on the image.
    pub fn get(&self, pixel: Pixel) -> Option<Rgb> {
        self.offset(pixel)
            .map(|o| Rgb(self.pixels[o], self.pixels[o + 1], self.pixels[o + 2]))
    }

    /// Lighten a pixel toward `color`.  Returns false, changing
    /// nothing, when the pixel is off the image.
    pub fn blend(&mut self, pixel: Pixel, color: Rgb) -> bool {
        match self.offset(pixel) {
            Some(o) => {
                let stored = Rgb(self.pixels[o], self.pixels[o + 1], self.pixels[o + 2]);
                self.pixels[o..o + CHANNELS].copy_from_slice(&stored.lighten(color).channels());
                true
            }
            None => false,
        }
    }

    /// How many pixels have anything drawn on them.
    pub fn lit(&self) -> usize {
        self.pixels
            .chunks(CHANNELS)
            .filter(|px| px.iter().any(|c| *c != 0))
            .count()
    }

    /// Write the image as a binary PPM: the header
    /// `P6\n<width> <height>\n255\n` followed by the pixel bytes.
    pub fn write_ppm<W: Write>(&self, out: &mut W) -> Result<()> {
        write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;
        out.write_all(&self.pixels)?;
        out.flush()?;
        Ok(())
    }
}

/// A raster that many threads blend into at once.  Each channel is an
/// atomic byte updated with `fetch_max`, so concurrent writes to the
/// same pixel cannot tear, and the result is the same whatever order
/// they land in.
#[derive(Debug)]
pub struct SharedRaster {
    width: usize,
    height: usize,
    channels: Vec<AtomicU8>,
}

impl SharedRaster {
    /// An all-black shared image.
    pub fn new(width: usize, height: usize) -> Result<SharedRaster> {
        let len = buffer_len("shared raster", width, height)?;
        let mut channels = allocate("shared raster", len)?;
        channels.extend((0..len).map(|_| AtomicU8::new(0)));
        Ok(SharedRaster {
            width,
            height,
            channels,
        })
    }

    /// Lighten a pixel toward `color`.  Returns false when the pixel is
    /// off the image.
    pub fn blend(&self, pixel: Pixel, color: Rgb) -> bool {
        if pixel.0 >= self.width || pixel.1 >= self.height {
            return false;
        }
        let o = (pixel.1 * self.width + pixel.0) * CHANNELS;
        for (channel, incoming) in self.channels[o..o + CHANNELS].iter().zip(&color.channels()) {
            channel.fetch_max(*incoming, Ordering::Relaxed);
        }
        true
    }

    /// Once every writer is done, take the bytes out.
    pub fn into_raster(self) -> Raster {
        Raster {
            width: self.width,
            height: self.height,
            pixels: self.channels.into_iter().map(AtomicU8::into_inner).collect(),
        }
    }
}

/// Somewhere a finished raster goes.
pub trait RasterSink {
    /// Consume the raster.
    fn consume(&mut self, raster: &Raster) -> Result<()>;
}

/// Writes binary PPM to any writer, standard output included.
pub struct PpmSink<W: Write>(pub W);

impl<W: Write> RasterSink for PpmSink<W> {
    fn consume(&mut self, raster: &Raster) -> Result<()> {
        raster.write_ppm(&mut self.0)
    }
}

/// Writes an image file, choosing the format from the extension.
/// `.ppm` and `.pnm` get the binary PPM writer; anything else goes
/// through the `image` crate.
pub struct ImageFileSink {
    path: PathBuf,
}

impl ImageFileSink {
    /// A sink for the file at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ImageFileSink {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn is_pnm(&self) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("ppm") || e.eq_ignore_ascii_case("pnm"))
    }
}

impl RasterSink for ImageFileSink {
    fn consume(&mut self, raster: &Raster) -> Result<()> {
        if self.is_pnm() {
            let mut out = BufWriter::new(File::create(&self.path)?);
            return raster.write_ppm(&mut out);
        }
        let dimension = |v: usize| {
            if v > u32::max_value() as usize {
                Err(RenderError::Output(format!("{} pixels is too large for this format", v)))
            } else {
                Ok(v as u32)
            }
        };
        image::save_buffer(
            &self.path,
            raster.as_bytes(),
            dimension(raster.width())?,
            dimension(raster.height())?,
            image::ColorType::RGB(8),
        )
        .map_err(|e| RenderError::Output(e.to_string()))
    }
}
