//! Raw pixel tiles and their color-space metadata.
//!
//! A [`Tile`] is an immutable block of channel samples together with the
//! metadata needed to interpret it: color model, channel numeric type, and
//! whether channels are interleaved per pixel or stored as separate planes.
//! Sample bytes are held in [`Bytes`], so handing a tile to a cache or a
//! caller is a reference-count bump rather than a copy.
//!
//! Tiles are built through [`TileBuffer`], which is the only mutable form.

use bytes::Bytes;

use crate::error::TileError;

use super::geometry::Rect;

// =============================================================================
// Color Space
// =============================================================================

/// Channel arrangement of a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorModel {
    Grayscale,
    Rgb,
    Bgr,
    Rgba,
    Bgra,
}

impl ColorModel {
    /// Number of channels per pixel.
    pub fn channels(&self) -> usize {
        match self {
            ColorModel::Grayscale => 1,
            ColorModel::Rgb | ColorModel::Bgr => 3,
            ColorModel::Rgba | ColorModel::Bgra => 4,
        }
    }

    /// Whether color channels are stored blue first.
    pub fn is_reversed(&self) -> bool {
        matches!(self, ColorModel::Bgr | ColorModel::Bgra)
    }
}

/// Numeric type of a single channel sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelType {
    UInt8,
    UInt16,
}

impl ChannelType {
    /// Largest representable sample value.
    pub fn max_value(&self) -> u16 {
        match self {
            ChannelType::UInt8 => u8::MAX as u16,
            ChannelType::UInt16 => u16::MAX,
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        match self {
            ChannelType::UInt8 => 1,
            ChannelType::UInt16 => 2,
        }
    }
}

/// Color model plus channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorSpace {
    pub model: ColorModel,
    pub channel: ChannelType,
}

impl ColorSpace {
    pub const fn new(model: ColorModel, channel: ChannelType) -> Self {
        Self { model, channel }
    }

    /// 8-bit RGBA, the color space of every threshold mask.
    pub const fn rgba8() -> Self {
        Self::new(ColorModel::Rgba, ChannelType::UInt8)
    }

    pub fn channels(&self) -> usize {
        self.model.channels()
    }

    /// Largest representable sample value.
    pub fn max_channel_value(&self) -> u16 {
        self.channel.max_value()
    }
}

/// How channel samples are laid out in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelOrder {
    /// `RGB RGB RGB ...`
    Interleaved,
    /// `RRR... GGG... BBB...`
    Planar,
}

impl PixelOrder {
    /// Flat sample index of `channel` of pixel `pixel`.
    #[inline]
    pub fn sample_index(
        &self,
        pixel: usize,
        channel: usize,
        channels: usize,
        num_pixels: usize,
    ) -> usize {
        match self {
            PixelOrder::Interleaved => pixel * channels + channel,
            PixelOrder::Planar => channel * num_pixels + pixel,
        }
    }
}

// =============================================================================
// Tile Request
// =============================================================================

/// Identifies a tile: a region of one pyramid level.
///
/// This is also the cache key of every caching stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRequest {
    /// Pyramid level (0 = highest resolution)
    pub level: usize,

    /// Region in the pixel space of `level`
    pub region: Rect,
}

impl TileRequest {
    pub const fn new(level: usize, region: Rect) -> Self {
        Self { level, region }
    }
}

// =============================================================================
// Tile
// =============================================================================

/// An immutable block of raw pixel samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    width: u32,
    height: u32,
    color_space: ColorSpace,
    order: PixelOrder,
    data: Bytes,
}

impl Tile {
    /// Wrap existing sample bytes (little-endian for 16-bit channels).
    ///
    /// # Errors
    ///
    /// Returns [`TileError::BufferSize`] if `data` does not hold exactly
    /// `width * height * channels` samples.
    pub fn from_samples(
        width: u32,
        height: u32,
        color_space: ColorSpace,
        order: PixelOrder,
        data: impl Into<Bytes>,
    ) -> Result<Self, TileError> {
        let data = data.into();
        let expected = byte_len(width, height, color_space);
        if data.len() != expected {
            return Err(TileError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            color_space,
            order,
            data,
        })
    }

    /// A tile with every sample set to `value`.
    pub fn new_filled(
        width: u32,
        height: u32,
        color_space: ColorSpace,
        order: PixelOrder,
        value: u16,
    ) -> Self {
        TileBuffer::new_filled(width, height, color_space, order, value).freeze()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)` in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn order(&self) -> PixelOrder {
        self.order
    }

    pub fn channels(&self) -> usize {
        self.color_space.channels()
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Raw sample bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Read the sample at a flat index.
    #[inline]
    pub fn sample(&self, index: usize) -> u16 {
        read_sample(&self.data, self.color_space.channel, index)
    }

    /// Flat sample index of `channel` of `pixel`, honoring the pixel order.
    #[inline]
    pub fn sample_index(&self, pixel: usize, channel: usize) -> usize {
        self.order
            .sample_index(pixel, channel, self.channels(), self.pixel_count())
    }

    /// All channel samples of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Vec<u16> {
        let pixel = y as usize * self.width as usize + x as usize;
        (0..self.channels())
            .map(|c| self.sample(self.sample_index(pixel, c)))
            .collect()
    }

    /// Copy out a sub-rectangle.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::RegionOutOfBounds`] if `rect` is not inside the tile.
    pub fn crop(&self, rect: Rect) -> Result<Tile, TileError> {
        let bounds = Rect::new(0, 0, self.width, self.height);
        if !bounds.contains(&rect) {
            return Err(TileError::RegionOutOfBounds {
                level: 0,
                region: rect,
                width: self.width,
                height: self.height,
            });
        }
        if rect == bounds {
            return Ok(self.clone());
        }

        let mut out = TileBuffer::new_filled(rect.width, rect.height, self.color_space, self.order, 0);
        copy_rows(self, rect, &mut out, 0, 0);
        Ok(out.freeze())
    }

    /// Halve both dimensions with a 2x2 box average.
    ///
    /// Odd trailing rows and columns average only the pixels that exist.
    pub fn downsample_by_two(&self) -> Tile {
        let out_w = self.width.div_ceil(2);
        let out_h = self.height.div_ceil(2);
        let channels = self.channels();
        let mut out = TileBuffer::new_filled(out_w, out_h, self.color_space, self.order, 0);
        let out_pixels = out.pixel_count();

        for oy in 0..out_h {
            for ox in 0..out_w {
                let out_pixel = (oy * out_w + ox) as usize;
                for c in 0..channels {
                    let mut sum = 0u32;
                    let mut n = 0u32;
                    for sy in (oy * 2)..(oy * 2 + 2).min(self.height) {
                        for sx in (ox * 2)..(ox * 2 + 2).min(self.width) {
                            let pixel = (sy * self.width + sx) as usize;
                            sum += self.sample(self.sample_index(pixel, c)) as u32;
                            n += 1;
                        }
                    }
                    let value = ((sum + n / 2) / n) as u16;
                    let index = self.order.sample_index(out_pixel, c, channels, out_pixels);
                    out.set_sample(index, value);
                }
            }
        }
        out.freeze()
    }

    /// Same pixels with interleaved channel order.
    pub fn to_interleaved(&self) -> Tile {
        if self.order == PixelOrder::Interleaved {
            return self.clone();
        }
        let channels = self.channels();
        let pixels = self.pixel_count();
        let mut out = TileBuffer::new_filled(
            self.width,
            self.height,
            self.color_space,
            PixelOrder::Interleaved,
            0,
        );
        for pixel in 0..pixels {
            for c in 0..channels {
                out.set_sample(pixel * channels + c, self.sample(c * pixels + pixel));
            }
        }
        out.freeze()
    }
}

// =============================================================================
// Tile Buffer
// =============================================================================

/// Mutable sample storage that freezes into a [`Tile`].
#[derive(Debug, Clone)]
pub struct TileBuffer {
    width: u32,
    height: u32,
    color_space: ColorSpace,
    order: PixelOrder,
    data: Vec<u8>,
}

impl TileBuffer {
    pub fn new_filled(
        width: u32,
        height: u32,
        color_space: ColorSpace,
        order: PixelOrder,
        value: u16,
    ) -> Self {
        let len = byte_len(width, height, color_space);
        let data = match color_space.channel {
            ChannelType::UInt8 => vec![value as u8; len],
            ChannelType::UInt16 => value.to_le_bytes().repeat(len / 2),
        };
        Self {
            width,
            height,
            color_space,
            order,
            data,
        }
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn order(&self) -> PixelOrder {
        self.order
    }

    pub fn channels(&self) -> usize {
        self.color_space.channels()
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Write the sample at a flat index.
    #[inline]
    pub fn set_sample(&mut self, index: usize, value: u16) {
        match self.color_space.channel {
            ChannelType::UInt8 => self.data[index] = value as u8,
            ChannelType::UInt16 => {
                self.data[index * 2..index * 2 + 2].copy_from_slice(&value.to_le_bytes())
            }
        }
    }

    /// Copy all of `src` into this buffer with its top-left corner at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::ColorSpaceMismatch`] when the color spaces differ,
    /// [`TileError::UnsupportedColorSpace`] when the pixel orders differ, and
    /// [`TileError::RegionOutOfBounds`] when `src` would not fit.
    pub fn blit(&mut self, src: &Tile, x: u32, y: u32) -> Result<(), TileError> {
        if src.color_space != self.color_space {
            return Err(TileError::ColorSpaceMismatch {
                expected: self.color_space,
                actual: src.color_space,
            });
        }
        if src.order != self.order {
            return Err(TileError::UnsupportedColorSpace(src.color_space));
        }
        let target = Rect::new(x, y, src.width, src.height);
        if !Rect::new(0, 0, self.width, self.height).contains(&target) {
            return Err(TileError::RegionOutOfBounds {
                level: 0,
                region: target,
                width: self.width,
                height: self.height,
            });
        }
        copy_rows(src, Rect::new(0, 0, src.width, src.height), self, x, y);
        Ok(())
    }

    pub fn freeze(self) -> Tile {
        Tile {
            width: self.width,
            height: self.height,
            color_space: self.color_space,
            order: self.order,
            data: Bytes::from(self.data),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn byte_len(width: u32, height: u32, color_space: ColorSpace) -> usize {
    width as usize * height as usize * color_space.channels() * color_space.channel.bytes_per_sample()
}

#[inline]
fn read_sample(data: &[u8], channel: ChannelType, index: usize) -> u16 {
    match channel {
        ChannelType::UInt8 => data[index] as u16,
        ChannelType::UInt16 => u16::from_le_bytes([data[index * 2], data[index * 2 + 1]]),
    }
}

/// Copy `rect` of `src` into `dst` at `(dst_x, dst_y)`, one contiguous row
/// segment at a time. Both sides must share color space and pixel order.
fn copy_rows(src: &Tile, rect: Rect, dst: &mut TileBuffer, dst_x: u32, dst_y: u32) {
    let bps = src.color_space.channel.bytes_per_sample();
    let channels = src.channels();
    let (src_w, dst_w) = (src.width as usize, dst.width as usize);
    let (src_n, dst_n) = (src.pixel_count(), dst.pixel_count());

    for row in 0..rect.height as usize {
        let src_pixel = (rect.y as usize + row) * src_w + rect.x as usize;
        let dst_pixel = (dst_y as usize + row) * dst_w + dst_x as usize;
        match src.order {
            PixelOrder::Interleaved => {
                let len = rect.width as usize * channels * bps;
                let s = src_pixel * channels * bps;
                let d = dst_pixel * channels * bps;
                dst.data[d..d + len].copy_from_slice(&src.data[s..s + len]);
            }
            PixelOrder::Planar => {
                let len = rect.width as usize * bps;
                for c in 0..channels {
                    let s = (c * src_n + src_pixel) * bps;
                    let d = (c * dst_n + dst_pixel) * bps;
                    dst.data[d..d + len].copy_from_slice(&src.data[s..s + len]);
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
