//! Offscreen pixel buffer and the surface it is presented on

use crate::error::Result;

/// 32-bit pixels, row-major, top row first. Each pixel is `0x00RRGGBB`.
#[derive(Debug, Clone)]
pub struct OffscreenBuffer {
    pixels: Vec<u32>,
    width: usize,
    height: usize,
}

impl OffscreenBuffer {
    pub const BYTES_PER_PIXEL: usize = 4;

    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height],
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Bytes per row
    pub fn pitch(&self) -> usize {
        self.width * Self::BYTES_PER_PIXEL
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [u32] {
        let start = y * self.width;
        &mut self.pixels[start..start + self.width]
    }
}

/// Write-only display sink
pub trait Presenter {
    fn present(&mut self, buffer: &OffscreenBuffer) -> Result<()>;
}

/// Presenter that drops every frame
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn present(&mut self, _buffer: &OffscreenBuffer) -> Result<()> {
        Ok(())
    }
}

/// Presenter that counts frames and remembers the last one's checksum
#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumPresenter {
    pub frames: u64,
    pub last_checksum: u64,
}

impl Presenter for ChecksumPresenter {
    fn present(&mut self, buffer: &OffscreenBuffer) -> Result<()> {
        self.frames += 1;
        self.last_checksum = buffer
            .pixels()
            .iter()
            .fold(0u64, |acc, &p| acc.rotate_left(5) ^ p as u64);
        Ok(())
    }
}
