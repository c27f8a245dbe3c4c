// fprint.rs — The fingerprint frame buffer and basic image operations.
//
// A frame is one owned allocation the size of the two bulk blocks the
// device sends (0x10000 + 0xb340 bytes). The first 64 bytes are a
// device-produced header; the pixel window starts at byte 64 and spans
// at most 384*289 bytes. `data_size` tracks how many pixel bytes a
// capture actually delivered; partial frames are possible, and any
// operation that walks rows refuses a frame holding less than one row.

use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::minutiae::MinutiaeSet;
use crate::transport::{DATABLK1_RQSIZE, DATABLK2_RQSIZE};
use crate::{IMG_HEIGHT, IMG_WIDTH};

/// Size of the device header at the start of each capture.
pub const HEADER_SIZE: usize = 64;

const FRAME_BYTES: usize = DATABLK1_RQSIZE + DATABLK2_RQSIZE;
const PIXEL_WINDOW: usize = IMG_WIDTH * IMG_HEIGHT;

/// A captured (or synthetic) grayscale fingerprint image.
pub struct Frame {
    buf: Vec<u8>,
    header_size: usize,
    data_size: usize,
}

impl Frame {
    /// Allocate an empty frame. `data_size` stays 0 until a capture or
    /// load fills it in.
    pub fn new() -> Self {
        Frame {
            buf: vec![0u8; FRAME_BYTES],
            header_size: 0,
            data_size: 0,
        }
    }

    /// Allocate a zeroed full-size frame (`data_size` = 384*289). Used
    /// for synthetic images such as region masks.
    pub fn full() -> Self {
        let mut fp = Frame::new();
        fp.header_size = HEADER_SIZE;
        fp.data_size = PIXEL_WINDOW;
        fp
    }

    /// Build a frame from raw pixel bytes (row-major, top-left origin).
    pub fn with_pixels(pixels: &[u8]) -> Result<Self> {
        if pixels.len() > PIXEL_WINDOW {
            return Err(Error::InvalidInput("more pixels than a frame holds"));
        }
        let mut fp = Frame::new();
        fp.buf[HEADER_SIZE..HEADER_SIZE + pixels.len()].copy_from_slice(pixels);
        fp.data_size = pixels.len();
        fp.header_size = HEADER_SIZE;
        Ok(fp)
    }

    /// Number of valid pixel bytes. At most 384*289; captures may
    /// deliver fewer.
    pub fn data_size(&self) -> usize {
        self.data_size
    }

    pub fn header_size(&self) -> usize {
        self.header_size
    }

    /// Number of complete pixel rows.
    pub fn rows(&self) -> usize {
        self.data_size / IMG_WIDTH
    }

    /// The device header bytes of the last capture.
    pub fn header(&self) -> &[u8] {
        &self.buf[..HEADER_SIZE]
    }

    /// The valid pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.buf[HEADER_SIZE..HEADER_SIZE + self.data_size]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.buf[HEADER_SIZE..HEADER_SIZE + self.data_size]
    }

    /// The full 384*289 pixel window, regardless of `data_size`. The
    /// pipeline kernels operate on this view; bytes beyond `data_size`
    /// are whatever the allocation holds (zero unless captured into).
    pub fn pixels(&self) -> &[u8] {
        &self.buf[HEADER_SIZE..HEADER_SIZE + PIXEL_WINDOW]
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.buf[HEADER_SIZE..HEADER_SIZE + PIXEL_WINDOW]
    }

    /// Whole capture buffer, for the bulk reader.
    pub(crate) fn raw_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Record the outcome of a capture of `total` bytes. The pixel
    /// count is capped at the window size; a full double-block read
    /// carries one trailing row beyond the nominal image.
    pub(crate) fn set_capture_sizes(&mut self, total: usize) {
        self.header_size = HEADER_SIZE;
        self.data_size = total.saturating_sub(HEADER_SIZE).min(PIXEL_WINDOW);
    }

    /// Zero the full pixel window.
    pub fn clear(&mut self) {
        self.pixels_mut().fill(0);
    }

    /// In-place vertical flip (top row swaps with bottom row).
    pub fn flip_v(&mut self) -> Result<()> {
        let rows = self.require_rows()?;
        let data = self.data_mut();
        for i in 0..rows / 2 {
            let top = i * IMG_WIDTH;
            let bot = (rows - 1 - i) * IMG_WIDTH;
            for x in 0..IMG_WIDTH {
                data.swap(top + x, bot + x);
            }
        }
        Ok(())
    }

    /// In-place horizontal flip (each row reversed).
    pub fn flip_h(&mut self) -> Result<()> {
        let rows = self.require_rows()?;
        let data = self.data_mut();
        for i in 0..rows {
            data[i * IMG_WIDTH..(i + 1) * IMG_WIDTH].reverse();
        }
        Ok(())
    }

    /// `self = |self - other|`, element-wise. Both frames must hold the
    /// same amount of pixel data.
    pub fn subtract(&mut self, other: &Frame) -> Result<()> {
        self.require_rows()?;
        if self.data_size != other.data_size {
            return Err(Error::SizeMismatch {
                a: self.data_size,
                b: other.data_size,
            });
        }
        for (a, b) in self.data_mut().iter_mut().zip(other.data()) {
            *a = a.abs_diff(*b);
        }
        Ok(())
    }

    /// Threshold into a binary ridge image: pixels darker than `limit`
    /// become 0xff (ridge), the rest 0. Runs over the full window.
    pub fn binarize(&mut self, limit: u8) {
        for p in self.pixels_mut() {
            *p = if *p < limit { 0xff } else { 0 };
        }
    }

    /// Mean-filter smoothing over a `size`-pixel square window.
    pub fn soften_mean(&mut self, size: usize) -> Result<()> {
        if size < 2 {
            return Err(Error::InvalidInput("soften window too small"));
        }
        let half = size / 2;
        let area = (size * size) as u32;

        let copy = self.pixels().to_vec();
        let buf = self.pixels_mut();

        for y in half..IMG_HEIGHT - half {
            for x in half..IMG_WIDTH - half {
                let mut c = 0u32;
                for q in 0..=2 * half {
                    let row = (y + q - half) * IMG_WIDTH;
                    for p in 0..=2 * half {
                        c += copy[row + x + p - half] as u32;
                    }
                }
                buf[x + y * IMG_WIDTH] = (c / area) as u8;
            }
        }
        Ok(())
    }

    /// Mark each minutia as a white pixel. Pairs with `clear` to render
    /// a detection result.
    pub fn plot(&mut self, mset: &MinutiaeSet) {
        let buf = self.pixels_mut();
        for m in mset.iter() {
            buf[m.y as usize * IMG_WIDTH + m.x as usize] = 0xff;
        }
    }

    /// Write the frame as a binary PGM (P5) file.
    pub fn write_pgm<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if self.data_size == 0 {
            return Err(Error::NoData);
        }
        let rows = self.require_rows()?;
        if rows > 999 {
            return Err(Error::ImageTooTall(rows));
        }

        let mut f = fs::File::create(path)?;
        write!(f, "P5 {IMG_WIDTH} {rows} 255 ")?;
        f.write_all(&self.data()[..rows * IMG_WIDTH])?;
        Ok(())
    }

    /// Load pixel data from a PGM file written by this library (or any
    /// P5 file with the fixed 15-byte header convention).
    pub fn load_pgm<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut f = fs::File::open(path)?;
        f.seek(SeekFrom::Start(15))?;

        let mut fp = Frame::new();
        let mut total = 0;
        loop {
            let n = f.read(&mut fp.buf[HEADER_SIZE + total..HEADER_SIZE + PIXEL_WINDOW])?;
            if n == 0 {
                break;
            }
            total += n;
            if total == PIXEL_WINDOW {
                break;
            }
        }
        fp.header_size = HEADER_SIZE;
        fp.data_size = total;
        Ok(fp)
    }

    fn require_rows(&self) -> Result<usize> {
        if self.data_size < IMG_WIDTH {
            return Err(Error::InvalidInput("frame holds less than one row"));
        }
        Ok(self.data_size / IMG_WIDTH)
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_pixels_rejects_oversize() {
        let too_big = vec![0u8; PIXEL_WINDOW + 1];
        assert!(Frame::with_pixels(&too_big).is_err());
    }

    #[test]
    fn capture_sizes_are_capped_at_window() {
        let mut fp = Frame::new();
        fp.set_capture_sizes(DATABLK1_RQSIZE + DATABLK2_RQSIZE);
        assert_eq!(fp.header_size(), HEADER_SIZE);
        assert_eq!(fp.data_size(), PIXEL_WINDOW);
    }

    #[test]
    fn row_ops_refuse_sub_row_frames() {
        let mut fp = Frame::with_pixels(&[7u8; 100]).unwrap();
        assert!(fp.flip_v().is_err());
        assert!(fp.flip_h().is_err());
        assert!(fp.write_pgm("/tmp/should_not_exist.pgm").is_err());
    }

    #[test]
    fn binarize_thresholds_below_limit() {
        let mut fp = Frame::with_pixels(&[0x10, 0x80, 0xff, 0x7f]).unwrap();
        fp.binarize(0x80);
        assert_eq!(&fp.pixels()[..4], &[0xff, 0, 0, 0xff]);
    }
}
