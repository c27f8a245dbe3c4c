// mask.rs — Region mask from the frequency field.
//
// A pixel belongs to the fingerprint region when its ridge frequency is
// physically plausible (period between 3 and 25 pixels). The raw
// threshold image is then closed morphologically: 4 dilations fill
// holes inside the print, 12 erosions trim the noisy border and leave
// the surviving mask strictly inside the thresholded region.
//
// Dilation and erosion both use the plus-shaped kernel
//     X
//   X X X
//     X
// and a two-phase sweep: candidates are tagged with bit 0x80 while
// scanning, then flattened to full black/white. Tagging avoids growing
// regions within a single pass.

use std::time::Instant;

use crate::field::FrequencyField;
use crate::fprint::Frame;
use crate::{IMG_HEIGHT, IMG_WIDTH};

const FREQ_MIN: f64 = 1.0 / 25.0;
const FREQ_MAX: f64 = 1.0 / 3.0;

const DILATE_PASSES: usize = 4;
const ERODE_PASSES: usize = 12;

/// Build the region mask for an image with the given frequency field.
/// Mask pixels are 0xff inside the usable fingerprint area, 0 outside.
pub fn compute(frequency: &FrequencyField) -> Frame {
    let start = Instant::now();
    let mut mask = Frame::full();

    {
        let out = mask.pixels_mut();
        let freq = frequency.values();
        for (o, &f) in out.iter_mut().zip(freq) {
            *o = if (FREQ_MIN..=FREQ_MAX).contains(&f) {
                0xff
            } else {
                0
            };
        }
    }

    for _ in 0..DILATE_PASSES {
        dilate(mask.pixels_mut());
    }
    for _ in 0..ERODE_PASSES {
        erode(mask.pixels_mut());
    }

    log::debug!("region mask took {:?}", start.elapsed());
    mask
}

fn dilate(buf: &mut [u8]) {
    for y in 1..IMG_HEIGHT - 1 {
        for x in 1..IMG_WIDTH - 1 {
            if buf[x + y * IMG_WIDTH] == 0xff {
                buf[x - 1 + y * IMG_WIDTH] |= 0x80;
                buf[x + 1 + y * IMG_WIDTH] |= 0x80;
                buf[x + (y - 1) * IMG_WIDTH] |= 0x80;
                buf[x + (y + 1) * IMG_WIDTH] |= 0x80;
            }
        }
    }
    for p in buf.iter_mut() {
        if *p != 0 {
            *p = 0xff;
        }
    }
}

fn erode(buf: &mut [u8]) {
    for y in 1..IMG_HEIGHT - 1 {
        for x in 1..IMG_WIDTH - 1 {
            if buf[x + y * IMG_WIDTH] == 0 {
                buf[x - 1 + y * IMG_WIDTH] &= 0x80;
                buf[x + 1 + y * IMG_WIDTH] &= 0x80;
                buf[x + (y - 1) * IMG_WIDTH] &= 0x80;
                buf[x + (y + 1) * IMG_WIDTH] &= 0x80;
            }
        }
    }
    for p in buf.iter_mut() {
        if *p != 0xff {
            *p = 0;
        }
    }
}
