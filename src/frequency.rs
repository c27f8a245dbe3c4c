// frequency.rs — Ridge frequency estimation from oriented x-signatures.
//
// For each pixel, project a 32x16 window oriented along the local ridge
// direction and average across the window width to get the x-signature,
// a 1D profile perpendicular to the ridges. The mean distance between
// local maxima of the profile is the ridge period; its reciprocal is
// the frequency. Blocks with a weak profile (peak-to-peak <= 64 gray
// levels) or an implausible period (outside (2, 30) pixels) contribute
// no estimate and are filled from already-estimated neighbours, then
// the whole field is smoothed with a 7x7 box filter.

use std::time::Instant;

use crate::field::{FrequencyField, OrientationField};
use crate::fprint::Frame;
use crate::{IMG_HEIGHT, IMG_WIDTH};

/// Oriented window width and half-width.
const BLOCK_W: usize = 16;
const BLOCK_W2: usize = 8;

/// Oriented window length and half-length.
const BLOCK_L: usize = 32;
const BLOCK_L2: usize = 16;

const EPSILON: f64 = 0.0001;
const LPSIZE: i32 = 3;

/// Estimate the ridge frequency field from the image and its
/// (low-passed) orientation field.
pub fn compute(fp: &Frame, direction: &OrientationField) -> FrequencyField {
    let start = Instant::now();
    let buf = fp.pixels();

    let mut out = vec![0.0f64; IMG_WIDTH * IMG_HEIGHT];
    let mut xsig = [0.0f64; BLOCK_L];
    let mut peaks = [0usize; BLOCK_L];

    for y in BLOCK_L2..IMG_HEIGHT - BLOCK_L2 {
        for x in BLOCK_L2..IMG_WIDTH - BLOCK_L2 {
            // Window axes from the orientation at the window centre.
            let dir = direction.at(x + BLOCK_W2, y + BLOCK_W2);
            let cosdir = -dir.sin();
            let sindir = dir.cos();

            // x-signature: average across the window width at each of
            // the 32 positions along the window length.
            for (k, slot) in xsig.iter_mut().enumerate() {
                let mut acc = 0.0;
                for d in 0..BLOCK_W {
                    let fu = x as f64
                        + (d as f64 - BLOCK_W2 as f64) * cosdir
                        + (k as f64 - BLOCK_L2 as f64) * sindir;
                    let fv = y as f64
                        + (d as f64 - BLOCK_W2 as f64) * sindir
                        - (k as f64 - BLOCK_L2 as f64) * cosdir;
                    let u = (fu as i64).clamp(0, IMG_WIDTH as i64 - 1) as usize;
                    let v = (fv as i64).clamp(0, IMG_HEIGHT as i64 - 1) as usize;
                    acc += buf[u + v * IMG_WIDTH] as f64;
                }
                *slot = acc / BLOCK_W as f64;
            }

            // Too flat a profile carries no ridge signal.
            let pmin = xsig.iter().cloned().fold(f64::INFINITY, f64::min);
            let pmax = xsig.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

            let mut peak_cnt = 0;
            if pmax - pmin > 64.0 {
                for k in 1..BLOCK_L - 1 {
                    if xsig[k - 1] < xsig[k] && xsig[k] >= xsig[k + 1] {
                        peaks[peak_cnt] = k;
                        peak_cnt += 1;
                    }
                }
            }

            // Mean peak spacing; needs at least two peaks.
            let mut spacing = 0.0;
            if peak_cnt >= 2 {
                spacing = (peaks[peak_cnt - 1] - peaks[0]) as f64 / (peak_cnt - 1) as f64;
            }

            out[x + y * IMG_WIDTH] = if spacing > 2.0 && spacing < 30.0 {
                1.0 / spacing
            } else {
                0.0
            };
        }
    }

    // Fill unknown points from the north or west neighbour. Single
    // pass in scan order, so fills propagate down and right.
    for y in BLOCK_L2..IMG_HEIGHT - BLOCK_L2 {
        for x in BLOCK_L2..IMG_WIDTH - BLOCK_L2 {
            if out[x + y * IMG_WIDTH] < EPSILON {
                if out[x + (y - 1) * IMG_WIDTH] > EPSILON {
                    out[x + y * IMG_WIDTH] = out[x + (y - 1) * IMG_WIDTH];
                } else if out[x - 1 + y * IMG_WIDTH] > EPSILON {
                    out[x + y * IMG_WIDTH] = out[x - 1 + y * IMG_WIDTH];
                }
            }
        }
    }

    // Inter-ridge distance changes slowly; box-filter the field.
    let mut freq = FrequencyField::new();
    let lpfactor = 1.0 / ((2 * LPSIZE + 1) * (2 * LPSIZE + 1)) as f64;
    let dst = freq.values_mut();
    for y in BLOCK_L2..IMG_HEIGHT - BLOCK_L2 {
        for x in BLOCK_L2..IMG_WIDTH - BLOCK_L2 {
            let mut acc = 0.0;
            for v in -LPSIZE..=LPSIZE {
                for u in -LPSIZE..=LPSIZE {
                    let px = (x as i32 + u) as usize;
                    let py = (y as i32 + v) as usize;
                    acc += out[px + py * IMG_WIDTH];
                }
            }
            dst[x + y * IMG_WIDTH] = acc * lpfactor;
        }
    }

    log::debug!("frequency field took {:?}", start.elapsed());
    freq
}
