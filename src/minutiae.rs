// minutiae.rs — Minutiae detection on a thinned ridge skeleton, plus
// boundary noise pruning.
//
// On a one-pixel-wide skeleton, the number of ridge neighbours of a
// ridge pixel classifies it: one neighbour marks a ridge ending, three
// mark a bifurcation. Everything else (two = ordinary ridge pixel,
// four+ = crossing artefact) is ignored.

use std::time::Instant;

use crate::fprint::Frame;
use crate::{IMG_HEIGHT, IMG_WIDTH};

/// Hard cap on minutiae per set; detection stops when it is reached.
pub const MAX_MINUTIAE: usize = 384;

/// Margin (in pixels) a minutia must keep from the mask boundary to
/// count as genuine.
const NOISE_THICKNESS: usize = 15;

/// A ridge ending or bifurcation at an image position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Minutia {
    pub x: i32,
    pub y: i32,
}

/// A bounded set of minutiae in detector scan order.
#[derive(Debug, Clone, Default)]
pub struct MinutiaeSet {
    minutiae: Vec<Minutia>,
}

impl MinutiaeSet {
    pub fn new() -> Self {
        MinutiaeSet {
            minutiae: Vec::with_capacity(MAX_MINUTIAE),
        }
    }

    pub fn len(&self) -> usize {
        self.minutiae.len()
    }

    pub fn is_empty(&self) -> bool {
        self.minutiae.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Minutia> {
        self.minutiae.iter()
    }

    pub fn as_slice(&self) -> &[Minutia] {
        &self.minutiae
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Minutia] {
        &mut self.minutiae
    }

    /// Add a minutia; returns false once the set is full.
    pub fn push(&mut self, m: Minutia) -> bool {
        if self.minutiae.len() >= MAX_MINUTIAE {
            return false;
        }
        self.minutiae.push(m);
        true
    }
}

/// Detect ridge endings and bifurcations on a thinned image. Any
/// non-zero pixel counts as ridge. The scan terminates early when the
/// set reaches capacity.
pub fn detect(fp: &Frame) -> MinutiaeSet {
    let start = Instant::now();
    let buf = fp.pixels();
    let mut mset = MinutiaeSet::new();

    'scan: for i in 1..IMG_HEIGHT - 1 {
        for j in 1..IMG_WIDTH - 1 {
            if buf[j + i * IMG_WIDTH] == 0 {
                continue;
            }

            let mut neighbours = 0;
            for k in [i - 1, i, i + 1] {
                for l in [j - 1, j, j + 1] {
                    if (k, l) != (i, j) && buf[l + k * IMG_WIDTH] != 0 {
                        neighbours += 1;
                    }
                }
            }

            // One neighbour: ridge ending. Three: bifurcation.
            if neighbours == 1 || neighbours == 3 {
                mset.push(Minutia {
                    x: j as i32,
                    y: i as i32,
                });
                if mset.len() >= MAX_MINUTIAE {
                    break 'scan;
                }
            }
        }
    }

    log::debug!("detected {} minutiae in {:?}", mset.len(), start.elapsed());
    mset
}

/// Drop minutiae on or near the mask boundary: a minutia survives only
/// if the mask is set at its position and at the four points 15 pixels
/// away in each cardinal direction (clipped to the image).
pub fn remove_noise(mset: &MinutiaeSet, mask: &Frame) -> MinutiaeSet {
    let buf = mask.pixels();
    let mut out = MinutiaeSet::new();

    let probe = |x: usize, y: usize| buf[x + y * IMG_WIDTH] != 0;

    for m in mset.iter() {
        let x = m.x as usize;
        let y = m.y as usize;

        let right = (x + NOISE_THICKNESS).min(IMG_WIDTH - 1);
        let left = x.saturating_sub(NOISE_THICKNESS);
        let below = (y + NOISE_THICKNESS).min(IMG_HEIGHT - 1);
        let above = y.saturating_sub(NOISE_THICKNESS);

        if probe(x, y)
            && probe(right, y)
            && probe(left, y)
            && probe(x, below)
            && probe(x, above)
        {
            out.push(*m);
        }
    }

    log::debug!(
        "noise pruning reduced minutiae count from {} to {}",
        mset.len(),
        out.len()
    );
    out
}
