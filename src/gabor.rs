// gabor.rs — Oriented even-symmetric Gabor enhancement.
//
// Each pixel is convolved with a 17x17 even-symmetric Gabor kernel
// tuned to the local ridge orientation and frequency:
//
//   h(u, v; phi, f) = exp(-(x'^2 + y'^2) / (2 r^2)) * cos(2 pi f x')
//
// with the kernel axes rotated to phi + pi/2 so the cosine oscillates
// across the ridges. The radius r trades noise resistance against
// spurious ridges; 4.0 is a good default. Pixels outside the region
// mask are left black.

use std::f64::consts::PI;
use std::time::Instant;

use crate::field::{FrequencyField, OrientationField};
use crate::fprint::Frame;
use crate::{IMG_HEIGHT, IMG_WIDTH};

/// Filter half-window; the kernel covers [-8, 8] in both axes.
const WG2: i32 = 8;

/// Gabor kernel factor at offset (x, y) for orientation `phi`,
/// frequency `f` and squared radius `r2`.
fn gabor(x: f64, y: f64, phi: f64, f: f64, r2: f64) -> f64 {
    let phi = phi + PI / 2.0;
    let x2 = -x * phi.sin() + y * phi.cos();
    let y2 = x * phi.cos() + y * phi.sin();

    (-0.5 * (x2 * x2 + y2 * y2) / r2).exp() * (2.0 * PI * x2 * f).cos()
}

/// Enhance `fp` in place. Pixels where `mask` is zero (when a mask is
/// given) are written as 0.
pub fn enhance(
    fp: &mut Frame,
    direction: &OrientationField,
    frequency: &FrequencyField,
    mask: Option<&Frame>,
    radius: f64,
) {
    let start = Instant::now();
    let r2 = radius * radius;

    let mut enhanced = vec![0u8; IMG_WIDTH * IMG_HEIGHT];
    let src = fp.pixels();

    for j in WG2 as usize..IMG_HEIGHT - WG2 as usize {
        for i in WG2 as usize..IMG_WIDTH - WG2 as usize {
            if let Some(m) = mask {
                if m.pixels()[i + j * IMG_WIDTH] == 0 {
                    continue;
                }
            }

            let o = direction.at(i, j);
            let f = frequency.at(i, j);

            let mut sum = 0.0;
            for v in -WG2..=WG2 {
                for u in -WG2..=WG2 {
                    let px = (i as i32 - u) as usize;
                    let py = (j as i32 - v) as usize;
                    sum += gabor(u as f64, v as f64, o, f, r2)
                        * src[px + py * IMG_WIDTH] as f64;
                }
            }

            enhanced[i + j * IMG_WIDTH] = sum.clamp(0.0, 255.0) as u8;
        }
    }

    fp.pixels_mut().copy_from_slice(&enhanced);
    log::debug!("gabor enhancement took {:?}", start.elapsed());
}
