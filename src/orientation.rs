// orientation.rs — Ridge orientation field estimation.
//
// Least-squares gradient orientation (Hong96/Hong98):
//
//   1. For each pixel, take directional differences dx, dy over the
//      surrounding (2B+1)^2 block.
//   2. Accumulate Nx = sum 2*dx*dy and Ny = sum dx^2 - dy^2; the raw
//      block angle is atan2(Nx, Ny).
//   3. Noise makes isolated estimates unreliable, so the angle field is
//      converted to the continuous vector field (cos t, sin t) and
//      low-passed with a uniform (2F+1)^2 kernel before halving back to
//      a direction modulo pi.
//
// With F = 0 the low-pass is skipped and the halved raw angle is used
// directly.

use std::time::Instant;

use crate::field::OrientationField;
use crate::fprint::Frame;
use crate::{IMG_HEIGHT, IMG_WIDTH};

#[inline]
fn p(buf: &[u8], x: usize, y: usize) -> f64 {
    buf[x + y * IMG_WIDTH] as f64
}

/// Estimate the orientation field of `fp`.
///
/// `block_size` is the gradient block half-size (typical 7),
/// `filter_size` the low-pass half-size (typical 8; 0 disables the
/// low-pass).
pub fn compute(fp: &Frame, block_size: usize, filter_size: usize) -> OrientationField {
    let start = Instant::now();
    let buf = fp.pixels();
    let diff_size = 2 * block_size + 1;

    let mut out = OrientationField::new();
    let mut theta = if filter_size > 0 {
        Some(vec![0.0f64; IMG_WIDTH * IMG_HEIGHT])
    } else {
        None
    };

    for y in block_size + 1..IMG_HEIGHT - block_size - 1 {
        for x in block_size + 1..IMG_WIDTH - block_size - 1 {
            let mut nx = 0.0;
            let mut ny = 0.0;
            for j in 0..diff_size {
                for i in 0..diff_size {
                    let px = x + i - block_size;
                    let py = y + j - block_size;
                    let dx = p(buf, px, py) - p(buf, px - 1, py);
                    let dy = p(buf, px, py) - p(buf, px, py - 1);
                    nx += 2.0 * dx * dy;
                    ny += dx * dx - dy * dy;
                }
            }

            match theta.as_mut() {
                Some(t) => t[x + y * IMG_WIDTH] = nx.atan2(ny),
                None => out.set(x, y, nx.atan2(ny) * 0.5),
            }
        }
    }

    if let Some(t) = theta {
        low_pass(&t, &mut out, filter_size);
    }

    log::debug!("orientation field took {:?}", start.elapsed());
    out
}

/// Uniform low-pass over the continuous vector field of `theta`, then
/// halve back to a direction.
fn low_pass(theta: &[f64], out: &mut OrientationField, filter_size: usize) {
    let fsize = 2 * filter_size + 1;
    let weight = 1.0 / (fsize * fsize) as f64;

    let mut phix = vec![0.0f64; IMG_WIDTH * IMG_HEIGHT];
    let mut phiy = vec![0.0f64; IMG_WIDTH * IMG_HEIGHT];
    for (i, &t) in theta.iter().enumerate() {
        phix[i] = t.cos();
        phiy[i] = t.sin();
    }

    let dst = out.values_mut();
    for y in 0..IMG_HEIGHT - fsize {
        for x in 0..IMG_WIDTH - fsize {
            let mut nx = 0.0;
            let mut ny = 0.0;
            for j in 0..fsize {
                let row = (y + j) * IMG_WIDTH;
                for i in 0..fsize {
                    nx += weight * phix[x + i + row];
                    ny += weight * phiy[x + i + row];
                }
            }
            dst[x + y * IMG_WIDTH] = ny.atan2(nx) * 0.5;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Horizontal stripes: dx vanishes everywhere and dy does not, so
    /// Nx = 0, Ny < 0 and every interior estimate halves atan2(0, Ny)
    /// to exactly pi/2 (the angle this crate assigns to horizontal
    /// ridges).
    #[test]
    fn stripes_give_consistent_angles() {
        let mut px = vec![0u8; IMG_WIDTH * IMG_HEIGHT];
        for y in 0..IMG_HEIGHT {
            if (y / 6) % 2 == 0 {
                for x in 0..IMG_WIDTH {
                    px[x + y * IMG_WIDTH] = 200;
                }
            }
        }
        let fp = Frame::with_pixels(&px).unwrap();
        let field = compute(&fp, 7, 0);

        // Sample well inside the image.
        let a = field.at(100, 100);
        assert!((a - std::f64::consts::FRAC_PI_2).abs() < 1e-9, "angle {a}");
    }

    #[test]
    fn uniform_image_yields_zero_angles() {
        let fp = Frame::with_pixels(&vec![128u8; IMG_WIDTH * IMG_HEIGHT]).unwrap();
        let field = compute(&fp, 7, 8);
        // No gradients anywhere: atan2(0, 0) = 0 everywhere.
        assert!(field.values().iter().all(|v| v.abs() < 1e-9));
    }
}
