// thin.rs — Iterative parallel thinning of a binary ridge image.
//
// Classic four-direction morphological thinning. The 3x3 neighbourhood
// of each pixel is packed into a 9-bit number
//
//   a b c
//   d e f        bits: a=0o400 b=0o200 c=0o100
//   g h i              d=0o040 e=0o020 f=0o010
//                      g=0o004 h=0o002 i=0o001
//
// and looked up in DELETABLE, which is 1 exactly when the centre is
// 8-simple (removing it cannot disconnect the skeleton) and not a line
// end. One sweep runs four passes, each only deleting pixels whose
// north / south / west / east neighbour is background, so the ridge is
// peeled one side at a time. Sweeps repeat until a sweep deletes
// nothing.
//
// The scan keeps neighbourhood bits in a rolling one-row buffer, so the
// whole operation needs no copy of the image.

use std::time::Instant;

use crate::fprint::Frame;
use crate::{IMG_HEIGHT, IMG_WIDTH};

/// Pass direction masks: north, south, west, east neighbour bits.
const MASKS: [usize; 4] = [0o200, 0o002, 0o040, 0o010];

/// 1 iff the neighbourhood's centre pixel is 8-simple and not an end
/// point, indexed by the packed 9-bit neighbourhood.
static DELETABLE: [u8; 512] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 1, 0, 0, 1, 1, 0, 1, 1, 1, 0, 0, 1, 1, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 1, 1, 1, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 1, 1, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    1, 0, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    1, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    1, 0, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    1, 0, 1, 1, 1, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 1, 1, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    1, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    1, 0, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    1, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    1, 0, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, //
];

/// Thin the (binary) image in place until no pass deletes a pixel.
/// Any non-zero pixel counts as ridge.
pub fn thin(fp: &mut Frame) {
    let start = Instant::now();
    let buf = fp.pixels_mut();

    // Neighbourhood bits of the previous scanline.
    let mut qb = [0usize; IMG_WIDTH];
    let mut sweeps = 0u32;
    let mut deleted = 1usize;

    while deleted != 0 {
        sweeps += 1;
        deleted = 0;

        for &m in &MASKS {
            // Seed the row buffer from the top scanline.
            let mut p = (buf[0] != 0) as usize;
            for x in 0..IMG_WIDTH - 1 {
                p = ((p << 1) & 0o006) | (buf[x + 1] != 0) as usize;
                qb[x] = p;
            }

            for y in 0..IMG_HEIGHT - 1 {
                let q = qb[0];
                p = ((q << 3) & 0o110) | (buf[(y + 1) * IMG_WIDTH] != 0) as usize;

                for x in 0..IMG_WIDTH - 1 {
                    let q = qb[x];
                    p = ((p << 1) & 0o666)
                        | ((q << 3) & 0o110)
                        | (buf[(y + 1) * IMG_WIDTH + x + 1] != 0) as usize;
                    qb[x] = p;
                    if p & m == 0 && DELETABLE[p] != 0 {
                        deleted += 1;
                        buf[y * IMG_WIDTH + x] = 0;
                    }
                }

                // Right edge pixel.
                p = (p << 1) & 0o666;
                if p & m == 0 && DELETABLE[p] != 0 {
                    deleted += 1;
                    buf[y * IMG_WIDTH + IMG_WIDTH - 1] = 0;
                }
            }

            // Bottom scanline.
            for x in 0..IMG_WIDTH {
                let q = qb[x];
                p = ((p << 1) & 0o666) | ((q << 3) & 0o110);
                if p & m == 0 && DELETABLE[p] != 0 {
                    deleted += 1;
                    buf[(IMG_HEIGHT - 1) * IMG_WIDTH + x] = 0;
                }
            }
        }
    }

    log::debug!("thinning took {sweeps} sweeps, {:?}", start.elapsed());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(points: &[(usize, usize)]) -> Frame {
        let mut px = vec![0u8; IMG_WIDTH * IMG_HEIGHT];
        for &(x, y) in points {
            px[x + y * IMG_WIDTH] = 0xff;
        }
        Frame::with_pixels(&px).unwrap()
    }

    #[test]
    fn isolated_pixel_survives() {
        let mut fp = frame_with(&[(100, 100)]);
        thin(&mut fp);
        assert_eq!(fp.pixels()[100 + 100 * IMG_WIDTH], 0xff);
    }

    #[test]
    fn empty_image_terminates_immediately() {
        let mut fp = Frame::full();
        thin(&mut fp);
        assert!(fp.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn thinning_is_idempotent() {
        // A 20x20 solid blob.
        let mut px = vec![0u8; IMG_WIDTH * IMG_HEIGHT];
        for y in 100..120 {
            for x in 150..170 {
                px[x + y * IMG_WIDTH] = 0xff;
            }
        }
        let mut fp = Frame::with_pixels(&px).unwrap();
        thin(&mut fp);
        let once = fp.pixels().to_vec();
        thin(&mut fp);
        assert_eq!(once, fp.pixels());
    }
}
