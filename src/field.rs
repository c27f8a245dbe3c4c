// field.rs — Per-pixel floating-point fields.
//
// The pipeline carries two kinds of dense f64 fields over the image:
// ridge orientations (radians, (-pi/2, pi/2] after halving) and ridge
// frequencies (cycles/pixel). They share a representation but are
// distinct types, so a frequency field cannot be passed where an
// orientation field is expected.

use crate::{IMG_HEIGHT, IMG_WIDTH};

macro_rules! float_field {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        pub struct $name {
            values: Vec<f64>,
        }

        impl $name {
            /// Allocate a zeroed field covering the full image.
            pub fn new() -> Self {
                $name {
                    values: vec![0.0; IMG_WIDTH * IMG_HEIGHT],
                }
            }

            #[inline]
            pub fn at(&self, x: usize, y: usize) -> f64 {
                self.values[x + y * IMG_WIDTH]
            }

            #[inline]
            pub fn set(&mut self, x: usize, y: usize, v: f64) {
                self.values[x + y * IMG_WIDTH] = v;
            }

            /// Row-major backing storage.
            pub fn values(&self) -> &[f64] {
                &self.values
            }

            pub fn values_mut(&mut self) -> &mut [f64] {
                &mut self.values
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

float_field!(
    /// Local ridge direction at each pixel.
    OrientationField
);

float_field!(
    /// Local ridge frequency (cycles/pixel) at each pixel. Zero marks
    /// pixels where no reliable estimate exists.
    FrequencyField
);
