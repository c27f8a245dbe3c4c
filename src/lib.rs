// dpfp: driver + image-processing library for DigitalPersona U.are.U 4000
// family optical fingerprint readers (and Microsoft OEM variants).
//
// The crate splits into two halves:
//  - device control: USB transport, device registry, power-up state
//    machine, frame capture, AES challenge-response keep-alive
//  - image pipeline: normalization, orientation field, ridge frequency,
//    region mask, Gabor enhancement, binarization, thinning, minutiae
//    detection and matching
//
// Reference for the pipeline algorithms: Hong, Wan, Jain, "Fingerprint
// Image Enhancement: Algorithm and Performance Evaluation" (PAMI 1998).

pub mod crypto;
pub mod device;
pub mod error;
pub mod field;
pub mod fprint;
pub mod frequency;
pub mod gabor;
pub mod mask;
pub mod matcher;
pub mod minutiae;
pub mod orientation;
pub mod pipeline;
pub mod registry;
pub mod thin;
pub mod transport;

pub use crate::device::Device;
pub use crate::error::{Error, Result};
pub use crate::fprint::Frame;

/// Width of a captured frame in pixels.
pub const IMG_WIDTH: usize = 384;

/// Height of a captured frame in pixels.
pub const IMG_HEIGHT: usize = 289;
