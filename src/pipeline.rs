// pipeline.rs — The full enhancement pipeline, packaged.
//
// Capture gives a raw grayscale frame; matching needs a minutiae set.
// The steps in between always run in the same order:
//
//   soften -> orientation -> frequency -> mask -> gabor -> binarize
//     -> thin -> detect -> prune
//
// This module wires them together with the standard parameters so
// applications do not have to repeat the sequence.

use crate::error::Result;
use crate::field::{FrequencyField, OrientationField};
use crate::fprint::Frame;
use crate::minutiae::{self, MinutiaeSet};
use crate::{frequency, gabor, mask, orientation, thin};

/// Tunable parameters of the enhancement pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Mean-filter window for the initial smoothing.
    pub soften_size: usize,
    /// Gradient block half-size for orientation estimation.
    pub block_size: usize,
    /// Low-pass half-size for orientation smoothing (0 disables).
    pub filter_size: usize,
    /// Gabor envelope radius.
    pub gabor_radius: f64,
    /// Binarization threshold applied to the enhanced image.
    pub binarize_limit: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            soften_size: 3,
            block_size: 7,
            filter_size: 8,
            gabor_radius: 4.0,
            binarize_limit: 0x80,
        }
    }
}

/// Intermediate products of enhancement, for callers that want to
/// inspect or reuse them (the mask is also needed for pruning).
pub struct Enhanced {
    pub direction: OrientationField,
    pub frequency: FrequencyField,
    pub mask: Frame,
}

/// Runs the enhancement pipeline with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Pipeline { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Enhance `fp` in place up to the binary ridge image and return
    /// the intermediate fields.
    pub fn enhance(&self, fp: &mut Frame) -> Result<Enhanced> {
        let cfg = &self.config;

        fp.soften_mean(cfg.soften_size)?;
        let direction = orientation::compute(fp, cfg.block_size, cfg.filter_size);
        let frequency = frequency::compute(fp, &direction);
        let mask = mask::compute(&frequency);
        gabor::enhance(fp, &direction, &frequency, Some(&mask), cfg.gabor_radius);
        fp.binarize(cfg.binarize_limit);

        Ok(Enhanced {
            direction,
            frequency,
            mask,
        })
    }

    /// Full extraction: enhance, thin, detect, prune. `fp` ends up
    /// holding the thinned skeleton.
    pub fn extract(&self, fp: &mut Frame) -> Result<MinutiaeSet> {
        let enhanced = self.enhance(fp)?;
        thin::thin(fp);
        let raw = minutiae::detect(fp);
        Ok(minutiae::remove_noise(&raw, &enhanced.mask))
    }
}
