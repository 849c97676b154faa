//! Execution capability surface shared by the block-cipher and DRBG
//! state machines (spec §4.1).
//!
//! `ParallelProfile` is computed once (CPU-feature / core-count
//! detection is cached for the process, per the Design Notes) and
//! threaded through every mode that needs to size buffers or dispatch
//! lanes without re-probing the environment at each call site.

use crate::error::{KeyforgeError, Result};

/// A rough SIMD capability tier. `keyforge-crypto` does not hand-roll
/// architecture intrinsics; the tier only selects how many blocks are
/// grouped per lane before handing work to `rayon`, so that parallel and
/// scalar dispatch remain byte-for-byte identical (spec §8 invariant 10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimdTier {
    Scalar,
    Wide4,
    Wide8,
    Wide16,
}

impl SimdTier {
    /// Blocks processed together as one lane-local unit.
    pub fn lane_blocks(self) -> usize {
        match self {
            SimdTier::Scalar => 1,
            SimdTier::Wide4 => 4,
            SimdTier::Wide8 => 8,
            SimdTier::Wide16 => 16,
        }
    }

    /// Detect the tier once per process. `keyforge-crypto` has no
    /// target-feature-gated code paths of its own, so this reports the
    /// widest tier the scheduling layer is allowed to *batch* work into;
    /// actual block encryption always goes through the scalar
    /// `BlockCipher::encrypt_block` call, so detection failure degrades
    /// gracefully to `Scalar` rather than miscomputing a result.
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("avx512f") {
                return SimdTier::Wide16;
            }
            if is_x86_feature_detected!("avx2") {
                return SimdTier::Wide8;
            }
            if is_x86_feature_detected!("avx") {
                return SimdTier::Wide4;
            }
        }
        SimdTier::Scalar
    }
}

/// Capacity/threading hints consumed by counter-mode and AEAD transforms.
#[derive(Debug, Clone, Copy)]
pub struct ParallelProfile {
    block_size: usize,
    is_parallel: bool,
    processor_count: usize,
    max_degree: usize,
    simd_tier: SimdTier,
    parallel_minimum_size: usize,
    parallel_block_size: usize,
    parallel_maximum_size: usize,
}

impl ParallelProfile {
    /// `state_cache` is the minimum number of bytes the caller wants
    /// buffered per parallel channel (e.g. a cipher's internal state
    /// cache size); `simd_multiply` enables widening the per-lane block
    /// count by the detected SIMD tier instead of always scheduling
    /// scalar single-block lanes.
    pub fn new(block_size: usize, is_parallel: bool, state_cache: usize, simd_multiply: bool) -> Self {
        let processor_count = num_cpus::get().max(1);
        let simd_tier = if simd_multiply {
            SimdTier::detect()
        } else {
            SimdTier::Scalar
        };
        let max_degree = Self::default_degree(processor_count);
        let lane_blocks = simd_tier.lane_blocks();

        let parallel_minimum_size = block_size * lane_blocks * max_degree;
        // Round the requested state-cache size up to a whole number of
        // minimum-size units so parallel chunks always divide evenly.
        let units = (state_cache.max(parallel_minimum_size) + parallel_minimum_size - 1)
            / parallel_minimum_size.max(1);
        let parallel_block_size = parallel_minimum_size * units.max(1);
        let parallel_maximum_size = parallel_block_size * 64;

        Self {
            block_size,
            is_parallel,
            processor_count,
            max_degree,
            simd_tier,
            parallel_minimum_size,
            parallel_block_size,
            parallel_maximum_size,
        }
    }

    fn default_degree(processor_count: usize) -> usize {
        let mut degree = processor_count - (processor_count % 2);
        if degree == 0 {
            degree = 2;
        }
        degree
    }

    /// Recompute derived sizes for a new `(is_parallel, parallel_block_size,
    /// max_degree)` triple, re-validating spec §3's invariants.
    pub fn calculate(
        &mut self,
        is_parallel: bool,
        parallel_block_size: usize,
        max_degree: usize,
    ) -> Result<()> {
        self.set_max_degree(max_degree)?;
        if parallel_block_size % self.parallel_minimum_size != 0 {
            return Err(KeyforgeError::invalid_param(
                "parallel_block_size must be a multiple of parallel_minimum_size",
            ));
        }
        if parallel_block_size < self.parallel_minimum_size
            || parallel_block_size > self.parallel_maximum_size
        {
            return Err(KeyforgeError::invalid_param(
                "parallel_block_size out of [minimum, maximum] range",
            ));
        }
        self.is_parallel = is_parallel;
        self.parallel_block_size = parallel_block_size;
        Ok(())
    }

    pub fn set_max_degree(&mut self, degree: usize) -> Result<()> {
        if degree == 0 || degree % 2 != 0 || degree > self.processor_count {
            return Err(KeyforgeError::invalid_param(
                "max_degree must be a nonzero even number not exceeding the processor count",
            ));
        }
        self.max_degree = degree;
        Ok(())
    }

    pub fn is_parallel(&self) -> bool {
        self.is_parallel
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn processor_count(&self) -> usize {
        self.processor_count
    }

    pub fn parallel_max_degree(&self) -> usize {
        self.max_degree
    }

    pub fn simd_tier(&self) -> SimdTier {
        self.simd_tier
    }

    pub fn parallel_minimum_size(&self) -> usize {
        self.parallel_minimum_size
    }

    pub fn parallel_block_size(&self) -> usize {
        self.parallel_block_size
    }

    pub fn parallel_maximum_size(&self) -> usize {
        self.parallel_maximum_size
    }
}
