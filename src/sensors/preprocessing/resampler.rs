//! Angular resampling onto the canonical grid.
//!
//! Telegrams do not all carry the same number of samples, but downstream
//! stages expect every scan to share one angular layout. The resampler maps
//! whatever a telegram delivered onto the configured canonical grid by
//! linear interpolation over the valid samples, clamping beyond the measured
//! ends rather than extrapolating.

use crate::config::CanonicalGeometry;
use crate::core::types::{CanonicalScan, RawScan};

/// Resamples raw scans onto a fixed canonical angular grid.
#[derive(Debug, Clone)]
pub struct AngularResampler {
    canonical: CanonicalGeometry,
}

impl AngularResampler {
    /// Create a resampler for the given canonical grid.
    pub fn new(canonical: CanonicalGeometry) -> Self {
        Self { canonical }
    }

    /// The canonical grid in use.
    pub fn canonical(&self) -> &CanonicalGeometry {
        &self.canonical
    }

    /// Resample a raw scan onto the canonical grid.
    ///
    /// The output always has exactly `point_count` entries in the canonical
    /// layout. A scan with zero valid samples yields all-`None` ranges.
    pub fn resample(&self, scan: &RawScan) -> CanonicalScan {
        let step = self.canonical.step_deg();
        let count = self.canonical.point_count;

        let valid: Vec<(f32, f32)> = scan.iter_valid().collect();

        let mut ranges = Vec::with_capacity(count);
        if valid.is_empty() {
            ranges.resize(count, None);
        } else {
            let first = valid[0];
            let last = valid[valid.len() - 1];
            let mut vi = 0usize;

            for i in 0..count {
                let angle = self.canonical.start_deg + i as f32 * step;
                let range = if angle <= first.0 {
                    first.1
                } else if angle >= last.0 {
                    last.1
                } else {
                    while vi + 1 < valid.len() && valid[vi + 1].0 < angle {
                        vi += 1;
                    }
                    let (x0, y0) = valid[vi];
                    let (x1, y1) = valid[vi + 1];
                    lerp(x0, y0, x1, y1, angle)
                };
                ranges.push(Some(range));
            }
        }

        CanonicalScan {
            start_angle_deg: self.canonical.start_deg,
            step_deg: step,
            ranges,
        }
    }
}

/// Linear interpolation that returns the endpoints exactly at t = 0 and
/// t = 1, so a canonical angle coinciding with a measured angle reproduces
/// the measured range bit-for-bit.
#[inline]
fn lerp(x0: f32, y0: f32, x1: f32, y1: f32, x: f32) -> f32 {
    if x1 == x0 {
        return y0;
    }
    let t = (x - x0) / (x1 - x0);
    y0 * (1.0 - t) + y1 * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ScanGeometry;
    use approx::assert_relative_eq;

    fn grid(start: f32, end: f32, count: usize) -> CanonicalGeometry {
        CanonicalGeometry {
            start_deg: start,
            end_deg: end,
            point_count: count,
        }
    }

    fn raw(geometry: ScanGeometry, samples: Vec<Option<u32>>) -> RawScan {
        RawScan {
            geometry,
            samples,
            short_frame: false,
        }
    }

    #[test]
    fn test_output_length_is_always_canonical() {
        let resampler = AngularResampler::new(grid(-45.0, 225.0, 811));

        for n in [1usize, 100, 400, 811, 1000] {
            let geometry = ScanGeometry::new(-45.0, 270.0 / 810.0, n).unwrap();
            let samples = vec![Some(1500u32); n];
            let out = resampler.resample(&raw(geometry, samples));
            assert_eq!(out.len(), 811, "input of {n} samples must yield 811");
        }
    }

    #[test]
    fn test_all_invalid_yields_all_none() {
        let resampler = AngularResampler::new(grid(-45.0, 225.0, 811));
        let geometry = ScanGeometry::new(-45.0, 0.3333, 811).unwrap();
        let out = resampler.resample(&raw(geometry, vec![None; 811]));
        assert_eq!(out.len(), 811);
        assert_eq!(out.valid_count(), 0);
    }

    #[test]
    fn test_single_sample_fills_grid() {
        let resampler = AngularResampler::new(grid(-45.0, 225.0, 11));
        let geometry = ScanGeometry::new(0.0, 1.0, 1).unwrap();
        let out = resampler.resample(&raw(geometry, vec![Some(2500)]));
        assert_eq!(out.valid_count(), 11);
        for r in &out.ranges {
            assert_relative_eq!(r.unwrap(), 2500.0);
        }
    }

    #[test]
    fn test_exact_angle_passes_through() {
        // canonical grid 0..10 step 1; measured samples at 0, 5, 10
        let resampler = AngularResampler::new(grid(0.0, 10.0, 11));
        let geometry = ScanGeometry::new(0.0, 5.0, 3).unwrap();
        let out = resampler.resample(&raw(geometry, vec![Some(1000), Some(3000), Some(2000)]));

        assert_eq!(out.ranges[0], Some(1000.0));
        assert_eq!(out.ranges[5], Some(3000.0));
        assert_eq!(out.ranges[10], Some(2000.0));
    }

    #[test]
    fn test_linear_interpolation_between_samples() {
        let resampler = AngularResampler::new(grid(0.0, 10.0, 11));
        let geometry = ScanGeometry::new(0.0, 10.0, 2).unwrap();
        let out = resampler.resample(&raw(geometry, vec![Some(1000), Some(2000)]));

        // midpoint of a 1000→2000 ramp
        assert_relative_eq!(out.ranges[5].unwrap(), 1500.0, epsilon = 1e-3);
        assert_relative_eq!(out.ranges[2].unwrap(), 1200.0, epsilon = 1e-3);
    }

    #[test]
    fn test_clamps_outside_measured_span() {
        // measured span 2..8 inside canonical 0..10
        let resampler = AngularResampler::new(grid(0.0, 10.0, 11));
        let geometry = ScanGeometry::new(2.0, 6.0, 2).unwrap();
        let out = resampler.resample(&raw(geometry, vec![Some(1111), Some(2222)]));

        assert_eq!(out.ranges[0], Some(1111.0));
        assert_eq!(out.ranges[1], Some(1111.0));
        assert_eq!(out.ranges[9], Some(2222.0));
        assert_eq!(out.ranges[10], Some(2222.0));
    }

    #[test]
    fn test_interpolation_skips_invalid_samples() {
        // valid samples at angles 0 and 4 with an invalid hole at 2:
        // the bracket spans the hole
        let resampler = AngularResampler::new(grid(0.0, 4.0, 5));
        let geometry = ScanGeometry::new(0.0, 2.0, 3).unwrap();
        let out = resampler.resample(&raw(geometry, vec![Some(1000), None, Some(3000)]));

        assert_relative_eq!(out.ranges[2].unwrap(), 2000.0, epsilon = 1e-3);
    }

    #[test]
    fn test_resampling_is_idempotent() {
        let canonical = grid(-45.0, 225.0, 811);
        let resampler = AngularResampler::new(canonical);

        let geometry =
            ScanGeometry::new(canonical.start_deg, canonical.step_deg(), 811).unwrap();
        let samples: Vec<Option<u32>> = (0..811).map(|i| Some(500 + i * 3)).collect();
        let scan = raw(geometry, samples);

        let once = resampler.resample(&scan);

        // feed the canonical result back through on the same grid
        let again_input = raw(
            ScanGeometry::new(once.start_angle_deg, once.step_deg, once.len()).unwrap(),
            once.ranges.iter().map(|r| r.map(|v| v as u32)).collect(),
        );
        let twice = resampler.resample(&again_input);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_short_frame_tail_clamps_to_last_valid() {
        // 811 declared, only the first 400 valid: the tail holds the last
        // valid range, not garbage
        let resampler = AngularResampler::new(grid(-45.0, 225.0, 811));
        let geometry = ScanGeometry::new(-45.0, 270.0 / 810.0, 811).unwrap();
        let mut samples = vec![Some(4000u32); 400];
        samples.resize(811, None);
        let out = resampler.resample(&raw(geometry, samples));

        assert_eq!(out.len(), 811);
        assert_eq!(out.ranges[810], Some(4000.0));
    }
}
