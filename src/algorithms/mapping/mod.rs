//! Mapping: accumulation of registered scans into a histogram map.

mod histogram_grid;

pub use histogram_grid::{Extent, GridSnapshot, HistogramGrid};
