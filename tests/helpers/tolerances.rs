//! Comparison tolerances for samples that crossed the process boundary.

/// Host samples are stored as f64; a Float32 read rounds them once.
pub const F32_SAMPLE_EPSILON: f64 = 1e-6;

/// Float64 reads are copied bit for bit.
pub const F64_SAMPLE_EPSILON: f64 = 1e-12;
