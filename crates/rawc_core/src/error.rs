use thiserror::Error;

/// Errors raised while constructing layouts, buffers and kernel inputs.
///
/// Stepping itself never fails: once a buffer has been built for a network,
/// every callback operates on compile-time sized data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("network data size must be positive")]
    EmptyLayout,

    #[error("{name} range {start}..{end} does not fit in a segment of {data_size} values")]
    RangeOutOfBounds {
        name: &'static str,
        start: usize,
        end: usize,
        data_size: usize,
    },

    #[error("network has {states} states but {derivatives} derivatives")]
    DerivativeMismatch { states: usize, derivatives: usize },

    #[error("integrator order must be at least 1")]
    ZeroOrder,

    #[error("segment {segment} is out of range for a buffer with {segments} segments")]
    SegmentOutOfRange { segment: usize, segments: usize },

    #[error("elimination parent {parent} of index {index} must precede it")]
    InvalidParent { index: usize, parent: usize },

    #[error("expected {expected} values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("matrix is singular")]
    Singular,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
