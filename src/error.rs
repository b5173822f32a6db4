use core::fmt;

/// Result type for the transform stage
pub type TransformResult<T> = Result<T, TransformError>;

/// Configuration errors detected before any block is transformed.
///
/// The transform stage itself has no fallible operations: every variant here
/// is a programming error in the caller-supplied context, surfaced before
/// the per-component driver touches a single block.
#[derive(Debug)]
#[non_exhaustive]
pub enum TransformError {
    /// A buffer or field is too small for the requested block grid
    ShapeMismatch {
        what: &'static str,
        needed: usize,
        actual: usize,
    },
    /// A block buffer is not aligned for the active SIMD width
    AlignmentError {
        what: &'static str,
        addr: usize,
        required: usize,
    },
    /// A structural invariant of the component descriptors does not hold
    InvariantBroken(&'static str),
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformError::ShapeMismatch {
                what,
                needed,
                actual,
            } => {
                write!(f, "{} too small: need {}, have {}", what, needed, actual)
            }
            TransformError::AlignmentError {
                what,
                addr,
                required,
            } => {
                write!(
                    f,
                    "{} at {:#x} is not aligned to {} bytes",
                    what, addr, required
                )
            }
            TransformError::InvariantBroken(msg) => write!(f, "invariant broken: {}", msg),
        }
    }
}

impl std::error::Error for TransformError {}
