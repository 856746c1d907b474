// We define separate Error types within the public and internal crate and
// have the public crate wrap the internal crate (the internal crate just
// returns `&'static str`). It is **MUCH** easier to migrate from this
// approach to defining everything in the internal crate than the other way
// around.
//
// The error kinds are private so that we can freely add more kinds. Callers
// that need to branch on the kind of failure should use [`Error::category`].

/// The error type returned by every fallible operation in this crate
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

/// Coarse classification of an [`Error`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// the shapes (or ranks) of the operands are incompatible
    ShapeMismatch,
    /// invalid kernel, statistic/field pairing, shape, name or mapping
    Configuration,
}

/// The underlying internal error type
#[non_exhaustive]
#[derive(Clone, Debug)]
enum ErrorKind {
    /// An error that occurs when the shapes of 2 operands are incompatible
    ShapeMismatch(ShapeMismatchError),
    /// An error that occurs when a rank doesn't match an expected value
    RankMismatch(RankMismatchError),
    /// An error that occurs when an option (or a combination of options)
    /// doesn't make sense
    Configuration(ConfigurationError),
    /// An error that occurs when an unknown statistic name is specified
    StatisticName(StatisticNameError),
    /// An error that occurs within `microstat_nostd_internal`
    ///
    /// This wraps the stringly errors returned by the internal crate.
    InternalLegacyAdHoc(InternalLegacyAdHocError),
}

// define constructor methods for Error
impl Error {
    /// produce an error indicating that the shape of `what` is `actual`, when
    /// we expected `expected`
    pub(crate) fn shape_mismatch(what: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        Error {
            kind: ErrorKind::ShapeMismatch(ShapeMismatchError {
                what,
                expected: expected.to_vec(),
                actual: actual.to_vec(),
            }),
        }
    }

    /// produce an error indicating that `what` has `actual` dimensions, when
    /// `expected` were required
    pub(crate) fn rank_mismatch(what: &'static str, expected: usize, actual: usize) -> Self {
        Error {
            kind: ErrorKind::RankMismatch(RankMismatchError {
                what,
                expected,
                actual,
            }),
        }
    }

    /// produce an error describing an invalid configuration
    pub(crate) fn configuration(what: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::Configuration(ConfigurationError { what: what.into() }),
        }
    }

    /// produce an error indicating that the specified statistic name is
    /// unknown
    pub(crate) fn statistic_name(actual: String, choices: Vec<String>) -> Self {
        Error {
            kind: ErrorKind::StatisticName(StatisticNameError { actual, choices }),
        }
    }

    /// wraps an error message from `microstat_nostd_internal`.
    ///
    /// The internal crate only reports problems with user-provided shapes and
    /// buffers, so these are classified as configuration errors.
    pub(crate) fn internal_legacy_adhoc(msg: &'static str) -> Self {
        Error {
            kind: ErrorKind::InternalLegacyAdHoc(InternalLegacyAdHocError(msg)),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match &self.kind {
            ErrorKind::ShapeMismatch(_) | ErrorKind::RankMismatch(_) => {
                ErrorCategory::ShapeMismatch
            }
            ErrorKind::Configuration(_)
            | ErrorKind::StatisticName(_)
            | ErrorKind::InternalLegacyAdHoc(_) => ErrorCategory::Configuration,
        }
    }

    pub fn is_shape_mismatch(&self) -> bool {
        self.category() == ErrorCategory::ShapeMismatch
    }

    pub fn is_configuration(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }
}

impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match &self.kind {
            ErrorKind::ShapeMismatch(err) => core::fmt::Display::fmt(err, f),
            ErrorKind::RankMismatch(err) => core::fmt::Display::fmt(err, f),
            ErrorKind::Configuration(err) => core::fmt::Display::fmt(err, f),
            ErrorKind::StatisticName(err) => core::fmt::Display::fmt(err, f),
            ErrorKind::InternalLegacyAdHoc(err) => core::fmt::Display::fmt(err, f),
        }
    }
}

/// An error that occurs when the shapes of 2 operands are incompatible
#[derive(Clone, Debug)]
struct ShapeMismatchError {
    what: &'static str,
    expected: Vec<usize>,
    actual: Vec<usize>,
}

impl std::error::Error for ShapeMismatchError {}

impl core::fmt::Display for ShapeMismatchError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{} has shape {:?}, expected {:?}",
            self.what, self.actual, self.expected
        )
    }
}

/// An error that occurs when a rank doesn't match an expected value
#[derive(Clone, Debug)]
struct RankMismatchError {
    what: &'static str,
    expected: usize,
    actual: usize,
}

impl std::error::Error for RankMismatchError {}

impl core::fmt::Display for RankMismatchError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{} has {} dimension(s), expected {}",
            self.what, self.actual, self.expected
        )
    }
}

/// An error that occurs when an option (or combination of options) is invalid
#[derive(Clone, Debug)]
struct ConfigurationError {
    what: String,
}

impl std::error::Error for ConfigurationError {}

impl core::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid configuration: {}", self.what)
    }
}

/// An error occurs when an unknown statistic name is specified
#[derive(Clone, Debug)]
struct StatisticNameError {
    actual: String,
    choices: Vec<String>,
}

impl std::error::Error for StatisticNameError {}

impl core::fmt::Display for StatisticNameError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{} is not a statistic name. Choices include: {:?}",
            self.actual, self.choices
        )
    }
}

#[derive(Clone)]
struct InternalLegacyAdHocError(&'static str);

impl std::error::Error for InternalLegacyAdHocError {}

impl core::fmt::Display for InternalLegacyAdHocError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::fmt::Debug for InternalLegacyAdHocError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Debug::fmt(&self.0, f)
    }
}
