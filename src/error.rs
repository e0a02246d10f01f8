use std::borrow::Cow;

/// A result type defaulting to `StageError`.
pub type Result<T, E = StageError> = std::result::Result<T, E>;

/// An error stage functions can fail with.
///
/// Nothing in the pipeline produces or inspects this type. A failing stage's error, whatever its
/// type, is handed back to the caller untouched; this one only gives stage functions something to
/// `?` into.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The stage refused the element.
    #[error("element rejected: {0}")]
    Rejected(Cow<'static, str>),
    /// The element could not be parsed as a number.
    #[error("element is not a number: {0}")]
    Parse(#[from] std::num::ParseIntError),
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl StageError {
    /// Rejects the current element with a reason.
    pub fn rejected(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::Rejected(reason.into())
    }

    /// Boxes any other error.
    ///
    /// Usable directly with `map_err`:
    /// ```
    /// # use fmait::error::StageError;
    /// let error = u8::try_from(300_i64).map_err(StageError::other).unwrap_err();
    /// assert!(matches!(error, StageError::Other(_)));
    /// ```
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(error))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Returns early with `StageError::Rejected`, formatting the reason like `format!`.
///
/// # Examples
///
/// ```
/// fn halve(x: i32) -> fmait::error::Result<i32> {
///     if x % 2 != 0 {
///         fmait::reject!("{x} is odd");
///     }
///     Ok(x / 2)
/// }
/// assert_eq!(halve(8).unwrap(), 4);
/// assert_eq!(halve(3).unwrap_err().to_string(), "element rejected: 3 is odd");
/// ```
#[macro_export]
macro_rules! reject {
    ($($reason:tt)+) => {
        return ::std::result::Result::Err($crate::error::StageError::rejected(::std::format!($($reason)+)))
    };
}

/// Rejects the element unless the condition holds.
#[macro_export]
macro_rules! ensure {
    ($condition:expr, $($reason:tt)+) => {
        if !$condition {
            $crate::reject!($($reason)+);
        }
    };
}
