//!
//! # Gate-Layout Result and Error Types
//!

/// # [LayoutError] Result Type
pub type LayoutResult<T> = Result<T, LayoutError>;

///
/// # Layout Error Enumeration
///
/// Every variant is a broken precondition or a gap in the technology tables.
/// None are transient; nothing here is retried.
///
pub enum LayoutError {
    /// Permutation handed to the placer does not match its group size
    PermutationLength { expected: usize, got: usize },
    /// Exhaustive search invoked on an empty instance-group
    EmptyGroup,
    /// Unrecognized instance-kind string
    UnknownKind(String),
    /// No via joins the track layer and a port's layer
    MissingVia { track: String, port: String },
    /// Destination port offers no layer to connect to
    NoLayerPin(String),
    /// Every routing track in a region is taken
    OutOfTracks(String),
    /// Invalid input data, with a description
    Validation(String),
    /// Boxed External Errors
    Boxed(Box<dyn std::error::Error + Send + Sync>),
    /// Uncategorized Error, with String Message
    Str(String),
}
impl LayoutError {
    /// Create a [LayoutError::Str] from anything String-convertible
    pub fn msg(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }
    /// Create an error-variant [Result] of our [LayoutError::Validation] variant
    pub fn invalid<T>(s: impl Into<String>) -> Result<T, Self> {
        Err(Self::Validation(s.into()))
    }
}
impl std::fmt::Debug for LayoutError {
    /// Display a [LayoutError]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LayoutError::PermutationLength { expected, got } => write!(
                f,
                "Permutation Length Mismatch: expected {}, got {}",
                expected, got
            ),
            LayoutError::EmptyGroup => write!(f, "Empty Instance Group"),
            LayoutError::UnknownKind(s) => write!(f, "Unknown Instance Kind: {:?}", s),
            LayoutError::MissingVia { track, port } => {
                write!(f, "No Via Between Layers: {} and {}", track, port)
            }
            LayoutError::NoLayerPin(p) => write!(f, "Port Has No Connectable Layer: {}", p),
            LayoutError::OutOfTracks(region) => write!(f, "Ran Out of {} Routing Tracks", region),
            LayoutError::Validation(s) => write!(f, "Validation Error: {}", s),
            LayoutError::Boxed(err) => std::fmt::Display::fmt(err, f),
            LayoutError::Str(err) => f.write_str(err),
        }
    }
}
impl std::fmt::Display for LayoutError {
    /// Display a [LayoutError]
    /// Delegates to the [Debug] implementation
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
impl std::error::Error for LayoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Boxed(e) => Some(&**e),
            _ => None,
        }
    }
}
impl From<String> for LayoutError {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}
impl From<&str> for LayoutError {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}
impl From<std::num::TryFromIntError> for LayoutError {
    fn from(e: std::num::TryFromIntError) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<crate::ser::Error> for LayoutError {
    fn from(e: crate::ser::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
