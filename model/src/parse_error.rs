use std::fmt::{Display, Formatter};

/// An error that can occur when parsing a string into one of the model's enums.
#[derive(Debug)]
pub struct ParseError(serde_plain::Error);

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl ParseError {
    pub(crate) fn new(e: serde_plain::Error) -> Self {
        Self(e)
    }
}

/// Implement `FromStr` for a `Deserialize` enum, returning our `ParseError` on failure.
macro_rules! impl_from_str_with_parse_error {
    ($t:ty) => {
        impl std::str::FromStr for $t {
            type Err = $crate::parse_error::ParseError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                serde_plain::from_str(s).map_err($crate::parse_error::ParseError::new)
            }
        }
    };
}

pub(crate) use impl_from_str_with_parse_error;
