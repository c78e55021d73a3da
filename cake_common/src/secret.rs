use std::fmt::{self, Debug, Display};

/// A wrapper for sensitive configuration values (gateway secrets, API keys) that refuses to print its contents.
///
/// Configuration structs holding a `Secret` can derive `Debug` and be logged safely.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret<T: Clone + Default>(T);

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn reveal(&self) -> &T {
        &self.0
    }
}

impl Secret<String> {
    /// An unset secret. Features that depend on it should treat themselves as disabled.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}
