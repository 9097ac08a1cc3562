use std::fmt;

/// A wrapper for API keys and other credentials
///
/// `Secret<T>` redacts its value in `Debug` and `Display`, so a provider or
/// config struct can derive `Debug` and be logged without leaking the key.
/// It deliberately does not implement `Serialize`.
///
/// # Examples
///
/// ```
/// use quietenable_core::Secret;
///
/// let api_key = Secret::new("sk-live-123".to_string());
/// assert_eq!(format!("{api_key:?}"), "[REDACTED]");
/// assert_eq!(api_key.expose(), "sk-live-123");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Secret<T>(T);

impl<T> Secret<T> {
    /// Wraps a value
    pub fn new(value: T) -> Self {
        Secret(value)
    }

    /// Returns the wrapped value
    ///
    /// Only call this where the value is actually sent, such as building an
    /// `Authorization` header.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl Secret<String> {
    /// Formats the key as a bearer `Authorization` header value
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// True when no key was supplied
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Secret<String> {
    fn from(value: String) -> Self {
        Secret(value)
    }
}

impl From<&str> for Secret<String> {
    fn from(value: &str) -> Self {
        Secret(value.to_string())
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("••••••")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_redacted() {
        let secret = Secret::from("xai-abc");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(format!("{}", secret), "••••••");
    }

    #[test]
    fn test_bearer_header() {
        let secret = Secret::from("sk-test");
        assert_eq!(secret.bearer(), "Bearer sk-test");
        assert!(!secret.is_empty());
        assert!(Secret::from("").is_empty());
    }
}
