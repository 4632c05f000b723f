use axum::http::{HeaderName, HeaderValue};
use headers::Header;

/// Name of the header carrying the shared secret.
pub static AUTHENTICATION: HeaderName = HeaderName::from_static("authentication");

/// `Authentication: <shared secret>`
///
/// Only the first value is considered when the header is repeated. The value is kept as
/// raw bytes, so secrets outside visible ASCII still compare byte for byte.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Authentication(pub HeaderValue);

impl Authentication {
    pub fn matches(&self, secret: &str) -> bool {
        self.0.as_bytes() == secret.as_bytes()
    }
}

impl Header for Authentication {
    fn name() -> &'static HeaderName {
        &AUTHENTICATION
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        values
            .next()
            .cloned()
            .map(Authentication)
            .ok_or_else(headers::Error::invalid)
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        values.extend(std::iter::once(self.0.clone()));
    }
}
