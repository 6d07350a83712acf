//! URLs addressing OCR source objects.
//!
//! An `ObjectUrl` is absolute, canonical, and carries no credentials, query or
//! fragment. A URL whose path ends with `/` denotes a container ("folder");
//! otherwise the last path segment names an object within its container.

use std::borrow::Cow;

use ocrhl_common::error::Error;
use url::Url;

macro_rules! verify {
    ($expr:expr, $url:expr) => {{
        let result = $expr;
        verify(result, stringify!($expr), $url)?;
    }};
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(Url);

impl ObjectUrl {
    pub fn new(url: Url) -> ocrhl_common::Result<ObjectUrl> {
        Self::verify_url(&url)?;
        Ok(Self(url))
    }

    /// Parses and verifies a URL string.
    ///
    /// The string must already be in canonical form: the parsed URL must print back
    /// exactly as the input, which rules out path traversals and percent-encoded
    /// aliases.
    pub fn parse(url_str: &str) -> ocrhl_common::Result<ObjectUrl> {
        let url = Url::parse(url_str)
            .map_err(|e| Error::malformed("url", format!("'{url_str}': {e}")))?;
        Self::verify_url(&url)?;
        verify!(url.as_str() == url_str, url_str);
        Ok(Self(url))
    }

    /// Builds a `file://` URL from an absolute local path.
    pub fn from_file_path(path: &std::path::Path) -> ocrhl_common::Result<ObjectUrl> {
        let url = Url::from_file_path(path)
            .map_err(|()| Error::invalid_arg("path", format!("{path:?} is not absolute")))?;
        Self::new(url)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn into_inner(self) -> Url {
        self.0
    }

    pub fn is_container(&self) -> bool {
        self.path().ends_with('/')
    }

    /// Returns the container of this URL: itself when it already is one, the
    /// parent folder otherwise.
    pub fn get_container(&self) -> ocrhl_common::Result<Cow<'_, ObjectUrl>> {
        if self.is_container() {
            return Ok(Cow::Borrowed(self));
        }
        let parent = self
            .join("./")
            .map_err(|_| Error::malformed("url", format!("'{}': no parent", self.as_str())))?;
        Ok(Cow::Owned(ObjectUrl(parent)))
    }

    /// Path of `url` relative to this URL's container, or `None` when `url` is a
    /// container itself or lies outside of it.
    pub fn make_relative(&self, url: &ObjectUrl) -> Option<String> {
        if url.is_container() {
            return None;
        }
        let container = self.get_container().ok()?;
        if url.as_str().starts_with(container.as_str()) {
            container.0.make_relative(url)
        } else {
            None
        }
    }

    pub fn verify_url(url: &Url) -> ocrhl_common::Result<()> {
        let s = url.as_str();
        verify!(url.username().is_empty(), s);
        verify!(url.password().is_none(), s);
        verify!(url.query().is_none(), s);
        verify!(url.fragment().is_none(), s);
        verify!(url.path_segments().is_some(), s);
        verify!(url.path().starts_with('/'), s);
        Ok(())
    }
}

impl std::ops::Deref for ObjectUrl {
    type Target = Url;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ObjectUrl {
    type Error = Error;

    fn try_from(url_str: &str) -> Result<Self, Self::Error> {
        ObjectUrl::parse(url_str)
    }
}

/// Whether `s` starts with a URL scheme (`alpha *( alpha / digit / "+" / "-" / "." ) ":"`).
///
/// Single-letter schemes are rejected so that Windows drive paths (`C:\...`) are
/// treated as local paths.
pub fn has_scheme(s: &str) -> bool {
    let Some(colon) = s.find(':') else {
        return false;
    };
    let scheme = &s[..colon];
    scheme.len() > 1
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn verify(predicate: bool, condition: &str, url: &str) -> ocrhl_common::Result<()> {
    if predicate {
        Ok(())
    } else {
        Err(Error::malformed("url", format!("'{url}': {condition}")))
    }
}
