/// Same-origin path the frontend returns to after email verification
///
/// Only absolute paths on our own origin survive; everything else
/// (scheme-relative `//host`, embedded `://`, relative paths) collapses to
/// empty so the continue URL can never be turned into an open redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnPath(Option<String>);

impl ReturnPath {
    pub fn sanitize(raw: Option<&str>) -> Self {
        let path = raw
            .map(str::trim)
            .filter(|p| p.starts_with('/') && !p.starts_with("//") && !p.contains("://"))
            .map(str::to_string);
        Self(path)
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}
