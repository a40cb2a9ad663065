//! The endpoint URIs served by the app.

/// The root route, which serves the log-in page.
pub const ROOT: &str = "/";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
