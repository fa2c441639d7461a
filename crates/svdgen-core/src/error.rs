//! Error types for model rendering.

/// Errors that can occur while rendering a device model.
#[derive(Debug, thiserror::Error)]
pub enum SvdError {
    /// The XML writer rejected an event.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The underlying writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The rendered document was not valid UTF-8.
    #[error("rendered document is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Result type alias for rendering operations.
pub type Result<T> = std::result::Result<T, SvdError>;
