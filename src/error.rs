use thiserror::Error;

/// Errors returned synchronously to the caller of a reporting entry point.
/// No notice is enqueued when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("please set the Airbrake api key before reporting errors")]
    MissingApiKey,
}

/// A notice could not be turned into the XML document expected by the endpoint.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("notice field {0} is required but empty")]
    MissingField(&'static str),
    #[error("failed formatting notice")]
    Format(#[from] std::fmt::Error),
}

/// Failures the worker hits after a notice has left the caller. These are
/// logged and the notice is dropped.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("cannot render notice: {0}")]
    Render(#[from] RenderError),
    #[error("transport failure: {0:#}")]
    Transport(anyhow::Error),
    #[error("bad response from endpoint (status code {status})")]
    BadResponse { status: u16 },
}

/// The form data attached to a request could not be parsed.
#[derive(Error, Debug)]
pub enum FormError {
    #[error("form body of {len} bytes exceeds the {limit} bytes limit")]
    TooLarge { len: usize, limit: usize },
    #[error("form body is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("malformed url-encoded form")]
    Malformed(#[from] serde_urlencoded::de::Error),
}
