//! Error taxonomy for the query pipeline.
//!
//! Every fallible operation in this crate returns [`PipelineError`]. The
//! variants mirror the error kinds surfaced to the user (timeout, transport,
//! parse, ...) rather than the library that produced them, so that retry and
//! reporting logic can be written against one stable set of cases.

use std::borrow::Cow;
use thiserror::Error;

/// The pipeline's single error type.
///
/// `Batch` wraps a sub-error with the batch identity that produced it so a
/// failed batch can be logged and retried without losing its origin.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("request timed out: {0}")]
    Timeout(Cow<'static, str>),

    #[error("http error (status {status}): {message}")]
    Http { status: u16, message: Cow<'static, str> },

    #[error("network error: {0}")]
    Net(Cow<'static, str>),

    #[error("empty result: {0}")]
    EmptyResult(Cow<'static, str>),

    #[error("parse error: {0}")]
    Parse(Cow<'static, str>),

    #[error("input error: {0}")]
    Input(Cow<'static, str>),

    #[error("url error: {0}")]
    Url(Cow<'static, str>),

    #[error("parameter error: {0}")]
    Parameter(Cow<'static, str>),

    #[error("save result error: {0}")]
    SaveResult(Cow<'static, str>),

    #[error("batch {} (start={start}) failed: {source}", .batch_num)]
    Batch {
        batch_num: usize,
        start: u64,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("xml parse error: {0}")]
    Xml(#[from] quick_xml::DeError),
}

impl PipelineError {
    #[must_use]
    pub fn timeout(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Timeout(msg.into())
    }

    #[must_use]
    pub fn http(status: u16, msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Http { status, message: msg.into() }
    }

    #[must_use]
    pub fn net(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Net(msg.into())
    }

    #[must_use]
    pub fn empty_result(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::EmptyResult(msg.into())
    }

    #[must_use]
    pub fn parse(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Parse(msg.into())
    }

    #[must_use]
    pub fn input(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Input(msg.into())
    }

    #[must_use]
    pub fn url(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Url(msg.into())
    }

    #[must_use]
    pub fn parameter(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Parameter(msg.into())
    }

    #[must_use]
    pub fn save_result(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::SaveResult(msg.into())
    }

    #[must_use]
    pub fn batch(batch_num: usize, start: u64, source: Self) -> Self {
        Self::Batch { batch_num, start, source: Box::new(source) }
    }

    /// Maps a `reqwest` transport failure onto the taxonomy above, following
    /// the classification the Go client applies to `url.Error`: deadline and
    /// cancellation become `Timeout`, a response with a status code becomes
    /// `Http`, everything else is `Net`.
    #[must_use]
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::timeout(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::http(status.as_u16(), err.to_string());
        }
        Self::net(err.to_string())
    }

    /// Single source of truth for whether a failed attempt should be retried.
    ///
    /// Mirrors the Go `ShouldRetry` predicates: timeouts always retry, 5xx
    /// and 408/429 retry, other HTTP statuses (4xx auth/validation errors)
    /// do not, network errors retry, and structural errors (parse/input/url/
    /// parameter/save-result) never retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Net(_) | Self::EmptyResult(_) => true,
            Self::Http { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            Self::Batch { source, .. } => source.is_retryable(),
            Self::Parse(_)
            | Self::Input(_)
            | Self::Url(_)
            | Self::Parameter(_)
            | Self::SaveResult(_)
            | Self::Io(_)
            | Self::Yaml(_)
            | Self::Xml(_) => false,
        }
    }
}

/// Displayed `kind` tag, used in log lines and the JSON summary.
impl PipelineError {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Http { .. } => "http",
            Self::Net(_) => "net",
            Self::EmptyResult(_) => "empty-result",
            Self::Parse(_) => "parse",
            Self::Input(_) => "input",
            Self::Url(_) => "url",
            Self::Parameter(_) => "parameter",
            Self::SaveResult(_) => "save-result",
            Self::Batch { .. } => "batch",
            Self::Io(_) => "io",
            Self::Yaml(_) => "yaml",
            Self::Xml(_) => "xml",
        }
    }
}
