use std::{fmt, result, time::Duration};
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;
pub type Result<T> = result::Result<T, ApplicationError>;
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Network error: no data received for {}s", .0.as_secs())]
    Stalled(Duration),
    #[error("Network error: connection closed after {received} of {expected} bytes")]
    Incomplete { received: u64, expected: u64 },
    #[error("HTTP error: {url} returned {status}")]
    Http { url: Url, status: StatusCode },
    #[error("ParseUrl error: {0}")]
    ParseUrl(#[from] url::ParseError),
    #[error("ParseHtml error: {0}")]
    ParseHtml(String),
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// The broad category an error belongs to, used when reporting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Http,
    Parse,
    IO,
}

impl ApplicationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IO(_) => ErrorKind::IO,
            Self::Network(_) | Self::Stalled(_) | Self::Incomplete { .. } => ErrorKind::Network,
            Self::Http { .. } => ErrorKind::Http,
            Self::ParseUrl(_) | Self::ParseHtml(_) | Self::Regex(_) => ErrorKind::Parse,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Network => "network",
            Self::Http => "http",
            Self::Parse => "parse",
            Self::IO => "io",
        };
        f.write_str(s)
    }
}
