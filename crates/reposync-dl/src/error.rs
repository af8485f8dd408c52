use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DownloadError {
    #[error("Invalid URL: {url}")]
    #[diagnostic(code(reposync_dl::invalid_url))]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    #[diagnostic(
        code(reposync_dl::network),
        help("Check your internet connection or try again later")
    )]
    Network(#[from] Box<ureq::Error>),

    #[error("HTTP {status}: {url}")]
    #[diagnostic(code(reposync_dl::http_error))]
    HttpError { status: u16, url: String },

    #[error("I/O error while streaming {url}: {source}")]
    #[diagnostic(code(reposync_dl::io))]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    /// The HTTP status code, if the server answered with a non-success status.
    pub fn status(&self) -> Option<u16> {
        match self {
            DownloadError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if the server answered `404 Not Found`.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

pub type Result<T> = std::result::Result<T, DownloadError>;

impl From<ureq::Error> for DownloadError {
    /// Converts a `ureq::Error` into a `DownloadError::Network` variant.
    fn from(e: ureq::Error) -> Self {
        Self::Network(Box::new(e))
    }
}
