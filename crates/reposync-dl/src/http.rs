use tracing::debug;
use url::Url;

use crate::{
    error::{DownloadError, Result},
    http_client::SHARED_AGENT,
    stream::FetchStream,
};

/// Source of remote byte streams.
pub trait Fetch {
    /// Issues a GET for `url` and returns its body as a stream.
    ///
    /// Any non-2xx answer fails with [`DownloadError::HttpError`] before a stream is
    /// handed out.
    fn fetch(&self, url: &str) -> Result<FetchStream>;
}

impl<T: Fetch + ?Sized> Fetch for &T {
    fn fetch(&self, url: &str) -> Result<FetchStream> {
        (**self).fetch(url)
    }
}

/// [`Fetch`] implementation backed by the shared HTTP agent.
#[derive(Clone, Debug, Default)]
pub struct HttpFetcher;

impl HttpFetcher {
    pub fn new() -> Self {
        Self
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchStream> {
        let parsed = Url::parse(url).map_err(|source| {
            DownloadError::InvalidUrl {
                url: url.to_string(),
                source,
            }
        })?;

        debug!(url = %parsed, "GET");

        let resp = match SHARED_AGENT.get(parsed.as_str()).call() {
            Ok(resp) => resp,
            Err(ureq::Error::StatusCode(status)) => {
                return Err(DownloadError::HttpError {
                    status,
                    url: url.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        let status = resp.status();
        if !status.is_success() {
            return Err(DownloadError::HttpError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let reader = resp.into_body().into_reader();
        Ok(FetchStream::new(url, Box::new(reader)))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use mockito::Server;

    use super::*;

    #[test]
    fn test_fetch_success() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/repodata/repomd.xml")
            .with_status(200)
            .with_body("<repomd/>")
            .create();

        let url = format!("{}/repodata/repomd.xml", server.url());
        let mut stream = HttpFetcher::new().fetch(&url).unwrap();
        assert_eq!(stream.url(), url);

        let mut body = String::new();
        stream.read_to_string(&mut body).unwrap();
        assert_eq!(body, "<repomd/>");
        assert_eq!(stream.close().unwrap(), 9);

        mock.assert();
    }

    #[test]
    fn test_fetch_not_found() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", "/repodata/repomd.xml.asc")
            .with_status(404)
            .create();

        let url = format!("{}/repodata/repomd.xml.asc", server.url());
        let err = HttpFetcher::new().fetch(&url).unwrap_err();
        assert!(err.is_not_found());
        match err {
            DownloadError::HttpError {
                url: failed, ..
            } => assert_eq!(failed, url),
            other => panic!("expected HttpError, got {other:?}"),
        }
    }

    #[test]
    fn test_fetch_server_error() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", "/repodata/repomd.xml")
            .with_status(500)
            .create();

        let url = format!("{}/repodata/repomd.xml", server.url());
        let err = HttpFetcher::new().fetch(&url).unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_fetch_invalid_url() {
        let err = HttpFetcher::new().fetch("not a url").unwrap_err();
        assert!(matches!(err, DownloadError::InvalidUrl { .. }));
    }

    #[test]
    fn test_fetch_through_reference() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", "/pkgs/a-1.0.rpm")
            .with_status(200)
            .with_body("rpm")
            .create();

        let fetcher = HttpFetcher::new();
        let by_ref: &dyn Fetch = &fetcher;
        let stream = by_ref
            .fetch(&format!("{}/pkgs/a-1.0.rpm", server.url()))
            .unwrap();
        assert_eq!(stream.close().unwrap(), 3);
    }
}
