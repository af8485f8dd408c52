pub mod error;
pub mod http;
pub mod http_client;
pub mod stream;

pub use error::{DownloadError, Result};
pub use http::{Fetch, HttpFetcher};
pub use stream::FetchStream;
