use snafu::{ResultExt, Snafu};

/// The status and body of a finished download. A non-2xx status is not an error at this level.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Download {
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(Debug, Snafu)]
pub enum DownloadError {
    #[snafu(display("Request failed: {}", source))]
    Request { source: reqwest::Error },

    #[snafu(display("Unable to read response body: {}", source))]
    Body { source: reqwest::Error },
}

/// Fetches a URL into memory.
///
/// This is provided as a trait so that mock implementations can be injected for testing purposes.
/// In practice you will use the [`HttpDownloader`].
#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<Download, DownloadError>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str) -> Result<Download, DownloadError> {
        let response = self.client.get(url).send().await.context(RequestSnafu)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.context(BodySnafu)?.to_vec();
        Ok(Download { status, body })
    }
}
