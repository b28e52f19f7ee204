use k3s_orchestrator::{Download, DownloadError, Downloader};
use std::sync::Mutex;

const INSTALLER: &[u8] = b"#!/bin/sh\nset -e\necho installing k3s\n";

/// Serves a canned installer script, or whatever a test replaces it with.
pub(crate) struct MockDownloader {
    response: Mutex<Download>,
    urls: Mutex<Vec<String>>,
}

impl Default for MockDownloader {
    fn default() -> Self {
        Self {
            response: Mutex::new(Download {
                status: 200,
                body: INSTALLER.to_vec(),
            }),
            urls: Mutex::default(),
        }
    }
}

impl MockDownloader {
    pub(crate) fn respond(&self, status: u16, body: &[u8]) {
        *self.response.lock().unwrap() = Download {
            status,
            body: body.to_vec(),
        };
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Downloader for MockDownloader {
    async fn download(&self, url: &str) -> Result<Download, DownloadError> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(self.response.lock().unwrap().clone())
    }
}
