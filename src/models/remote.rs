use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, USER_AGENT};

const USER_AGENT_VALUE: &str = concat!("sd-gallery/", env!("CARGO_PKG_VERSION"));

/// An opened download: status line plus a body that has not been read yet.
pub struct RemoteBody {
    pub status: u16,
    pub content_length: u64,
    pub reader: Box<dyn Read + Send>,
}

impl std::fmt::Debug for RemoteBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBody")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Where asset bytes come from. Any transport that can report a size and
/// stream a body will do.
pub trait RemoteSource {
    /// Size announced by the server, `0` when it does not say.
    fn content_length(&self, url: &str) -> Result<u64>;

    fn open(&self, url: &str) -> Result<RemoteBody>;
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(None)
            .build()
            .context("create http client")?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        self.client
            .get(url)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .send()
            .with_context(|| format!("request {url}"))
    }
}

impl RemoteSource for HttpSource {
    fn content_length(&self, url: &str) -> Result<u64> {
        // The body is dropped unread; only the headers matter here.
        let response = self.get(url)?;
        Ok(header_length(&response))
    }

    fn open(&self, url: &str) -> Result<RemoteBody> {
        let response = self.get(url)?;
        Ok(RemoteBody {
            status: response.status().as_u16(),
            content_length: header_length(&response),
            reader: Box::new(response),
        })
    }
}

fn header_length(response: &reqwest::blocking::Response) -> u64 {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}
