use std::time::Duration;

use anyhow::Context;
use reqwest::{blocking::Client, header::CONTENT_TYPE};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// What came back from the endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Posts rendered notices. The worker owns its transport and calls it from a
/// single thread, one notice at a time.
pub trait Transport {
    fn post(&mut self, url: &str, content_type: &str, body: Vec<u8>) -> anyhow::Result<Response>;
}

/// Blocking HTTP transport built on `reqwest`.
///
/// ```
/// use std::time::Duration;
///
/// let transport = airbrake::transport::HttpTransport::builder()
///     .timeout(Duration::from_secs(3))
///     .build();
/// ```
#[derive(typed_builder::TypedBuilder)]
pub struct HttpTransport {
    #[builder(default = DEFAULT_TIMEOUT)]
    timeout: Duration,

    #[builder(default, setter(skip))]
    client: Option<Client>,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Transport for HttpTransport {
    fn post(&mut self, url: &str, content_type: &str, body: Vec<u8>) -> anyhow::Result<Response> {
        let client = match self.client.take() {
            Some(client) => client,
            // built on first use so that it lives on the worker thread
            None => Client::builder()
                .timeout(self.timeout)
                .build()
                .context("Can't create HTTP client")?,
        };
        let client = self.client.insert(client);

        let response = client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .context("Failed sending HTTP request")?;

        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        Ok(Response { status, body })
    }
}
