use anyhow::Context;
use async_trait::async_trait;
use reqwest::header;
use std::time::Duration;

/// Joke provider the server uses when no endpoint is configured.
pub const DAD_JOKE_URL: &str = "https://icanhazdadjoke.com/";

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// [JokeProvider] is the seam between the chat session and the external joke
/// service. A failed fetch is an ordinary error the session recovers from.
#[async_trait]
pub trait JokeProvider: Send + Sync {
    async fn fetch(&self) -> anyhow::Result<String>;
}

/// Fetches jokes from an icanhazdadjoke-style endpoint which returns the
/// joke as a plain text body.
pub struct DadJokeClient {
    client: reqwest::Client,
    url: String,
}

impl DadJokeClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("could not build the joke http client")?;

        Ok(DadJokeClient {
            client,
            url: String::from(url),
        })
    }
}

#[async_trait]
impl JokeProvider for DadJokeClient {
    async fn fetch(&self) -> anyhow::Result<String> {
        let response = self
            .client
            .get(&self.url)
            .header(header::ACCEPT, "text/plain")
            .send()
            .await
            .context("joke request failed")?
            .error_for_status()
            .context("joke provider returned an error status")?;

        let joke = response
            .text()
            .await
            .context("could not read the joke response body")?;

        Ok(String::from(joke.trim()))
    }
}
