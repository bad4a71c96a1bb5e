use std::time::Duration;

use crate::error::FetchError;

use super::ValueSource;

/// Fetches integers from a random number API.
///
/// The endpoint is expected to answer with a JSON array such as `[42]`; the
/// first element is returned.
pub struct HttpRandomSource {
    url: String,
    timeout: Duration,
}

impl HttpRandomSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ValueSource for HttpRandomSource {
    fn fetch(&self) -> Result<i64, FetchError> {
        let user_agent = format!("topic-mediator/{}", env!("CARGO_PKG_VERSION"));
        let response = ureq::get(&self.url)
            .set("User-Agent", &user_agent)
            .set("Accept", "application/json")
            .timeout(self.timeout)
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => FetchError::Status(code),
                ureq::Error::Transport(t) => FetchError::Request(t.to_string()),
            })?;

        let numbers: Vec<i64> = response.into_json().map_err(FetchError::Decode)?;
        first_value(&numbers)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn first_value(numbers: &[i64]) -> Result<i64, FetchError> {
    numbers.first().copied().ok_or(FetchError::Empty)
}
