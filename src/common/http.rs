use std::time::Duration;

use reqwest::{Client, Error};

const DEFAULT_USER_AGENT: &str = concat!("queuelink/", env!("CARGO_PKG_VERSION"));

pub struct HttpClient;

impl HttpClient {
    pub fn default_user_agent() -> String {
        DEFAULT_USER_AGENT.to_string()
    }

    pub fn with_timeout(timeout: Duration) -> Result<Client, Error> {
        Client::builder()
            .user_agent(Self::default_user_agent())
            .timeout(timeout)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_with_crate_user_agent() {
        assert!(HttpClient::with_timeout(Duration::from_secs(15)).is_ok());
        assert_eq!(
            HttpClient::default_user_agent(),
            format!("queuelink/{}", env!("CARGO_PKG_VERSION"))
        );
    }
}
