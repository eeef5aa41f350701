use std::sync::Arc;

use base64::prelude::*;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::common::types::{SharedRw, now_ms};

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

#[derive(Clone, Debug)]
pub struct SpotifyToken {
    pub access_token: String,
    pub expiry_ms: u64,
}

impl SpotifyToken {
    /// Usable for at least another five seconds.
    pub fn is_fresh(&self, now: u64) -> bool {
        self.expiry_ms > now + 5_000
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Client-credentials token cache.
pub struct SpotifyTokenTracker {
    client: reqwest::Client,
    authorization: String,
    token: SharedRw<Option<SpotifyToken>>,
}

impl SpotifyTokenTracker {
    pub fn new(client: reqwest::Client, client_id: &str, client_secret: &str) -> Self {
        let encoded = BASE64_STANDARD.encode(format!("{}:{}", client_id, client_secret));
        Self {
            client,
            authorization: format!("Basic {}", encoded),
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn get_token(&self) -> Option<String> {
        {
            let token_lock = self.token.read().await;
            if let Some(token) = &*token_lock {
                if token.is_fresh(now_ms()) {
                    return Some(token.access_token.clone());
                }
            }
        }
        self.refresh_token().await
    }

    async fn refresh_token(&self) -> Option<String> {
        debug!("Requesting Spotify client-credentials token...");
        let resp = match self
            .client
            .post(TOKEN_URL)
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body("grant_type=client_credentials")
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!("Failed to request Spotify token: {}", e);
                return None;
            }
        };

        if !resp.status().is_success() {
            error!("Spotify token endpoint returned status {}", resp.status());
            return None;
        }

        let body: TokenResponse = match resp.json().await {
            Ok(b) => b,
            Err(e) => {
                error!("Failed to decode Spotify token response: {}", e);
                return None;
            }
        };

        let expiry_ms = now_ms() + body.expires_in * 1000;
        let mut token_lock = self.token.write().await;
        *token_lock = Some(SpotifyToken {
            access_token: body.access_token.clone(),
            expiry_ms,
        });

        debug!("Refreshed Spotify token. Expiry: {}", expiry_ms);
        Some(body.access_token)
    }
}
