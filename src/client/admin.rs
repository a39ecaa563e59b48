use anyhow::{Context as _, Result};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;

use crate::arena::{AllianceStation, ArenaStatus, MatchState, StationStatus, StationUpdate};
use crate::server::api::{DisplayCommandReport, HealthReport, MatchUpdate};

/// HTTP client for the server's admin endpoints
#[derive(Clone)]
pub struct AdminClient {
    http: Client,
    base: String,
    token: Option<String>,
}

impl AdminClient {
    pub fn new(base: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub async fn health(&self) -> Result<HealthReport> {
        self.get("/health").await
    }

    pub async fn status(&self) -> Result<ArenaStatus> {
        self.get("/api/arena/status").await
    }

    pub async fn reload(&self) -> Result<DisplayCommandReport> {
        self.post("/api/displays/reload", &()).await
    }

    pub async fn disconnect_all(&self) -> Result<DisplayCommandReport> {
        self.post("/api/displays/disconnect", &()).await
    }

    pub async fn update_station(
        &self,
        station: AllianceStation,
        update: &StationUpdate,
    ) -> Result<StationStatus> {
        self.post(&format!("/api/arena/stations/{station}"), update)
            .await
    }

    pub async fn set_match_state(&self, state: MatchState, match_number: Option<u32>) -> Result<()> {
        let update = MatchUpdate {
            state,
            match_number,
        };
        self.authorized(self.http.post(self.url("/api/arena/match")))
            .json(&update)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.http
            .get(self.url(path))
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("unexpected response from {path}"))
    }

    async fn post<B: Serialize + ?Sized, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.authorized(self.http.post(self.url(path)))
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {path} failed"))?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("unexpected response from {path}"))
    }
}
