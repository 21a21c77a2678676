use crate::config::ServerConfig;
use crate::youtrack::types::*;
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

/// The agile endpoints the board screen needs
pub trait AgileApi {
    fn get_agile_user_profile(&self) -> impl Future<Output = Result<AgileUserProfile>> + Send;

    fn get_sprint(
        &self,
        agile_id: &str,
        sprint_id: &str,
    ) -> impl Future<Output = Result<SprintFull>> + Send;

    fn update_row_collapsed_state(
        &self,
        agile_id: &str,
        sprint_id: &str,
        patch: &RowPatch,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Browser URL for an issue
    fn issue_url(&self, id_readable: &str) -> String;
}

const PROFILE_FIELDS: &str = "defaultAgile(id,name),visitedSprints(id,name,agile(id,name))";

const ISSUE_FIELDS: &str = "id,idReadable,summary,description,resolved,created,updated,\
reporter(login,fullName),fields(name,value(name,presentation,fullName,login))";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("YouTrack rejected the token (HTTP {0}). Check server.token in config.toml")]
    Unauthenticated(StatusCode),
    #[error("YouTrack returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected YouTrack response")]
    Decode(#[source] serde_json::Error),
}

#[derive(Clone)]
pub struct YouTrackClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl YouTrackClient {
    pub fn new(server: &ServerConfig, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: server.url.trim_end_matches('/').to_string(),
            token: server.token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn sprint_path(&self, agile_id: &str, sprint_id: &str) -> String {
        format!(
            "{}/api/agiles/{}/sprints/{}",
            self.base_url,
            urlencoding::encode(agile_id),
            urlencoding::encode(sprint_id)
        )
    }

    fn row_url(&self, agile_id: &str, sprint_id: &str, patch: &RowPatch) -> String {
        let sprint = self.sprint_path(agile_id, sprint_id);
        if patch.type_name == "OrphanSwimlane" || patch.id == "orphans" {
            format!("{sprint}/board/orphanRow")
        } else {
            format!("{sprint}/board/swimlanes/{}", urlencoding::encode(&patch.id))
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Unauthenticated(status));
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status { status, body: body.trim().to_string() })
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, fields: &str) -> Result<T> {
        tracing::debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[("fields", fields)])
            .send()
            .await
            .map_err(ApiError::from)?;

        let bytes = Self::check(response)
            .await?
            .bytes()
            .await
            .map_err(ApiError::from)?;
        Ok(decode(&bytes)?)
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(ApiError::Decode)
}

impl AgileApi for YouTrackClient {
    async fn get_agile_user_profile(&self) -> Result<AgileUserProfile> {
        let url = format!("{}/api/agiles/agileUserProfile", self.base_url);
        self.get(&url, PROFILE_FIELDS).await
    }

    async fn get_sprint(&self, agile_id: &str, sprint_id: &str) -> Result<SprintFull> {
        let url = self.sprint_path(agile_id, sprint_id);
        self.get(&url, &sprint_fields()).await
    }

    async fn update_row_collapsed_state(
        &self,
        agile_id: &str,
        sprint_id: &str,
        patch: &RowPatch,
    ) -> Result<()> {
        let url = self.row_url(agile_id, sprint_id, patch);
        tracing::debug!(%url, collapsed = patch.collapsed, "POST row state");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .query(&[("fields", "id,collapsed")])
            .json(patch)
            .send()
            .await
            .map_err(ApiError::from)?;

        Self::check(response).await?;
        Ok(())
    }

    fn issue_url(&self, id_readable: &str) -> String {
        format!("{}/issue/{}", self.base_url, urlencoding::encode(id_readable))
    }
}

fn sprint_fields() -> String {
    let row = format!(
        "id,$type,collapsed,issue({ISSUE_FIELDS}),value(presentation),\
cells(id,column(id),issues({ISSUE_FIELDS}))"
    );
    format!(
        "id,name,agile(id,name,orphansAtTheTop),\
board(columns(id,collapsed,agileColumn(fieldValues(presentation))),\
orphanRow({row}),trimmedSwimlanes({row}))"
    )
}
