//! HTTP store client
//!
//! Talks to the store's PostgREST-style REST layer: one resource path per
//! relation under `/rest/v1/`, `eq.`/`lt.` column filters in the query
//! string, and `Prefer: return=representation` to get affected rows back
//! from writes. Conditional updates that match zero rows are how a lost
//! claim race shows up.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::store::records::{AgentRecord, Job, JobLog, NewJobLog};
use crate::store::{StoreClient, StoreError};

/// Store client over the REST API
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
    key: String,
}

impl HttpStore {
    /// Create a client from the store configuration
    ///
    /// # Errors
    /// * `StoreError::Transport` if the underlying HTTP client cannot be
    ///   constructed
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            key: config.key.clone(),
        })
    }

    fn endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.key).bearer_auth(&self.key)
    }

    /// Filter matching every job claimable at `now`: pending, or claimed
    /// with a lapsed claim
    fn claimable_filter(now: DateTime<Utc>) -> String {
        format!(
            "(status.eq.pending,and(status.eq.claimed,claim_expires_at.lt.{}))",
            now.to_rfc3339()
        )
    }

    /// Send a request and decode the row array the store replies with
    async fn expect_rows<T: DeserializeOwned>(
        builder: RequestBuilder,
    ) -> Result<Vec<T>, StoreError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(StoreError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Like `expect_rows`, but the caller expects exactly one affected row
    async fn expect_row<T: DeserializeOwned>(
        builder: RequestBuilder,
        table: &'static str,
    ) -> Result<T, StoreError> {
        let mut rows = Self::expect_rows(builder).await?;
        if rows.is_empty() {
            return Err(StoreError::NoRows { table });
        }
        Ok(rows.remove(0))
    }
}

#[async_trait]
impl StoreClient for HttpStore {
    async fn register_agent(&self, name: &str) -> Result<AgentRecord, StoreError> {
        let request = self
            .authed(self.client.post(self.endpoint("agents")))
            .header("Prefer", "return=representation")
            .json(&json!({ "name": name, "last_seen": Utc::now() }));

        Self::expect_row(request, "agents").await
    }

    async fn touch_agent(&self, agent_id: Uuid, seen_at: DateTime<Utc>) -> Result<(), StoreError> {
        let request = self
            .authed(self.client.patch(self.endpoint("agents")))
            .query(&[("id", format!("eq.{agent_id}"))])
            .header("Prefer", "return=minimal")
            .json(&json!({ "last_seen": seen_at }));

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(StoreError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn fetch_claimable(
        &self,
        agent_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Job>, StoreError> {
        let request = self
            .authed(self.client.get(self.endpoint("jobs")))
            .query(&[
                ("select", "*".to_string()),
                ("agent_id", format!("eq.{agent_id}")),
                ("or", Self::claimable_filter(now)),
            ]);

        Self::expect_rows(request).await
    }

    async fn claim_job(
        &self,
        job_id: Uuid,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<Job>, StoreError> {
        let request = self
            .authed(self.client.patch(self.endpoint("jobs")))
            .query(&[
                ("id", format!("eq.{job_id}")),
                ("or", Self::claimable_filter(now)),
            ])
            .header("Prefer", "return=representation")
            .json(&json!({ "status": "claimed", "claim_expires_at": expires_at }));

        let mut rows: Vec<Job> = Self::expect_rows(request).await?;
        if rows.is_empty() {
            // The guard matched nothing: another instance claimed it first.
            debug!(job_id = %job_id, "conditional claim matched no rows");
            return Ok(None);
        }
        Ok(Some(rows.remove(0)))
    }

    async fn insert_log(&self, log: NewJobLog) -> Result<JobLog, StoreError> {
        let request = self
            .authed(self.client.post(self.endpoint("job_logs")))
            .header("Prefer", "return=representation")
            .json(&log);

        Self::expect_row(request, "job_logs").await
    }

    async fn mark_done(&self, job_id: Uuid) -> Result<Job, StoreError> {
        let request = self
            .authed(self.client.patch(self.endpoint("jobs")))
            .query(&[
                ("id", format!("eq.{job_id}")),
                ("status", "eq.claimed".to_string()),
            ])
            .header("Prefer", "return=representation")
            .json(&json!({ "status": "done", "claim_expires_at": null }));

        Self::expect_row(request, "jobs").await
    }

    async fn release_job(&self, job_id: Uuid) -> Result<Job, StoreError> {
        let request = self
            .authed(self.client.patch(self.endpoint("jobs")))
            .query(&[
                ("id", format!("eq.{job_id}")),
                ("status", "eq.claimed".to_string()),
            ])
            .header("Prefer", "return=representation")
            .json(&json!({ "status": "pending", "claim_expires_at": null }));

        Self::expect_row(request, "jobs").await
    }
}
