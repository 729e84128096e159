//! SurrealDB implementation of [`LeaseRequestRepository`].

use chrono::{DateTime, Utc};
use metalease_core::error::MetaleaseResult;
use metalease_core::models::lease_request::{
    CreateLeaseRequest, LeaseRequest, LeaseRequestStatus, UpdateLeaseRequest,
};
use metalease_core::repository::LeaseRequestRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct LeaseRequestRow {
    project_id: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: String,
    properties: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct LeaseRequestRowWithId {
    record_id: String,
    project_id: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: String,
    properties: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<LeaseRequestStatus, DbError> {
    match s {
        "Requested" => Ok(LeaseRequestStatus::Requested),
        "Granted" => Ok(LeaseRequestStatus::Granted),
        "Rejected" => Ok(LeaseRequestStatus::Rejected),
        "Cancelled" => Ok(LeaseRequestStatus::Cancelled),
        other => Err(DbError::Migration(format!(
            "unknown lease request status: {other}"
        ))),
    }
}

fn status_to_string(s: &LeaseRequestStatus) -> &'static str {
    match s {
        LeaseRequestStatus::Requested => "Requested",
        LeaseRequestStatus::Granted => "Granted",
        LeaseRequestStatus::Rejected => "Rejected",
        LeaseRequestStatus::Cancelled => "Cancelled",
    }
}

fn row_to_request(row: LeaseRequestRow, id: Uuid) -> Result<LeaseRequest, DbError> {
    Ok(LeaseRequest {
        id,
        project_id: row.project_id,
        start_time: row.start_time,
        end_time: row.end_time,
        status: parse_status(&row.status)?,
        properties: row.properties,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

impl LeaseRequestRowWithId {
    fn try_into_request(self) -> Result<LeaseRequest, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        Ok(LeaseRequest {
            id,
            project_id: self.project_id,
            start_time: self.start_time,
            end_time: self.end_time,
            status: parse_status(&self.status)?,
            properties: self.properties,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the LeaseRequest repository.
#[derive(Clone)]
pub struct SurrealLeaseRequestRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealLeaseRequestRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> LeaseRequestRepository for SurrealLeaseRequestRepository<C> {
    async fn create(&self, input: CreateLeaseRequest) -> MetaleaseResult<LeaseRequest> {
        input.validate()?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let properties = input
            .properties
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let mut result = self
            .db
            .query(
                "CREATE type::record('lease_request', $id) SET \
                 project_id = $project_id, \
                 start_time = $start_time, \
                 end_time = $end_time, \
                 status = 'Requested', \
                 properties = $properties",
            )
            .bind(("id", id_str.clone()))
            .bind(("project_id", input.project_id))
            .bind(("start_time", input.start_time))
            .bind(("end_time", input.end_time))
            .bind(("properties", properties))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LeaseRequestRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "lease_request".into(),
            id: id_str,
        })?;

        row_to_request(row, id).map_err(Into::into)
    }

    async fn get(&self, id: Uuid) -> MetaleaseResult<LeaseRequest> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('lease_request', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LeaseRequestRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "lease_request".into(),
            id: id_str,
        })?;

        row_to_request(row, id).map_err(Into::into)
    }

    async fn get_all(&self) -> MetaleaseResult<Vec<LeaseRequest>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM lease_request \
                 ORDER BY created_at ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LeaseRequestRowWithId> = result.take(0).map_err(DbError::from)?;

        rows.into_iter()
            .map(|row| row.try_into_request())
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn get_all_by_project(&self, project_id: &str) -> MetaleaseResult<Vec<LeaseRequest>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM lease_request \
                 WHERE project_id = $project_id \
                 ORDER BY created_at ASC",
            )
            .bind(("project_id", project_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LeaseRequestRowWithId> = result.take(0).map_err(DbError::from)?;

        rows.into_iter()
            .map(|row| row.try_into_request())
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn update(&self, id: Uuid, input: UpdateLeaseRequest) -> MetaleaseResult<LeaseRequest> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.properties.is_some() {
            sets.push("properties = $properties");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('lease_request', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(query).bind(("id", id_str.clone()));
        if let Some(ref status) = input.status {
            builder = builder.bind(("status", status_to_string(status).to_string()));
        }
        if let Some(properties) = input.properties {
            builder = builder.bind(("properties", properties));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<LeaseRequestRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "lease_request".into(),
            id: id_str,
        })?;

        row_to_request(row, id).map_err(Into::into)
    }

    async fn destroy(&self, id: Uuid) -> MetaleaseResult<()> {
        self.get(id).await?;

        // Grants keep living after their request; unlink, then delete.
        self.db
            .query(
                "UPDATE leased_node SET request_id = NONE, \
                 updated_at = time::now() WHERE request_id = $id; \
                 DELETE type::record('lease_request', $id);",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}
