//! SurrealDB implementation of [`LeasedNodeRepository`] and
//! [`ConflictSource`].
//!
//! `create_checked` is the single write path for committed leases. The
//! overlap re-check and the insert run inside one SurrealDB transaction,
//! so two concurrent admissions for overlapping windows on the same
//! resource cannot both commit.

use chrono::{DateTime, Utc};
use metalease_core::error::{MetaleaseError, MetaleaseResult};
use metalease_core::interval::Interval;
use metalease_core::models::leased_node::{CreateLeasedNode, LeasedNode, UpdateLeasedNode};
use metalease_core::repository::{ConflictSource, LeasedNodeRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Marker thrown inside the admission transaction on overlap.
const CONFLICT_MARKER: &str = "lease_window_conflict";

#[derive(Debug, SurrealValue)]
struct LeasedNodeRow {
    request_id: Option<String>,
    project_id: String,
    resource_type: String,
    resource_uuid: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct LeasedNodeRowWithId {
    record_id: String,
    request_id: Option<String>,
    project_id: String,
    resource_type: String,
    resource_uuid: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct IntervalRow {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

fn parse_request_id(raw: Option<String>) -> Result<Option<Uuid>, DbError> {
    raw.map(|r| Uuid::parse_str(&r))
        .transpose()
        .map_err(|e| DbError::Migration(format!("invalid request UUID: {e}")))
}

fn row_to_node(row: LeasedNodeRow, id: Uuid) -> Result<LeasedNode, DbError> {
    Ok(LeasedNode {
        id,
        request_id: parse_request_id(row.request_id)?,
        project_id: row.project_id,
        resource_type: row.resource_type,
        resource_uuid: row.resource_uuid,
        start_time: row.start_time,
        end_time: row.end_time,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

impl LeasedNodeRowWithId {
    fn try_into_node(self) -> Result<LeasedNode, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        Ok(LeasedNode {
            id,
            request_id: parse_request_id(self.request_id)?,
            project_id: self.project_id,
            resource_type: self.resource_type,
            resource_uuid: self.resource_uuid,
            start_time: self.start_time,
            end_time: self.end_time,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the LeasedNode repository.
#[derive(Clone)]
pub struct SurrealLeasedNodeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealLeasedNodeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn list(
        &self,
        query: &'static str,
        bind: Option<(&'static str, String)>,
    ) -> MetaleaseResult<Vec<LeasedNode>> {
        let mut builder = self.db.query(query);
        if let Some((key, value)) = bind {
            builder = builder.bind((key, value));
        }
        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<LeasedNodeRowWithId> = result.take(0).map_err(DbError::from)?;

        rows.into_iter()
            .map(|row| row.try_into_node())
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }
}

impl<C: Connection> ConflictSource for SurrealLeasedNodeRepository<C> {
    async fn conflicting_intervals(
        &self,
        resource_type: &str,
        resource_uuid: &str,
        window: Interval,
    ) -> MetaleaseResult<Vec<Interval>> {
        let mut result = self
            .db
            .query(
                "SELECT start_time, end_time FROM leased_node \
                 WHERE resource_type = $resource_type \
                 AND resource_uuid = $resource_uuid \
                 AND start_time < $end_time \
                 AND end_time > $start_time",
            )
            .bind(("resource_type", resource_type.to_string()))
            .bind(("resource_uuid", resource_uuid.to_string()))
            .bind(("start_time", window.start))
            .bind(("end_time", window.end))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IntervalRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| Interval {
                start: row.start_time,
                end: row.end_time,
            })
            .collect())
    }
}

impl<C: Connection> LeasedNodeRepository for SurrealLeasedNodeRepository<C> {
    async fn create_checked(&self, input: CreateLeasedNode) -> MetaleaseResult<LeasedNode> {
        if input.start_time >= input.end_time {
            return Err(MetaleaseError::Validation {
                message: format!(
                    "lease start_time {} must precede end_time {}",
                    input.start_time, input.end_time
                ),
            });
        }

        let id = Uuid::new_v4();

        // Overlap check and insert in one transaction. THROW cancels the
        // whole transaction, surfacing the marker as a query error.
        let query = format!(
            "BEGIN TRANSACTION; \
             LET $overlap = (SELECT VALUE id FROM leased_node \
                 WHERE resource_type = $resource_type \
                 AND resource_uuid = $resource_uuid \
                 AND start_time < $end_time \
                 AND end_time > $start_time); \
             IF array::len($overlap) > 0 {{ THROW '{CONFLICT_MARKER}' }}; \
             CREATE type::record('leased_node', $id) SET \
                 request_id = $request_id, \
                 project_id = $project_id, \
                 resource_type = $resource_type, \
                 resource_uuid = $resource_uuid, \
                 start_time = $start_time, \
                 end_time = $end_time; \
             COMMIT TRANSACTION;"
        );

        let resource_uuid = input.resource_uuid.clone();
        let result = self
            .db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("request_id", input.request_id.map(|r| r.to_string())))
            .bind(("project_id", input.project_id))
            .bind(("resource_type", input.resource_type))
            .bind(("resource_uuid", input.resource_uuid))
            .bind(("start_time", input.start_time))
            .bind(("end_time", input.end_time))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| {
            let msg = e.to_string();
            if msg.contains(CONFLICT_MARKER) {
                DbError::LeaseConflict { resource_uuid }
            } else {
                DbError::Migration(msg)
            }
        })?;

        // Re-read the committed row to pick up server-assigned fields.
        self.get(id).await
    }

    async fn get(&self, id: Uuid) -> MetaleaseResult<LeasedNode> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('leased_node', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LeasedNodeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "leased_node".into(),
            id: id_str,
        })?;

        row_to_node(row, id).map_err(Into::into)
    }

    async fn get_all(&self) -> MetaleaseResult<Vec<LeasedNode>> {
        self.list(
            "SELECT meta::id(id) AS record_id, * FROM leased_node \
             ORDER BY start_time ASC",
            None,
        )
        .await
    }

    async fn get_all_by_request(&self, request_id: Uuid) -> MetaleaseResult<Vec<LeasedNode>> {
        self.list(
            "SELECT meta::id(id) AS record_id, * FROM leased_node \
             WHERE request_id = $request_id \
             ORDER BY start_time ASC",
            Some(("request_id", request_id.to_string())),
        )
        .await
    }

    async fn get_all_by_project(&self, project_id: &str) -> MetaleaseResult<Vec<LeasedNode>> {
        self.list(
            "SELECT meta::id(id) AS record_id, * FROM leased_node \
             WHERE project_id = $project_id \
             ORDER BY start_time ASC",
            Some(("project_id", project_id.to_string())),
        )
        .await
    }

    async fn update(&self, id: Uuid, input: UpdateLeasedNode) -> MetaleaseResult<LeasedNode> {
        let current = self.get(id).await?;

        // Shorten-only: extending a lease must re-enter admission.
        if let Some(new_end) = input.end_time {
            if new_end > current.end_time {
                return Err(MetaleaseError::Validation {
                    message: format!(
                        "lease end_time can only be shortened ({} -> {new_end})",
                        current.end_time
                    ),
                });
            }
            if new_end <= current.start_time {
                return Err(MetaleaseError::Validation {
                    message: format!(
                        "lease end_time {new_end} must stay after start_time {}",
                        current.start_time
                    ),
                });
            }
        }

        let mut sets = Vec::new();
        if input.end_time.is_some() {
            sets.push("end_time = $end_time");
        }
        if input.request_id.is_some() {
            sets.push("request_id = $request_id");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('leased_node', $id) SET {}",
            sets.join(", ")
        );

        let id_str = id.to_string();
        let mut builder = self.db.query(query).bind(("id", id_str.clone()));
        if let Some(end_time) = input.end_time {
            builder = builder.bind(("end_time", end_time));
        }
        if let Some(request_id) = input.request_id {
            builder = builder.bind(("request_id", request_id.map(|r| r.to_string())));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<LeasedNodeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "leased_node".into(),
            id: id_str,
        })?;

        row_to_node(row, id).map_err(Into::into)
    }

    async fn destroy(&self, id: Uuid) -> MetaleaseResult<()> {
        // Existence check so releasing an absent grant surfaces NotFound.
        self.get(id).await?;

        self.db
            .query("DELETE type::record('leased_node', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}
