//! SurrealDB implementation of [`OfferRepository`].

use chrono::{DateTime, Utc};
use metalease_core::error::{MetaleaseError, MetaleaseResult};
use metalease_core::models::offer::{CreateOffer, Offer, OfferStatus, UpdateOffer};
use metalease_core::repository::{OfferFilter, OfferRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct OfferRow {
    project_id: String,
    resource_type: String,
    resource_uuid: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: String,
    properties: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct OfferRowWithId {
    record_id: String,
    project_id: String,
    resource_type: String,
    resource_uuid: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: String,
    properties: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<OfferStatus, DbError> {
    match s {
        "Available" => Ok(OfferStatus::Available),
        "Cancelled" => Ok(OfferStatus::Cancelled),
        "Expired" => Ok(OfferStatus::Expired),
        other => Err(DbError::Migration(format!("unknown offer status: {other}"))),
    }
}

fn status_to_string(s: &OfferStatus) -> &'static str {
    match s {
        OfferStatus::Available => "Available",
        OfferStatus::Cancelled => "Cancelled",
        OfferStatus::Expired => "Expired",
    }
}

fn row_to_offer(row: OfferRow, id: Uuid) -> Result<Offer, DbError> {
    Ok(Offer {
        id,
        project_id: row.project_id,
        resource_type: row.resource_type,
        resource_uuid: row.resource_uuid,
        start_time: row.start_time,
        end_time: row.end_time,
        status: parse_status(&row.status)?,
        properties: row.properties,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

impl OfferRowWithId {
    fn try_into_offer(self) -> Result<Offer, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        Ok(Offer {
            id,
            project_id: self.project_id,
            resource_type: self.resource_type,
            resource_uuid: self.resource_uuid,
            start_time: self.start_time,
            end_time: self.end_time,
            status: parse_status(&self.status)?,
            properties: self.properties,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Offer repository.
#[derive(Clone)]
pub struct SurrealOfferRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOfferRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OfferRepository for SurrealOfferRepository<C> {
    async fn create(&self, input: CreateOffer) -> MetaleaseResult<Offer> {
        input.validate()?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let properties = input
            .properties
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let mut result = self
            .db
            .query(
                "CREATE type::record('offer', $id) SET \
                 project_id = $project_id, \
                 resource_type = $resource_type, \
                 resource_uuid = $resource_uuid, \
                 start_time = $start_time, \
                 end_time = $end_time, \
                 status = 'Available', \
                 properties = $properties",
            )
            .bind(("id", id_str.clone()))
            .bind(("project_id", input.project_id))
            .bind(("resource_type", input.resource_type))
            .bind(("resource_uuid", input.resource_uuid))
            .bind(("start_time", input.start_time))
            .bind(("end_time", input.end_time))
            .bind(("properties", properties))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OfferRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "offer".into(),
            id: id_str,
        })?;

        row_to_offer(row, id).map_err(Into::into)
    }

    async fn get(&self, id: Uuid) -> MetaleaseResult<Offer> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('offer', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OfferRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "offer".into(),
            id: id_str,
        })?;

        row_to_offer(row, id).map_err(Into::into)
    }

    async fn get_all(&self, filter: OfferFilter) -> MetaleaseResult<Vec<Offer>> {
        let mut conditions = Vec::new();
        if filter.project_id.is_some() {
            conditions.push("project_id = $project_id");
        }
        if filter.resource_type.is_some() {
            conditions.push("resource_type = $resource_type");
        }
        if filter.resource_uuid.is_some() {
            conditions.push("resource_uuid = $resource_uuid");
        }
        if filter.status.is_some() {
            conditions.push("status = $status");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {} ", conditions.join(" AND "))
        };
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM offer \
             {where_clause}ORDER BY start_time ASC"
        );

        let mut builder = self.db.query(query);
        if let Some(project_id) = filter.project_id {
            builder = builder.bind(("project_id", project_id));
        }
        if let Some(resource_type) = filter.resource_type {
            builder = builder.bind(("resource_type", resource_type));
        }
        if let Some(resource_uuid) = filter.resource_uuid {
            builder = builder.bind(("resource_uuid", resource_uuid));
        }
        if let Some(ref status) = filter.status {
            builder = builder.bind(("status", status_to_string(status).to_string()));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<OfferRowWithId> = result.take(0).map_err(DbError::from)?;

        rows.into_iter()
            .map(|row| row.try_into_offer())
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn update(&self, id: Uuid, input: UpdateOffer) -> MetaleaseResult<Offer> {
        let current = self.get(id).await?;

        if let Some(next) = input.status {
            if !current.status.can_transition_to(next) {
                return Err(MetaleaseError::Validation {
                    message: format!(
                        "offer status cannot change from {:?} to {next:?}",
                        current.status
                    ),
                });
            }
        }
        if input.properties.is_some() && current.status != OfferStatus::Available {
            return Err(MetaleaseError::Validation {
                message: format!(
                    "offer properties can only be edited while Available, not {:?}",
                    current.status
                ),
            });
        }

        let mut sets = Vec::new();
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.properties.is_some() {
            sets.push("properties = $properties");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('offer', $id) SET {}",
            sets.join(", ")
        );

        let id_str = id.to_string();
        let mut builder = self.db.query(query).bind(("id", id_str.clone()));
        if let Some(ref status) = input.status {
            builder = builder.bind(("status", status_to_string(status).to_string()));
        }
        if let Some(properties) = input.properties {
            builder = builder.bind(("properties", properties));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<OfferRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "offer".into(),
            id: id_str,
        })?;

        row_to_offer(row, id).map_err(Into::into)
    }

    async fn destroy(&self, id: Uuid) -> MetaleaseResult<()> {
        // Existence check so destroying an absent offer surfaces NotFound.
        self.get(id).await?;

        self.db
            .query("DELETE type::record('offer', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}
