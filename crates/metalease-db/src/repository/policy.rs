//! SurrealDB implementation of [`PolicyRepository`].
//!
//! Applied-policy associations live in their own table keyed by the
//! `(node_uuid, policy_id)` composite; destroying a policy removes its
//! associations in the same query.

use chrono::{DateTime, Utc};
use metalease_core::error::MetaleaseResult;
use metalease_core::models::policy::{AppliedPolicy, CreatePolicy, Policy, UpdatePolicy};
use metalease_core::repository::PolicyRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PolicyRow {
    project_id: String,
    name: String,
    properties: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct PolicyRowWithId {
    record_id: String,
    project_id: String,
    name: String,
    properties: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct AppliedPolicyRow {
    node_uuid: String,
    policy_id: String,
    project_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_policy(row: PolicyRow, id: Uuid) -> Policy {
    Policy {
        id,
        project_id: row.project_id,
        name: row.name,
        properties: row.properties,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

impl PolicyRowWithId {
    fn try_into_policy(self) -> Result<Policy, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        Ok(Policy {
            id,
            project_id: self.project_id,
            name: self.name,
            properties: self.properties,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl AppliedPolicyRow {
    fn try_into_applied(self) -> Result<AppliedPolicy, DbError> {
        let policy_id = Uuid::parse_str(&self.policy_id)
            .map_err(|e| DbError::Migration(format!("invalid policy UUID: {e}")))?;
        Ok(AppliedPolicy {
            node_uuid: self.node_uuid,
            policy_id,
            project_id: self.project_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Policy repository.
#[derive(Clone)]
pub struct SurrealPolicyRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPolicyRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_applied(
        &self,
        query: &'static str,
        bind: Option<(&'static str, String)>,
    ) -> MetaleaseResult<Vec<AppliedPolicy>> {
        let mut builder = self.db.query(query);
        if let Some((key, value)) = bind {
            builder = builder.bind((key, value));
        }
        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<AppliedPolicyRow> = result.take(0).map_err(DbError::from)?;

        rows.into_iter()
            .map(|row| row.try_into_applied())
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }
}

impl<C: Connection> PolicyRepository for SurrealPolicyRepository<C> {
    async fn create(&self, input: CreatePolicy) -> MetaleaseResult<Policy> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let properties = input
            .properties
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('policy', $id) SET \
                 project_id = $project_id, \
                 name = $name, \
                 properties = $properties",
            )
            .bind(("id", id_str.clone()))
            .bind(("project_id", input.project_id))
            .bind(("name", input.name))
            .bind(("properties", properties))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<PolicyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "policy".into(),
            id: id_str,
        })?;

        Ok(row_to_policy(row, id))
    }

    async fn get(&self, id: Uuid) -> MetaleaseResult<Policy> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('policy', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PolicyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "policy".into(),
            id: id_str,
        })?;

        Ok(row_to_policy(row, id))
    }

    async fn get_all(&self) -> MetaleaseResult<Vec<Policy>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM policy \
                 ORDER BY created_at ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PolicyRowWithId> = result.take(0).map_err(DbError::from)?;

        rows.into_iter()
            .map(|row| row.try_into_policy())
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn get_all_by_project(&self, project_id: &str) -> MetaleaseResult<Vec<Policy>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM policy \
                 WHERE project_id = $project_id \
                 ORDER BY created_at ASC",
            )
            .bind(("project_id", project_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PolicyRowWithId> = result.take(0).map_err(DbError::from)?;

        rows.into_iter()
            .map(|row| row.try_into_policy())
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }

    async fn update(&self, id: Uuid, input: UpdatePolicy) -> MetaleaseResult<Policy> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.properties.is_some() {
            sets.push("properties = $properties");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('policy', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(query).bind(("id", id_str.clone()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(properties) = input.properties {
            builder = builder.bind(("properties", properties));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<PolicyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "policy".into(),
            id: id_str,
        })?;

        Ok(row_to_policy(row, id))
    }

    async fn destroy(&self, id: Uuid) -> MetaleaseResult<()> {
        self.get(id).await?;

        // Remove applied-policy associations, then the policy itself.
        self.db
            .query(
                "DELETE applied_policy WHERE policy_id = $id; \
                 DELETE type::record('policy', $id);",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn apply_to_node(
        &self,
        node_uuid: &str,
        policy_id: Uuid,
    ) -> MetaleaseResult<AppliedPolicy> {
        // The policy must exist; its project scopes the association.
        let policy = self.get(policy_id).await?;

        let result = self
            .db
            .query(
                "CREATE applied_policy SET \
                 node_uuid = $node_uuid, \
                 policy_id = $policy_id, \
                 project_id = $project_id",
            )
            .bind(("node_uuid", node_uuid.to_string()))
            .bind(("policy_id", policy_id.to_string()))
            .bind(("project_id", policy.project_id))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<AppliedPolicyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "applied_policy".into(),
            id: format!("{node_uuid}:{policy_id}"),
        })?;

        row.try_into_applied().map_err(Into::into)
    }

    async fn get_applied(
        &self,
        node_uuid: &str,
        policy_id: Uuid,
    ) -> MetaleaseResult<AppliedPolicy> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM applied_policy \
                 WHERE node_uuid = $node_uuid AND policy_id = $policy_id",
            )
            .bind(("node_uuid", node_uuid.to_string()))
            .bind(("policy_id", policy_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AppliedPolicyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "applied_policy".into(),
            id: format!("{node_uuid}:{policy_id}"),
        })?;

        row.try_into_applied().map_err(Into::into)
    }

    async fn get_all_applied(&self) -> MetaleaseResult<Vec<AppliedPolicy>> {
        self.fetch_applied("SELECT * FROM applied_policy ORDER BY created_at ASC", None)
            .await
    }

    async fn get_all_applied_by_project(
        &self,
        project_id: &str,
    ) -> MetaleaseResult<Vec<AppliedPolicy>> {
        self.fetch_applied(
            "SELECT * FROM applied_policy \
             WHERE project_id = $project_id \
             ORDER BY created_at ASC",
            Some(("project_id", project_id.to_string())),
        )
        .await
    }

    async fn remove_from_node(&self, node_uuid: &str, policy_id: Uuid) -> MetaleaseResult<()> {
        self.get_applied(node_uuid, policy_id).await?;

        self.db
            .query(
                "DELETE applied_policy \
                 WHERE node_uuid = $node_uuid AND policy_id = $policy_id",
            )
            .bind(("node_uuid", node_uuid.to_string()))
            .bind(("policy_id", policy_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}
