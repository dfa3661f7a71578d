//! PostgreSQL-backed `RoleRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::Role;
use crate::domain::ports::{RolePersistenceError, RoleRepository};

use super::diesel_helpers::{DbFailure, bounded};
use super::models::RoleRow;
use super::pool::DbPool;
use super::schema::roles;

#[derive(Clone)]
pub struct DieselRoleRepository {
    pool: DbPool,
}

impl DieselRoleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl From<DbFailure> for RolePersistenceError {
    fn from(failure: DbFailure) -> Self {
        match failure {
            DbFailure::Connection(message) => Self::connection(message),
            DbFailure::Query(message) => Self::query(message),
            DbFailure::UniqueViolation { .. }
            | DbFailure::ForeignKeyViolation { .. }
            | DbFailure::CheckViolation { .. } => Self::query("constraint violated"),
        }
    }
}

#[async_trait]
impl RoleRepository for DieselRoleRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, RolePersistenceError> {
        bounded("find role", async {
            let mut conn = self.pool.get().await.map_err(DbFailure::from)?;
            let row: Option<RoleRow> = roles::table
                .filter(roles::name.eq(name))
                .select(RoleRow::as_select())
                .first(&mut conn)
                .await
                .optional()
                .map_err(DbFailure::from)?;
            Ok(row.map(Role::from))
        })
        .await
    }
}
