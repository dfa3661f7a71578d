//! Port for the role reference table.
use async_trait::async_trait;

use crate::domain::Role;

use super::define_port_error;

define_port_error! {
    pub enum RolePersistenceError {
        Connection { message: String } => "role repository connection failed: {message}",
        Query { message: String } => "role repository query failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, RolePersistenceError>;
}
