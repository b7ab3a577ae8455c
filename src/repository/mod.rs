//! Storage seams. Handlers only see these traits; `MySqlStore` backs all of them.

mod mysql;

pub use mysql::MySqlStore;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::StoreError;
use crate::model::request::{NewRequest, RequestKind, RequestRow};
use crate::model::role::Role;
use crate::model::user::CreatedUser;

/// Which rows of a request table a caller may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    All,
    ByEmployee(u64),
    ByApprover(u64),
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait RequestRepository: Send + Sync {
    /// Writes one row into the kind's table and returns its id.
    async fn insert(&self, request: &NewRequest) -> Result<u64, StoreError>;

    async fn list(&self, kind: RequestKind, scope: ListScope) -> Result<Vec<RequestRow>, StoreError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Direct manager of the employee, `None` when the profile has none.
    async fn direct_manager(&self, employee_id: u64) -> Result<Option<u64>, StoreError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn email_exists(&self, email: &str) -> Result<bool, StoreError>;

    async fn create_user(&self, email: &str, password_hash: &str) -> Result<CreatedUser, StoreError>;

    /// Returns the email the user had before, `None` when no user has that id.
    async fn update_user(&self, id: u64, email: &str, role: Role) -> Result<Option<String>, StoreError>;
}
