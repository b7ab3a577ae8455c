use async_trait::async_trait;
use sqlx::MySqlPool;
use tracing::debug;

use super::{ListScope, ProfileRepository, RequestRepository, UserRepository};
use crate::error::StoreError;
use crate::model::request::{NewRequest, RequestKind, RequestRow};
use crate::model::role::Role;
use crate::model::user::CreatedUser;
use crate::utils::db_utils::{SqlValue, build_insert_sql, execute_insert};

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestRepository for MySqlStore {
    async fn insert(&self, request: &NewRequest) -> Result<u64, StoreError> {
        let mut columns = Vec::with_capacity(request.fields.len() + 2);
        columns.push(("employee_id", SqlValue::U64(request.employee_id)));
        columns.push(("approver_id", SqlValue::U64(request.approver_id)));
        columns.extend(request.fields.iter().cloned());

        let statement = build_insert_sql(request.kind.table(), columns);
        debug!(sql = %statement.sql, kind = %request.kind, "Inserting request");

        Ok(execute_insert(&self.pool, statement).await?)
    }

    async fn list(&self, kind: RequestKind, scope: ListScope) -> Result<Vec<RequestRow>, StoreError> {
        let (where_sql, bound) = match scope {
            ListScope::All => ("", None),
            ListScope::ByEmployee(id) => ("WHERE r.employee_id = ?", Some(id)),
            ListScope::ByApprover(id) => ("WHERE r.approver_id = ?", Some(id)),
        };

        let sql = format!(
            r#"
            SELECT
                r.id,
                r.employee_id,
                r.approver_id,
                CONCAT(e.first_name, ' ', e.last_name) AS employee_name,
                r.motivo,
                r.status,
                r.created_at
            FROM {} r
            LEFT JOIN employees e ON e.id = r.employee_id
            {}
            ORDER BY r.created_at DESC
            "#,
            kind.table(),
            where_sql
        );

        let mut query = sqlx::query_as::<_, RequestRow>(&sql);
        if let Some(id) = bound {
            query = query.bind(id);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl ProfileRepository for MySqlStore {
    async fn direct_manager(&self, employee_id: u64) -> Result<Option<u64>, StoreError> {
        let manager = sqlx::query_scalar::<_, Option<u64>>(
            "SELECT direct_manager_id FROM employees WHERE id = ?",
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(manager.flatten())
    }
}

#[async_trait]
impl UserRepository for MySqlStore {
    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> Result<CreatedUser, StoreError> {
        let result = sqlx::query("INSERT INTO users (email, password, role_id) VALUES (?, ?, ?)")
            .bind(email)
            .bind(password_hash)
            .bind(Role::Employee.id())
            .execute(&self.pool)
            .await?;

        Ok(CreatedUser {
            id: result.last_insert_id(),
            email: email.to_string(),
        })
    }

    async fn update_user(&self, id: u64, email: &str, role: Role) -> Result<Option<String>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = ? FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(previous) = previous else {
            return Ok(None);
        };

        sqlx::query("UPDATE users SET email = ?, role_id = ? WHERE id = ?")
            .bind(email)
            .bind(role.id())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(previous))
    }
}
