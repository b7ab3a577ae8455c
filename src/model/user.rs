use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({ "id": 12, "email": "ana.lopez@unici.edu.mx" }))]
pub struct CreatedUser {
    pub id: u64,
    pub email: String,
}
