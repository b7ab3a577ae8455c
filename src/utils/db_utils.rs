use chrono::{NaiveDate, NaiveTime};
use sqlx::MySqlPool;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    U64(u64),
    Date(NaiveDate),
    Time(NaiveTime),
    Null,
}

/// ===============================
/// SQL statement container
/// ===============================
#[derive(Debug)]
pub struct SqlStatement {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic INSERT SQL
/// ===============================
pub fn build_insert_sql(table: &str, columns: Vec<(&str, SqlValue)>) -> SqlStatement {
    let names = columns
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ");

    let placeholders = vec!["?"; columns.len()].join(", ");

    let sql = format!("INSERT INTO {} ({}) VALUES ({})", table, names, placeholders);

    SqlStatement {
        sql,
        values: columns.into_iter().map(|(_, value)| value).collect(),
    }
}

/// ===============================
/// Execute the insert, returning the new id
/// ===============================
pub async fn execute_insert(pool: &MySqlPool, statement: SqlStatement) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&statement.sql);

    for value in statement.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Time(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.last_insert_id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_sql_keeps_column_order() {
        let stmt = build_insert_sql(
            "solicitudes_retardo",
            vec![
                ("employee_id", SqlValue::U64(1)),
                ("approver_id", SqlValue::U64(7)),
                ("motivo", SqlValue::Null),
            ],
        );

        assert_eq!(
            stmt.sql,
            "INSERT INTO solicitudes_retardo (employee_id, approver_id, motivo) VALUES (?, ?, ?)"
        );
        assert_eq!(stmt.values, vec![SqlValue::U64(1), SqlValue::U64(7), SqlValue::Null]);
    }
}
