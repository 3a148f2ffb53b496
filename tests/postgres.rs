//! Decoding against a live server. Runs only when `DATABASE_URL` is set,
//! e.g. `DATABASE_URL=postgres://postgres@localhost:5432/postgres`.

use serde_json::{Value, json};

use schemorm::{Connection, Error, PgConnection, Statement};

fn connection() -> Option<PgConnection> {
    let url = std::env::var("DATABASE_URL").ok()?;
    Some(PgConnection::from_url(&url).expect("DATABASE_URL must be a valid postgres url"))
}

fn raw(sql: &str) -> Statement {
    Statement {
        sql: sql.to_string(),
        params: Vec::new(),
    }
}

#[tokio::test]
async fn test_decodes_numeric_temporal_and_uuid_columns() {
    let Some(conn) = connection() else {
        return;
    };

    let rows = conn
        .execute(&raw(
            "SELECT 12.50::numeric AS total, \
                    DATE '2024-01-02' AS day, \
                    TIMESTAMPTZ '2024-01-02 03:04:05+00' AS at, \
                    '6f1c7a4e-9d3b-4c2a-8f10-1a2b3c4d5e6f'::uuid AS uid, \
                    7::int4 AS n, \
                    NULL::numeric AS missing",
        ))
        .await
        .unwrap();

    let row = &rows[0];
    assert_eq!(row["total"], json!("12.50"));
    assert_eq!(row["day"], json!("2024-01-02"));
    assert_eq!(row["at"], json!("2024-01-02T03:04:05+00:00"));
    assert_eq!(row["uid"], json!("6f1c7a4e-9d3b-4c2a-8f10-1a2b3c4d5e6f"));
    assert_eq!(row["n"], json!(7));
    assert_eq!(row["missing"], Value::Null);

    conn.close().await;
}

#[tokio::test]
async fn test_undecodable_column_is_an_error() {
    let Some(conn) = connection() else {
        return;
    };

    let err = conn
        .execute(&raw("SELECT '127.0.0.1'::inet AS addr"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Database(sqlx::Error::ColumnDecode { ref index, .. }) if index == "addr"
    ));

    conn.close().await;
}

#[tokio::test]
async fn test_uuid_identity_is_returned() {
    let Some(conn) = connection() else {
        return;
    };

    let id = conn
        .execute_returning_id(&raw(
            "SELECT '6f1c7a4e-9d3b-4c2a-8f10-1a2b3c4d5e6f'::uuid AS id",
        ))
        .await
        .unwrap();
    assert_eq!(id, Some(json!("6f1c7a4e-9d3b-4c2a-8f10-1a2b3c4d5e6f")));

    conn.close().await;
}
