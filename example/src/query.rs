use pgline::{Connection, Result, types::Value};

pub async fn main() -> Result<()> {
    let mut conn = Connection::connect_env().await?;

    // Simple query

    let results = conn
        .query("CREATE TEMP TABLE pgline(id serial, name text, data bytea); SELECT 1")
        .await?;

    assert_eq!(results.len(), 2);
    assert_eq!(results[1].rows.len(), 1);

    // Extended query

    let res = conn
        .execute(
            "INSERT INTO pgline(name, data) VALUES($1, $2)",
            &[Value::from("Deez"), Value::from(&b"\x00\x01Foo\\"[..])],
        )
        .await?;

    assert_eq!(res.rows_affected(), 1);

    conn.query("INSERT INTO pgline(name, data) VALUES('Foo', NULL)").await?;

    let res = conn.execute("SELECT id, name, data FROM pgline ORDER BY id", &[]).await?;
    assert_eq!(res.rows.len(), 2);

    let row = &res.rows[0];
    assert_eq!(row.get::<String, _>("name", conn.context())?, "Deez");
    assert_eq!(row.get::<Vec<u8>, _>("data", conn.context())?, b"\x00\x01Foo\\");

    let row = &res.rows[1];
    assert_eq!(row.get::<Option<Vec<u8>>, _>(2, conn.context())?, None);

    // Text format bytea follows `bytea_output`

    let results = conn.query("SET bytea_output = 'escape'; SELECT data FROM pgline LIMIT 1").await?;
    let row = &results[1].rows[0];
    assert_eq!(row.get::<Vec<u8>, _>(0, conn.context())?, b"\x00\x01Foo\\");

    // Prepared statement is cached

    let stmt = conn.prepare("SELECT name FROM pgline WHERE id = $1").await?;
    let again = conn.prepare("SELECT name FROM pgline WHERE id = $1").await?;
    assert_eq!(stmt.name(), again.name());

    // Json and time

    let res = conn.execute("SELECT '{\"a\":1}'::jsonb, now()::timestamp", &[]).await?;
    let row = &res.rows[0];
    let json = row.get::<serde_json::Value, _>(0, conn.context())?;
    assert_eq!(json["a"], 1);
    let _now = row.get::<time::PrimitiveDateTime, _>(1, conn.context())?;

    // Error case

    conn.query("SELECT foo").await.unwrap_err();
    conn.execute("SELECT $1::int4", &[]).await.unwrap_err();

    let err = conn.execute("SELECT 1/0", &[]).await.unwrap_err();
    assert!(err.as_database().is_some());

    // Connection is still usable

    conn.query("SELECT 1").await?;
    conn.close().await?;

    Ok(())
}
