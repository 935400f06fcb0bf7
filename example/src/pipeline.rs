use pgline::{Connection, Result, types::Value};

pub async fn main() -> Result<()> {
    let mut conn = Connection::connect_env().await?;

    conn.query("CREATE TEMP TABLE pgline_tx(id int4)").await?;

    // `BEGIN` is written along with the insert
    let begin = conn.begin().await?;
    conn.execute("INSERT INTO pgline_tx VALUES($1)", &[Value::from(1)]).await?;
    begin.await?;
    conn.rollback().await?;

    let res = conn.query("SELECT count(*) FROM pgline_tx").await?;
    assert_eq!(res[0].rows[0].get::<i64, _>(0, conn.context())?, 0);

    let _begin = conn.begin().await?;
    conn.execute("INSERT INTO pgline_tx VALUES($1)", &[Value::from(2)]).await?;
    conn.commit().await?;

    // Requests are written before any response is read
    let first = conn.submit(pgline::protocol::QueryRequest::new("SELECT 1")).await?;
    let second = conn.submit(pgline::protocol::QueryRequest::new("SELECT 2")).await?;
    assert_eq!(second.await?[0].rows.len(), 1);
    assert_eq!(first.await?[0].rows.len(), 1);

    for notification in conn.take_notifications() {
        tracing::info!("{notification:?}");
    }

    conn.close().await?;
    Ok(())
}
