use sqlx::PgConnection;
use uuid::Uuid;

/// `prefix` followed by `seq` zero-padded to `padding` digits.
pub fn format_transmittal_no(prefix: &str, seq: i32, padding: i32) -> String {
    let width = usize::try_from(padding).unwrap_or(0);
    format!("{prefix}{seq:0width$}")
}

/// Claims the project's next transmittal number.
///
/// The increment and read happen in one `UPDATE ... RETURNING`, which holds the
/// project row lock until the surrounding transaction ends; concurrent callers
/// on the same project queue behind it and can never observe the same value.
pub async fn next_transmittal_no(
    conn: &mut PgConnection,
    project_id: Uuid,
) -> Result<String, sqlx::Error> {
    let (seq, prefix, padding): (i32, String, i32) = sqlx::query_as(
        r#"
        UPDATE projects
        SET next_transmittal_seq = next_transmittal_seq + 1
        WHERE id = $1
        RETURNING next_transmittal_seq - 1, transmittal_prefix, transmittal_padding
        "#,
    )
    .bind(project_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(format_transmittal_no(&prefix, seq, padding))
}
