//! The slice of the platform's `founders` table this service writes to.

/// Copy the purchased product variant onto the founder account.
///
/// Returns `false` when no founder with that id exists.
pub async fn set_founder_user_type(
    conn: &mut sqlx::PgConnection,
    founder_id: &str,
    user_type: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE founders SET user_type = $2, updated_at = now() WHERE id = $1")
        .bind(founder_id)
        .bind(user_type)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
