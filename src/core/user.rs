//! User directory - get-or-create lookup by Telegram id and the admin role check.

use crate::{
    entities::{Role, User, user},
    errors::Result,
};
use sea_orm::{Set, prelude::*, sea_query::OnConflict};
use tracing::{info, instrument};

/// Finds a user by their Telegram id.
pub async fn get_user_by_tg_id<C>(db: &C, tg_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::TgId.eq(tg_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns the user with this Telegram id, creating a regular user on first contact.
///
/// Concurrent first contacts for the same id resolve to one row: the insert
/// skips on a `tg_id` conflict and the stored row is read back.
///
/// Only fails on storage errors.
#[instrument(skip(db))]
pub async fn get_or_create_user<C>(db: &C, tg_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = get_user_by_tg_id(db, tg_id).await? {
        return Ok(existing);
    }

    let user = user::ActiveModel {
        tg_id: Set(tg_id),
        role: Set(Role::User),
        email: Set(None),
        phone: Set(None),
        ..Default::default()
    };
    let inserted = User::insert(user)
        .on_conflict(
            OnConflict::column(user::Column::TgId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    let stored = get_user_by_tg_id(db, tg_id)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("user with tg_id {tg_id}")))?;
    if inserted > 0 {
        info!(user_id = stored.id, "Registered new user");
    }
    Ok(stored)
}

/// Grants the admin role, creating the user if needed.
///
/// Used by bootstrap seeding; regular request handling never elevates roles.
#[instrument(skip(db))]
pub async fn grant_admin<C>(db: &C, tg_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let existing = get_or_create_user(db, tg_id).await?;
    if existing.role.is_admin() {
        return Ok(existing);
    }

    let mut user: user::ActiveModel = existing.into();
    user.role = Set(Role::Admin);
    let updated = user.update(db).await?;
    info!(user_id = updated.id, "Granted admin role");
    Ok(updated)
}

/// Boolean role check for admin-only operations.
pub async fn is_admin<C>(db: &C, tg_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(get_user_by_tg_id(db, tg_id)
        .await?
        .is_some_and(|user| user.role.is_admin()))
}

/// Stores contact details that are copied onto the user's future orders.
///
/// `None` leaves the stored value untouched.
pub async fn update_contact<C>(
    db: &C,
    tg_id: i64,
    email: Option<String>,
    phone: Option<String>,
) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let mut user: user::ActiveModel = get_or_create_user(db, tg_id).await?.into();
    if let Some(email) = email {
        user.email = Set(Some(email.trim().to_string()));
    }
    if let Some(phone) = phone {
        user.phone = Set(Some(phone.trim().to_string()));
    }
    user.update(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_get_or_create_user_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;

        let first = get_or_create_user(&db, 1001).await?;
        assert_eq!(first.tg_id, 1001);
        assert_eq!(first.role, Role::User);

        let second = get_or_create_user(&db, 1001).await?;
        assert_eq!(second.id, first.id);
        assert_eq!(User::find().count(&db).await?, 1);

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_simultaneous_first_contact_creates_one_user() -> Result<()> {
        let (_dir, db) = setup_pooled_test_db(2).await?;

        let (first, second) = tokio::join!(
            get_or_create_user(&db, 555),
            get_or_create_user(&db, 555),
        );

        assert_eq!(first?.id, second?.id);
        assert_eq!(User::find().count(&db).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_grant_admin_and_role_check() -> Result<()> {
        let db = setup_test_db().await?;

        assert!(!is_admin(&db, 42).await?);
        get_or_create_user(&db, 42).await?;
        assert!(!is_admin(&db, 42).await?);

        let admin = grant_admin(&db, 42).await?;
        assert_eq!(admin.role, Role::Admin);
        assert!(is_admin(&db, 42).await?);

        // Granting twice keeps a single admin row
        grant_admin(&db, 42).await?;
        assert_eq!(User::find().count(&db).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_contact_keeps_unset_fields() -> Result<()> {
        let db = setup_test_db().await?;

        update_contact(&db, 7, Some(" buyer@example.com ".to_string()), None).await?;
        let user = update_contact(&db, 7, None, Some("+10000000000".to_string())).await?;

        assert_eq!(user.email.as_deref(), Some("buyer@example.com"));
        assert_eq!(user.phone.as_deref(), Some("+10000000000"));
        Ok(())
    }
}
