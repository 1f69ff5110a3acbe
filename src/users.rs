use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    db::now_sec,
    entities::user,
    error::{AppError, AppResult},
    validation,
};

pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub api_token: String,
    pub is_admin: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserFilter {
    pub username: Option<String>,
    pub email: Option<String>,
}

pub async fn create<C: ConnectionTrait>(conn: &C, new: NewUser) -> AppResult<user::Model> {
    let username = validation::required_text("username", &new.username, validation::MAX_TITLE_LEN)?;
    let email = validation::email(&new.email)?;
    let now = now_sec();

    let model = user::ActiveModel {
        id: Default::default(),
        username: Set(username),
        email: Set(email),
        password_hash: Set(new.password_hash),
        api_token: Set(new.api_token),
        is_admin: Set(new.is_admin),
        created_at: Set(now),
        updated_at: Set(now),
    };

    model.insert(conn).await.map_err(|e| AppError::on_unique(e, "email or token already in use"))
}

pub async fn find_by_token<C: ConnectionTrait>(
    conn: &C,
    token: &str,
) -> AppResult<Option<user::Model>> {
    let user = user::Entity::find().filter(user::Column::ApiToken.eq(token)).one(conn).await?;
    Ok(user)
}

pub async fn update_profile<C: ConnectionTrait>(
    conn: &C,
    current: &user::Model,
    username: &str,
    email: &str,
) -> AppResult<user::Model> {
    let username = validation::required_text("username", username, validation::MAX_TITLE_LEN)?;
    let email = validation::email(email)?;

    let mut model: user::ActiveModel = current.clone().into();
    model.username = Set(username);
    model.email = Set(email);
    model.updated_at = Set(now_sec());

    model.update(conn).await.map_err(|e| AppError::on_unique(e, "email already in use"))
}

/// Removes the account; memberships, reviews and schedules go with it.
pub async fn delete<C: ConnectionTrait>(conn: &C, user_id: i32) -> AppResult<()> {
    let res = user::Entity::delete_by_id(user_id).exec(conn).await?;
    if res.rows_affected == 0 {
        return Err(AppError::not_found("user"));
    }
    info!(user_id = user_id, "user deleted");
    Ok(())
}

pub async fn list<C: ConnectionTrait>(
    conn: &C,
    filter: &UserFilter,
) -> AppResult<Vec<user::Model>> {
    let mut query = user::Entity::find().order_by_asc(user::Column::Id);
    if let Some(username) = validation::optional_text(filter.username.as_deref()) {
        query = query.filter(user::Column::Username.contains(username));
    }
    if let Some(email) = validation::optional_text(filter.email.as_deref()) {
        query = query.filter(user::Column::Email.contains(email));
    }
    Ok(query.all(conn).await?)
}

pub async fn admin_delete<C: ConnectionTrait>(
    conn: &C,
    admin: &user::Model,
    target_id: i32,
) -> AppResult<()> {
    if admin.id == target_id {
        return Err(AppError::Forbidden("administrators cannot delete their own account".into()));
    }
    delete(conn, target_id).await?;
    info!(admin_id = admin.id, user_id = target_id, "user removed by admin");
    Ok(())
}

/// Makes sure an administrator holding `token` exists.
pub async fn ensure_admin<C: ConnectionTrait>(conn: &C, token: &str) -> AppResult<user::Model> {
    if let Some(existing) = find_by_token(conn, token).await? {
        if !existing.is_admin {
            let mut model: user::ActiveModel = existing.into();
            model.is_admin = Set(true);
            model.updated_at = Set(now_sec());
            return Ok(model.update(conn).await?);
        }
        debug!(user_id = existing.id, "bootstrap admin already present");
        return Ok(existing);
    }

    let admin = create(
        conn,
        NewUser {
            username: "admin".to_string(),
            email: "admin@localhost.localdomain".to_string(),
            password_hash: String::new(),
            api_token: token.to_string(),
            is_admin: true,
        },
    )
    .await?;
    info!(user_id = admin.id, "bootstrap admin created");
    Ok(admin)
}
