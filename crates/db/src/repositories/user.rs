//! User operations.

use chrono::Utc;
use corebank_shared::ListParams;
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::{NotSet, Unchanged},
    ConnectionTrait, EntityTrait, QueryOrder, QuerySelect, Set,
};

use super::Queries;
use crate::entities::users;
use crate::error::StoreError;

/// Input for [`Queries::create_user`].
#[derive(Debug, Clone)]
pub struct CreateUserParams {
    /// Unique login name.
    pub username: String,
    /// Argon2 PHC string.
    pub hashed_password: String,
    /// Display name.
    pub full_name: String,
    /// Unique email address.
    pub email: String,
}

/// Input for [`Queries::update_user`]; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserParams {
    /// New password hash; also stamps `password_changed_at`.
    pub hashed_password: Option<String>,
    /// New display name.
    pub full_name: Option<String>,
    /// New email address.
    pub email: Option<String>,
    /// New verification flag.
    pub is_email_verified: Option<bool>,
}

impl<C: ConnectionTrait> Queries<'_, C> {
    /// Creates a user. A duplicate username or email is a `Conflict`.
    pub async fn create_user(&self, params: CreateUserParams) -> Result<users::Model, StoreError> {
        let now = Utc::now().into();
        let user = users::ActiveModel {
            username: Set(params.username),
            hashed_password: Set(params.hashed_password),
            full_name: Set(params.full_name),
            email: Set(params.email),
            is_email_verified: Set(false),
            password_changed_at: Set(now),
            created_at: Set(now),
        };

        Ok(user.insert(self.conn).await?)
    }

    /// Gets a user by username.
    pub async fn get_user(&self, username: &str) -> Result<users::Model, StoreError> {
        users::Entity::find_by_id(username.to_string())
            .one(self.conn)
            .await?
            .ok_or_else(|| StoreError::not_found("user", username))
    }

    /// Lists users in creation order.
    pub async fn list_users(&self, params: ListParams) -> Result<Vec<users::Model>, StoreError> {
        Ok(users::Entity::find()
            .order_by_asc(users::Column::CreatedAt)
            .order_by_asc(users::Column::Username)
            .limit(params.limit)
            .offset(params.offset)
            .all(self.conn)
            .await?)
    }

    /// Updates the given fields of a user.
    pub async fn update_user(
        &self,
        username: &str,
        params: UpdateUserParams,
    ) -> Result<users::Model, StoreError> {
        let password_changed_at = if params.hashed_password.is_some() {
            Set(Utc::now().into())
        } else {
            NotSet
        };

        let user = users::ActiveModel {
            username: Unchanged(username.to_string()),
            hashed_password: params.hashed_password.map_or(NotSet, Set),
            full_name: params.full_name.map_or(NotSet, Set),
            email: params.email.map_or(NotSet, Set),
            is_email_verified: params.is_email_verified.map_or(NotSet, Set),
            password_changed_at,
            created_at: NotSet,
        };

        if !user.is_changed() {
            return self.get_user(username).await;
        }

        Ok(user.update(self.conn).await?)
    }

    /// Deletes a user.
    pub async fn delete_user(&self, username: &str) -> Result<(), StoreError> {
        let result = users::Entity::delete_by_id(username.to_string())
            .exec(self.conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(StoreError::not_found("user", username));
        }
        Ok(())
    }
}
