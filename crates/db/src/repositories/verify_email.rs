//! Verify-email record operations.

use chrono::Utc;
use corebank_core::verification;
use corebank_shared::ListParams;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, sea_query::Expr,
};

use super::Queries;
use crate::entities::verify_emails;
use crate::error::StoreError;

/// Input for [`Queries::create_verify_email`].
#[derive(Debug, Clone)]
pub struct CreateVerifyEmailParams {
    /// User being verified.
    pub username: String,
    /// Address the code is sent to.
    pub email: String,
    /// Plaintext secret code; only its digest is stored.
    pub secret_code: String,
}

impl<C: ConnectionTrait> Queries<'_, C> {
    /// Creates a verification record expiring after the standard TTL.
    pub async fn create_verify_email(
        &self,
        params: CreateVerifyEmailParams,
    ) -> Result<verify_emails::Model, StoreError> {
        let now = Utc::now();
        let record = verify_emails::ActiveModel {
            username: Set(params.username),
            email: Set(params.email),
            secret_code_hash: Set(verification::hash_secret_code(&params.secret_code)),
            is_used: Set(false),
            created_at: Set(now.into()),
            expired_at: Set(verification::expires_at(now).into()),
            ..Default::default()
        };

        Ok(record.insert(self.conn).await?)
    }

    /// Gets a verification record by id.
    pub async fn get_verify_email(&self, id: i64) -> Result<verify_emails::Model, StoreError> {
        verify_emails::Entity::find_by_id(id)
            .one(self.conn)
            .await?
            .ok_or_else(|| StoreError::not_found("verify email", id))
    }

    /// Lists a user's verification records in id order.
    pub async fn list_verify_emails(
        &self,
        username: &str,
        params: ListParams,
    ) -> Result<Vec<verify_emails::Model>, StoreError> {
        Ok(verify_emails::Entity::find()
            .filter(verify_emails::Column::Username.eq(username))
            .order_by_asc(verify_emails::Column::Id)
            .limit(params.limit)
            .offset(params.offset)
            .all(self.conn)
            .await?)
    }

    /// Marks an unused record as used.
    ///
    /// Returns `false` if the record was already used, so two concurrent
    /// redemptions of the same code cannot both succeed.
    pub async fn redeem_verify_email(&self, id: i64) -> Result<bool, StoreError> {
        let result = verify_emails::Entity::update_many()
            .col_expr(verify_emails::Column::IsUsed, Expr::value(true))
            .filter(verify_emails::Column::Id.eq(id))
            .filter(verify_emails::Column::IsUsed.eq(false))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Marks every unused record of a user as used. Returns how many were invalidated.
    pub async fn invalidate_verify_emails(&self, username: &str) -> Result<u64, StoreError> {
        let result = verify_emails::Entity::update_many()
            .col_expr(verify_emails::Column::IsUsed, Expr::value(true))
            .filter(verify_emails::Column::Username.eq(username))
            .filter(verify_emails::Column::IsUsed.eq(false))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected)
    }

    /// Deletes a verification record.
    pub async fn delete_verify_email(&self, id: i64) -> Result<(), StoreError> {
        let result = verify_emails::Entity::delete_by_id(id).exec(self.conn).await?;
        if result.rows_affected == 0 {
            return Err(StoreError::not_found("verify email", id));
        }
        Ok(())
    }
}
