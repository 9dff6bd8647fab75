//! Account operations.

use chrono::Utc;
use corebank_shared::ListParams;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, sea_query::Expr,
};

use super::Queries;
use crate::entities::accounts;
use crate::error::StoreError;

/// Input for [`Queries::create_account`].
#[derive(Debug, Clone)]
pub struct CreateAccountParams {
    /// Owning username.
    pub owner: String,
    /// Opening balance.
    pub balance: i64,
    /// ISO currency code.
    pub currency: String,
}

impl<C: ConnectionTrait> Queries<'_, C> {
    /// Creates an account.
    pub async fn create_account(
        &self,
        params: CreateAccountParams,
    ) -> Result<accounts::Model, StoreError> {
        let account = accounts::ActiveModel {
            owner: Set(params.owner),
            balance: Set(params.balance),
            currency: Set(params.currency),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        Ok(account.insert(self.conn).await?)
    }

    /// Gets an account by id.
    pub async fn get_account(&self, id: i64) -> Result<accounts::Model, StoreError> {
        accounts::Entity::find_by_id(id)
            .one(self.conn)
            .await?
            .ok_or_else(|| StoreError::not_found("account", id))
    }

    /// Gets an account and locks its row until the transaction ends.
    ///
    /// On backends without row locks (SQLite) this is a plain read.
    pub async fn get_account_for_update(&self, id: i64) -> Result<accounts::Model, StoreError> {
        accounts::Entity::find_by_id(id)
            .lock_exclusive()
            .one(self.conn)
            .await?
            .ok_or_else(|| StoreError::not_found("account", id))
    }

    /// Lists accounts in id order, optionally restricted to one owner.
    pub async fn list_accounts(
        &self,
        owner: Option<&str>,
        params: ListParams,
    ) -> Result<Vec<accounts::Model>, StoreError> {
        let mut query = accounts::Entity::find();
        if let Some(owner) = owner {
            query = query.filter(accounts::Column::Owner.eq(owner));
        }

        Ok(query
            .order_by_asc(accounts::Column::Id)
            .limit(params.limit)
            .offset(params.offset)
            .all(self.conn)
            .await?)
    }

    /// Counts accounts, optionally restricted to one owner.
    pub async fn count_accounts(&self, owner: Option<&str>) -> Result<u64, StoreError> {
        let mut query = accounts::Entity::find();
        if let Some(owner) = owner {
            query = query.filter(accounts::Column::Owner.eq(owner));
        }

        Ok(query.count(self.conn).await?)
    }

    /// Overwrites an account balance.
    pub async fn update_account(&self, id: i64, balance: i64) -> Result<accounts::Model, StoreError> {
        let account = accounts::ActiveModel {
            id: Set(id),
            balance: Set(balance),
            ..Default::default()
        };

        Ok(account.update(self.conn).await?)
    }

    /// Atomically adds `delta` to an account balance and returns the updated row.
    ///
    /// The increment is computed by the database (`balance = balance + delta`),
    /// so concurrent updates never lose a write. Callers touching more than one
    /// account must apply updates in ascending id order.
    pub async fn add_account_balance(
        &self,
        id: i64,
        delta: i64,
    ) -> Result<accounts::Model, StoreError> {
        let result = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::Balance,
                Expr::col(accounts::Column::Balance).add(delta),
            )
            .filter(accounts::Column::Id.eq(id))
            .exec(self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::not_found("account", id));
        }

        self.get_account(id).await
    }

    /// Deletes an account.
    pub async fn delete_account(&self, id: i64) -> Result<(), StoreError> {
        let result = accounts::Entity::delete_by_id(id).exec(self.conn).await?;
        if result.rows_affected == 0 {
            return Err(StoreError::not_found("account", id));
        }
        Ok(())
    }
}
