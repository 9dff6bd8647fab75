//! Transfer operations.

use chrono::Utc;
use corebank_shared::ListParams;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use super::Queries;
use crate::entities::transfers;
use crate::error::StoreError;

/// Input for [`Queries::create_transfer`].
#[derive(Debug, Clone, Copy)]
pub struct CreateTransferParams {
    /// Debited account.
    pub from_account_id: i64,
    /// Credited account.
    pub to_account_id: i64,
    /// Positive amount.
    pub amount: i64,
}

impl<C: ConnectionTrait> Queries<'_, C> {
    /// Creates a transfer record. Balances are not touched.
    pub async fn create_transfer(
        &self,
        params: CreateTransferParams,
    ) -> Result<transfers::Model, StoreError> {
        let transfer = transfers::ActiveModel {
            from_account_id: Set(params.from_account_id),
            to_account_id: Set(params.to_account_id),
            amount: Set(params.amount),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        Ok(transfer.insert(self.conn).await?)
    }

    /// Gets a transfer by id.
    pub async fn get_transfer(&self, id: i64) -> Result<transfers::Model, StoreError> {
        transfers::Entity::find_by_id(id)
            .one(self.conn)
            .await?
            .ok_or_else(|| StoreError::not_found("transfer", id))
    }

    /// Lists transfers in id order; with `account_id`, those touching it on either side.
    pub async fn list_transfers(
        &self,
        account_id: Option<i64>,
        params: ListParams,
    ) -> Result<Vec<transfers::Model>, StoreError> {
        let mut query = transfers::Entity::find();
        if let Some(account_id) = account_id {
            query = query.filter(
                Condition::any()
                    .add(transfers::Column::FromAccountId.eq(account_id))
                    .add(transfers::Column::ToAccountId.eq(account_id)),
            );
        }

        Ok(query
            .order_by_asc(transfers::Column::Id)
            .limit(params.limit)
            .offset(params.offset)
            .all(self.conn)
            .await?)
    }

    /// Changes a transfer amount.
    pub async fn update_transfer(&self, id: i64, amount: i64) -> Result<transfers::Model, StoreError> {
        let transfer = transfers::ActiveModel {
            id: Set(id),
            amount: Set(amount),
            ..Default::default()
        };

        Ok(transfer.update(self.conn).await?)
    }

    /// Deletes a transfer.
    pub async fn delete_transfer(&self, id: i64) -> Result<(), StoreError> {
        let result = transfers::Entity::delete_by_id(id).exec(self.conn).await?;
        if result.rows_affected == 0 {
            return Err(StoreError::not_found("transfer", id));
        }
        Ok(())
    }
}
