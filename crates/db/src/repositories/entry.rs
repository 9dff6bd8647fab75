//! Entry operations.

use chrono::Utc;
use corebank_shared::ListParams;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use super::Queries;
use crate::entities::entries;
use crate::error::StoreError;

/// Input for [`Queries::create_entry`].
#[derive(Debug, Clone, Copy)]
pub struct CreateEntryParams {
    /// Account the entry belongs to.
    pub account_id: i64,
    /// Signed amount.
    pub amount: i64,
    /// Transfer that produced the entry, if any.
    pub transfer_id: Option<i64>,
}

/// Filter for [`Queries::list_entries`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryFilter {
    /// Only entries of this account.
    pub account_id: Option<i64>,
    /// Only entries of this transfer.
    pub transfer_id: Option<i64>,
}

impl<C: ConnectionTrait> Queries<'_, C> {
    /// Creates an entry.
    pub async fn create_entry(&self, params: CreateEntryParams) -> Result<entries::Model, StoreError> {
        let entry = entries::ActiveModel {
            account_id: Set(params.account_id),
            amount: Set(params.amount),
            transfer_id: Set(params.transfer_id),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        Ok(entry.insert(self.conn).await?)
    }

    /// Gets an entry by id.
    pub async fn get_entry(&self, id: i64) -> Result<entries::Model, StoreError> {
        entries::Entity::find_by_id(id)
            .one(self.conn)
            .await?
            .ok_or_else(|| StoreError::not_found("entry", id))
    }

    /// Lists entries in id order.
    pub async fn list_entries(
        &self,
        filter: EntryFilter,
        params: ListParams,
    ) -> Result<Vec<entries::Model>, StoreError> {
        let mut query = entries::Entity::find();
        if let Some(account_id) = filter.account_id {
            query = query.filter(entries::Column::AccountId.eq(account_id));
        }
        if let Some(transfer_id) = filter.transfer_id {
            query = query.filter(entries::Column::TransferId.eq(transfer_id));
        }

        Ok(query
            .order_by_asc(entries::Column::Id)
            .limit(params.limit)
            .offset(params.offset)
            .all(self.conn)
            .await?)
    }

    /// Changes an entry amount.
    pub async fn update_entry(&self, id: i64, amount: i64) -> Result<entries::Model, StoreError> {
        let entry = entries::ActiveModel {
            id: Set(id),
            amount: Set(amount),
            ..Default::default()
        };

        Ok(entry.update(self.conn).await?)
    }

    /// Deletes an entry.
    pub async fn delete_entry(&self, id: i64) -> Result<(), StoreError> {
        let result = entries::Entity::delete_by_id(id).exec(self.conn).await?;
        if result.rows_affected == 0 {
            return Err(StoreError::not_found("entry", id));
        }
        Ok(())
    }
}
