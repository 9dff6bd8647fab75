//! Transfer orchestrator.

use corebank_core::transfer::{TransferRequest, balance_updates, validate_transfer};
use sea_orm::ConnectionTrait;
use serde::Serialize;
use tracing::instrument;

use super::Store;
use crate::entities::{accounts, entries, transfers};
use crate::error::StoreError;
use crate::repositories::{CreateEntryParams, CreateTransferParams, Queries};

/// Rows touched by one transfer, as of commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferTxResult {
    /// The transfer record.
    pub transfer: transfers::Model,
    /// Debit entry on the source account.
    pub from_entry: entries::Model,
    /// Credit entry on the destination account.
    pub to_entry: entries::Model,
    /// Source account with its new balance.
    pub from_account: accounts::Model,
    /// Destination account with its new balance.
    pub to_account: accounts::Model,
}

impl Store {
    /// Moves `amount` between two accounts in one transaction.
    ///
    /// Records the transfer and its two offsetting entries, then applies both
    /// balance changes in ascending account id order so that concurrent
    /// transfers over the same pair always lock rows in the same order.
    ///
    /// # Errors
    ///
    /// `Validation` if the accounts are equal or the amount is not positive,
    /// checked before a transaction is opened. Any later failure rolls back
    /// every row written by the transfer.
    #[instrument(skip(self), fields(from = request.from_account_id, to = request.to_account_id, amount = request.amount))]
    pub async fn transfer_tx(&self, request: TransferRequest) -> Result<TransferTxResult, StoreError> {
        validate_transfer(&request)?;

        let result = self
            .execute(move |q| Box::pin(transfer_steps(q, request)))
            .await?;

        tracing::info!(transfer_id = result.transfer.id, "transfer committed");
        Ok(result)
    }
}

async fn transfer_steps<C: ConnectionTrait>(
    q: &Queries<'_, C>,
    request: TransferRequest,
) -> Result<TransferTxResult, StoreError> {
    let transfer = q
        .create_transfer(CreateTransferParams {
            from_account_id: request.from_account_id,
            to_account_id: request.to_account_id,
            amount: request.amount,
        })
        .await?;

    let from_entry = q
        .create_entry(CreateEntryParams {
            account_id: request.from_account_id,
            amount: -request.amount,
            transfer_id: Some(transfer.id),
        })
        .await?;

    let to_entry = q
        .create_entry(CreateEntryParams {
            account_id: request.to_account_id,
            amount: request.amount,
            transfer_id: Some(transfer.id),
        })
        .await?;

    let [first, second] = balance_updates(
        request.from_account_id,
        request.to_account_id,
        request.amount,
    );
    let first = q.add_account_balance(first.account_id, first.delta).await?;
    let second = q.add_account_balance(second.account_id, second.delta).await?;

    let (from_account, to_account) = if first.id == request.from_account_id {
        (first, second)
    } else {
        (second, first)
    };

    Ok(TransferTxResult {
        transfer,
        from_entry,
        to_entry,
        from_account,
        to_account,
    })
}
