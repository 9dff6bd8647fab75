//! Transfer route.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use corebank_core::currency::Currency;
use corebank_core::transfer::{TransferRequest, validate_transfer};
use corebank_db::TransferTxResult;
use corebank_db::entities::accounts;
use corebank_shared::AppError;
use serde::Deserialize;
use tracing::info;

use crate::{AppState, error::ApiError};

/// Creates the transfer routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/transfers", post(create_transfer))
}

/// Request body for a transfer.
#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    /// Account debited.
    pub from_account_id: i64,
    /// Account credited.
    pub to_account_id: i64,
    /// Minor units, strictly positive.
    pub amount: i64,
    /// Currency both accounts must hold.
    pub currency: String,
}

/// POST /transfers - Move money between two accounts.
///
/// Both accounts must exist and hold the request currency, and the source
/// must cover the amount. The balance check is advisory: the store applies
/// the transfer atomically but does not forbid negative balances.
async fn create_transfer(
    State(state): State<AppState>,
    Json(payload): Json<CreateTransferRequest>,
) -> Result<(StatusCode, Json<TransferTxResult>), ApiError> {
    let currency: Currency = payload
        .currency
        .parse()
        .map_err(|e: corebank_core::currency::UnsupportedCurrency| {
            AppError::Validation(e.to_string())
        })?;

    let request = TransferRequest::new(
        payload.from_account_id,
        payload.to_account_id,
        payload.amount,
    );
    validate_transfer(&request).map_err(|e| AppError::Validation(e.to_string()))?;

    let q = state.store.queries();
    let from = q.get_account(request.from_account_id).await?;
    let to = q.get_account(request.to_account_id).await?;
    check_currency(&from, currency)?;
    check_currency(&to, currency)?;

    if from.balance < request.amount {
        return Err(AppError::BusinessRule(format!(
            "insufficient funds in account {}: balance {}, requested {}",
            from.id, from.balance, request.amount
        ))
        .into());
    }

    let result = state.store.transfer_tx(request).await?;
    info!(
        transfer_id = result.transfer.id,
        from = result.from_account.id,
        to = result.to_account.id,
        amount = result.transfer.amount,
        "transfer completed"
    );

    Ok((StatusCode::CREATED, Json(result)))
}

fn check_currency(account: &accounts::Model, currency: Currency) -> Result<(), ApiError> {
    if account.currency == currency.code() {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "account {} currency mismatch: {} vs {}",
            account.id,
            account.currency,
            currency.code()
        ))
        .into())
    }
}
