//! Account routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use corebank_core::currency::Currency;
use corebank_db::CreateAccountParams;
use corebank_db::entities::accounts;
use corebank_shared::{AppError, ListParams, PageRequest, PageResponse};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/{account_id}", get(get_account))
}

/// Request body for opening an account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Owning username.
    pub owner: String,
    /// One of the supported currency codes.
    pub currency: String,
}

/// Query parameters for listing accounts.
#[derive(Debug, Deserialize)]
pub struct ListAccountsQuery {
    /// Restrict to one owner.
    pub owner: Option<String>,
    /// Page number (1-indexed, default: 1).
    pub page: Option<u32>,
    /// Items per page (default: 20, max: 100).
    pub per_page: Option<u32>,
}

impl ListAccountsQuery {
    fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            page: self.page.unwrap_or(defaults.page).max(1),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

/// POST /accounts - Open an account with a zero balance.
async fn create_account(
    State(state): State<AppState>,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<accounts::Model>), ApiError> {
    let currency: Currency = payload
        .currency
        .parse()
        .map_err(|e: corebank_core::currency::UnsupportedCurrency| {
            AppError::Validation(e.to_string())
        })?;

    let account = state
        .store
        .queries()
        .create_account(CreateAccountParams {
            owner: payload.owner,
            balance: 0,
            currency: currency.code().to_string(),
        })
        .await?;

    tracing::info!(account_id = account.id, owner = %account.owner, "account created");
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET /accounts/{account_id}
async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
) -> Result<Json<accounts::Model>, ApiError> {
    let account = state.store.queries().get_account(account_id).await?;
    Ok(Json(account))
}

/// GET /accounts - List accounts page by page.
async fn list_accounts(
    State(state): State<AppState>,
    Query(query): Query<ListAccountsQuery>,
) -> Result<Json<PageResponse<accounts::Model>>, ApiError> {
    let page = query.page_request();
    let owner = query.owner.as_deref();
    let q = state.store.queries();

    let data = q.list_accounts(owner, ListParams::from(&page)).await?;
    let total = q.count_accounts(owner).await?;

    #[allow(clippy::cast_possible_truncation)]
    let per_page = page.limit() as u32;
    Ok(Json(PageResponse::new(data, page.page, per_page, total)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults_and_clamps() {
        let query = ListAccountsQuery {
            owner: None,
            page: None,
            per_page: None,
        };
        let page = query.page_request();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit(), 20);

        let query = ListAccountsQuery {
            owner: None,
            page: Some(0),
            per_page: Some(1_000),
        };
        let page = query.page_request();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit(), 100);
        assert_eq!(page.offset(), 0);
    }
}
