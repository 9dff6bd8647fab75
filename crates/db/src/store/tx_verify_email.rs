//! Verify-email orchestrator.

use chrono::Utc;
use corebank_core::verification::{VerificationError, check_redeemable};
use sea_orm::ConnectionTrait;

use super::Store;
use crate::entities::{users, verify_emails};
use crate::error::StoreError;
use crate::repositories::{Queries, UpdateUserParams};

/// Input for [`Store::verify_email_tx`].
#[derive(Debug, Clone)]
pub struct VerifyEmailTxParams {
    /// Verification record id from the mailed link.
    pub email_id: i64,
    /// Plaintext code from the mailed link.
    pub secret_code: String,
}

/// Rows updated by a successful verification.
#[derive(Debug, Clone)]
pub struct VerifyEmailTxResult {
    /// The user, now verified.
    pub user: users::Model,
    /// The redeemed record.
    pub verify_email: verify_emails::Model,
}

impl Store {
    /// Redeems a verification code and marks the user's email verified.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown record, `Verification` if the code does not
    /// match, was already used or expired. Nothing changes on failure.
    pub async fn verify_email_tx(
        &self,
        params: VerifyEmailTxParams,
    ) -> Result<VerifyEmailTxResult, StoreError> {
        let result = self
            .execute(move |q| Box::pin(verify_email_steps(q, params)))
            .await?;

        tracing::info!(username = %result.user.username, "email verified");
        Ok(result)
    }
}

async fn verify_email_steps<C: ConnectionTrait>(
    q: &Queries<'_, C>,
    params: VerifyEmailTxParams,
) -> Result<VerifyEmailTxResult, StoreError> {
    let record = q.get_verify_email(params.email_id).await?;
    check_redeemable(
        &record.secret_code_hash,
        record.is_used,
        record.expired_at.with_timezone(&Utc),
        &params.secret_code,
        Utc::now(),
    )?;

    if !q.redeem_verify_email(record.id).await? {
        return Err(VerificationError::AlreadyUsed.into());
    }

    let user = q
        .update_user(
            &record.username,
            UpdateUserParams {
                is_email_verified: Some(true),
                ..Default::default()
            },
        )
        .await?;
    let verify_email = q.get_verify_email(record.id).await?;

    Ok(VerifyEmailTxResult { user, verify_email })
}
