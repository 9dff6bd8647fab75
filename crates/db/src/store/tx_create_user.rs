//! Create-user orchestrator.

use corebank_core::task::{SendVerifyEmailPayload, TASK_SEND_VERIFY_EMAIL, TaskOptions};
use sea_orm::ConnectionTrait;

use super::Store;
use crate::entities::users;
use crate::error::StoreError;
use crate::queue::TaskDistributor;
use crate::repositories::{CreateUserParams, Queries};

/// Input for [`Store::create_user_tx`].
#[derive(Debug, Clone)]
pub struct CreateUserTxParams {
    /// The user row to insert.
    pub user: CreateUserParams,
    /// Options of the verification email task.
    pub verify_email: TaskOptions,
}

impl Store {
    /// Creates a user and enqueues its verification email in one transaction.
    ///
    /// Either both the user row and the task exist afterwards, or neither does.
    ///
    /// # Errors
    ///
    /// `Conflict` for a taken username or email, `Enqueue` if the task cannot
    /// be written.
    pub async fn create_user_tx(&self, params: CreateUserTxParams) -> Result<users::Model, StoreError> {
        let distributor = self.distributor.clone();
        let user = self
            .execute(move |q| Box::pin(create_user_steps(q, distributor, params)))
            .await?;

        tracing::info!(username = %user.username, "user created");
        Ok(user)
    }
}

async fn create_user_steps<C: ConnectionTrait>(
    q: &Queries<'_, C>,
    distributor: TaskDistributor,
    params: CreateUserTxParams,
) -> Result<users::Model, StoreError> {
    let user = q.create_user(params.user).await?;

    let payload = SendVerifyEmailPayload {
        username: user.username.clone(),
    };
    distributor
        .distribute(q, TASK_SEND_VERIFY_EMAIL, &payload, params.verify_email)
        .await?;

    Ok(user)
}
