//! Verification email delivery.

use std::sync::Arc;

use async_trait::async_trait;
use corebank_core::task::SendVerifyEmailPayload;
use corebank_core::verification::generate_secret_code;
use corebank_db::entities::{tasks, users, verify_emails};
use corebank_db::{CreateVerifyEmailParams, Store, StoreError};
use corebank_shared::{EmailMessage, Mailer};
use tracing::info;

use crate::handler::{HandlerError, TaskHandler};

const SUBJECT: &str = "Welcome to Corebank";

/// Handles `task:send_verify_email`.
///
/// Each attempt supersedes the user's outstanding codes with a fresh one and
/// mails the link for it, so a redelivered task never leaves two valid codes.
pub struct SendVerifyEmailHandler {
    store: Store,
    mailer: Arc<dyn Mailer>,
    verify_url_base: String,
}

impl SendVerifyEmailHandler {
    /// Creates the handler. `verify_url_base` is the public origin of the API.
    pub fn new(store: Store, mailer: Arc<dyn Mailer>, verify_url_base: impl Into<String>) -> Self {
        Self {
            store,
            mailer,
            verify_url_base: verify_url_base.into(),
        }
    }

    fn verify_link(&self, record: &verify_emails::Model, secret_code: &str) -> String {
        format!(
            "{}/api/v1/users/verify-email?email_id={}&secret_code={}",
            self.verify_url_base.trim_end_matches('/'),
            record.id,
            secret_code
        )
    }

    async fn issue_code(
        &self,
        user: &users::Model,
        secret_code: String,
    ) -> Result<verify_emails::Model, StoreError> {
        let params = CreateVerifyEmailParams {
            username: user.username.clone(),
            email: user.email.clone(),
            secret_code,
        };

        self.store
            .execute(move |q| {
                Box::pin(async move {
                    q.invalidate_verify_emails(&params.username).await?;
                    q.create_verify_email(params).await
                })
            })
            .await
    }
}

#[async_trait]
impl TaskHandler for SendVerifyEmailHandler {
    async fn handle(&self, task: &tasks::Model) -> Result<(), HandlerError> {
        let payload: SendVerifyEmailPayload = serde_json::from_slice(&task.payload)
            .map_err(|e| HandlerError::skip_retry(format!("invalid payload: {e}")))?;

        let user = match self.store.queries().get_user(&payload.username).await {
            Ok(user) => user,
            Err(StoreError::NotFound(msg)) => return Err(HandlerError::SkipRetry(msg)),
            Err(err) => return Err(HandlerError::retry(err)),
        };

        if user.is_email_verified {
            info!(username = %user.username, "email already verified, skipping");
            return Ok(());
        }

        let secret_code = generate_secret_code();
        let record = self
            .issue_code(&user, secret_code.clone())
            .await
            .map_err(HandlerError::retry)?;

        let link = self.verify_link(&record, &secret_code);
        let message = EmailMessage {
            to: user.email.clone(),
            to_name: user.full_name.clone(),
            subject: SUBJECT.to_string(),
            body: format!(
                "Hello {},\n\nThank you for registering with us!\n\
                 Please verify your email address by opening the link below:\n\n{link}\n\n\
                 The link expires in 15 minutes.\n",
                user.full_name
            ),
        };

        self.mailer.send_email(&message).await.map_err(|e| {
            if e.is_permanent() {
                HandlerError::skip_retry(e)
            } else {
                HandlerError::retry(e)
            }
        })?;

        info!(
            task_type = %task.kind,
            username = %user.username,
            email = %user.email,
            "verification email sent"
        );
        Ok(())
    }
}
