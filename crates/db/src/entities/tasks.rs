//! `SeaORM` Entity for tasks table.

use corebank_core::task::{TaskState, UnknownTaskState};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Routing name used to pick the handler.
    pub kind: String,
    /// JSON-encoded payload.
    pub payload: Vec<u8>,
    pub queue: String,
    pub state: String,
    pub retried: i32,
    pub max_retry: i32,
    pub last_error: Option<String>,
    pub process_at: DateTimeWithTimeZone,
    pub lease_expires_at: Option<DateTimeWithTimeZone>,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Parses the stored state.
    pub fn task_state(&self) -> Result<TaskState, UnknownTaskState> {
        self.state.parse()
    }

    /// Returns true once the retry budget is spent.
    #[must_use]
    pub const fn retries_exhausted(&self) -> bool {
        self.retried >= self.max_retry
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
