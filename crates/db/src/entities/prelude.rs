//! Entity re-exports.

pub use super::accounts::Entity as Accounts;
pub use super::entries::Entity as Entries;
pub use super::tasks::Entity as Tasks;
pub use super::transfers::Entity as Transfers;
pub use super::users::Entity as Users;
pub use super::verify_emails::Entity as VerifyEmails;
