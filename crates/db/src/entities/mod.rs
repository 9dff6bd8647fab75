//! `SeaORM` entity definitions.

pub mod prelude;

pub mod accounts;
pub mod entries;
pub mod tasks;
pub mod transfers;
pub mod users;
pub mod verify_emails;
