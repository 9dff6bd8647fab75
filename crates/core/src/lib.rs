//! Core domain logic for Corebank.
//!
//! This crate contains pure domain logic with ZERO web or database dependencies.
//! All domain rules, validation and calculations live here.
//!
//! # Modules
//!
//! - `auth` - Password hashing
//! - `currency` - Supported account currencies
//! - `user` - Input rules for user registration
//! - `transfer` - Transfer validation and deadlock-free balance update order
//! - `verification` - Single-use email verification codes
//! - `task` - Background task model: payloads, options, states and retry policy

pub mod auth;
pub mod currency;
pub mod task;
pub mod transfer;
pub mod user;
pub mod verification;
