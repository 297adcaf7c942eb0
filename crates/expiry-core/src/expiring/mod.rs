//! Expiring user actions: data model, deadline policy and the redb store.

pub mod action;
pub mod db;
pub mod policy;

pub use action::{ActionKind, ExpiringAction, ExpiringApiRequest, ExpiringPayload};
pub use db::ExpiringActionDb;
