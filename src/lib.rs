//! Lectern - library catalog service
//!
//! Users browse, search, list, and review catalog materials; privileged
//! principals manage content and permissions. The boolean query compiler
//! lives in [`query`], the authorization core in [`auth`].
//! All modules are exposed for testing purposes.

pub mod auth;
pub mod entities;
pub mod errors;
pub mod permissions;
pub mod query;
pub mod settings;
pub mod storage;
pub mod web;
