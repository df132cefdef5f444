//! Clinic Inventory API Library
//!
//! Inventory ledger for a clinic administration backend: item catalog,
//! inbound/outbound movement ledger, stock-take reconciliation and stock
//! statistics. The HTTP transport, authentication and request validation
//! live in a separate layer that calls into [`services`].
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod migrator;
pub mod services;

use serde::{Deserialize, Serialize};

/// Common pagination parameters for list operations.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_page() -> u64 {
    1
}
fn default_page_size() -> u64 {
    20
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PageParams {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self { page, page_size }
    }

    /// Both fields are contractually >= 1; out-of-range input is lifted
    /// rather than rejected.
    pub fn normalize(self) -> Self {
        Self {
            page: self.page.max(1),
            page_size: self.page_size.max(1),
        }
    }
}

/// Common paginated response envelope: `total` is the full matching count,
/// not the size of the returned page.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, params: PageParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            page_size: params.page_size,
        }
    }
}

pub mod prelude {
    pub use crate::db::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::services::*;
    pub use crate::{PageParams, PaginatedResponse};
}
