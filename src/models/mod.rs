pub mod account;
pub mod activity;
pub mod chat;
pub mod date_input;
pub mod feedback;
pub mod item;
pub mod rental;
pub mod report;
pub mod subscription;

use serde::{Deserialize, Serialize};

pub use account::*;
pub use activity::*;
pub use chat::*;
pub use feedback::*;
pub use item::*;
pub use rental::*;
pub use report::*;
pub use subscription::*;

/// Plain `{"message": ...}` response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Default page size for paged listings.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum allowed page size.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Query parameters for paged listings.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self { page, limit }
    }

    /// 1-based page number.
    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    pub fn meta(&self, total_count: i64) -> PageMeta {
        let limit = self.limit();
        PageMeta {
            total_pages: (total_count + limit - 1) / limit,
            current_page: self.page(),
            total_count,
        }
    }
}

/// Paging metadata flattened into paged responses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageMeta {
    pub total_pages: i64,
    pub current_page: i64,
    pub total_count: i64,
}
