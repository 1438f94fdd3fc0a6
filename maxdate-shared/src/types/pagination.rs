use serde::Deserialize;

use crate::errors::{AppError, AppResult, ErrorCode};

pub const MAX_PAGE_SIZE: u64 = 100;

/// `?page=&limit=` query parameters, 1-based.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit", alias = "per_page")]
    pub limit: u64,
}

fn default_page() -> u64 { 1 }
fn default_limit() -> u64 { 20 }

impl PaginationParams {
    pub fn new(page: u64, limit: u64) -> Self {
        Self { page, limit }
    }

    /// Rejects page 0 and page sizes outside `1..=MAX_PAGE_SIZE`.
    pub fn validate(&self) -> AppResult<()> {
        if self.page == 0 {
            return Err(AppError::new(ErrorCode::ValidationError, "page must be at least 1"));
        }
        if self.limit == 0 || self.limit > MAX_PAGE_SIZE {
            return Err(AppError::new(
                ErrorCode::ValidationError,
                format!("limit must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }
        Ok(())
    }

    pub fn offset(&self) -> u64 {
        (self.page.saturating_sub(1)).saturating_mul(self.limit)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}
