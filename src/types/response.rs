//! Response envelope shared by every inbound operation
//!
//! The surrounding API wraps every result in `{statusCode, message, data, meta}`;
//! absent fields are omitted when serialized.

use serde::Serialize;

use super::error::LedgerError;
use super::page::Page;

/// Paging metadata attached to list responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub current_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub page_size: usize,
}

impl<T> From<&Page<T>> for PageMeta {
    fn from(page: &Page<T>) -> Self {
        PageMeta {
            current_page: page.page,
            total_items: page.total_items,
            total_pages: page.total_pages(),
            page_size: page.size,
        }
    }
}

/// Generic result envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response<T> {
    pub status_code: u16,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

impl<T> Response<T> {
    /// 200 response carrying a payload
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Response {
            status_code: 200,
            message: message.into(),
            data: Some(data),
            meta: None,
        }
    }

    /// 200 response without a payload
    pub fn ok_empty(message: impl Into<String>) -> Self {
        Response {
            status_code: 200,
            message: message.into(),
            data: None,
            meta: None,
        }
    }

    /// Attach paging metadata
    pub fn with_meta(mut self, meta: PageMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

impl<T> From<LedgerError> for Response<T> {
    fn from(error: LedgerError) -> Self {
        Response {
            status_code: error.status_code(),
            message: error.to_string(),
            data: None,
            meta: None,
        }
    }
}
