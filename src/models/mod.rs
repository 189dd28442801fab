// Row types, request payloads and the pure business rules that go with them

pub mod attendance;
pub mod class;
pub mod equipment;
pub mod feedback;
pub mod membership;
pub mod notification;
pub mod payment;
pub mod progress;
pub mod trainer;
pub mod training_session;
pub mod user;

pub use attendance::*;
pub use class::*;
pub use equipment::*;
pub use feedback::*;
pub use membership::*;
pub use notification::*;
pub use payment::*;
pub use progress::*;
pub use trainer::*;
pub use training_session::*;
pub use user::*;

use serde::{Deserialize, Serialize};

/// Standard success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data, message: None }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self { success: true, data, message: Some(message.into()) }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }
}

#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    /// Maximum number of items to return (default: 50, max: 100)
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0)
    pub offset: Option<i64>,
}

pub fn page_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 100)
}

pub fn page_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_is_clamped() {
        assert_eq!(page_limit(None), 50);
        assert_eq!(page_limit(Some(500)), 100);
        assert_eq!(page_limit(Some(0)), 1);
        assert_eq!(page_offset(Some(-3)), 0);
        assert_eq!(page_offset(Some(20)), 20);
    }
}
