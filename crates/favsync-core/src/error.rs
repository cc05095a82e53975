//! Error classification for favorite mutations.
//!
//! Every failure coming back from the data-fetching layer is classified
//! into a fixed taxonomy. Classification precedence (first match wins):
//! transport-level code, then HTTP status, then a server-supplied
//! message, then the unknown fallback.

use thiserror::Error;

/// Raw failure shape handed over by the data-fetching layer.
///
/// This is the only thing classification consumes; the surrounding HTTP
/// client is out of scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiFailure {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ApiFailure {
    pub fn network() -> Self {
        Self {
            code: Some("ERR_NETWORK".into()),
            ..Self::default()
        }
    }

    pub fn timeout() -> Self {
        Self {
            code: Some("ERR_TIMEOUT".into()),
            ..Self::default()
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Classified favorite-mutation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FavoriteError {
    /// Transport never reached the server.
    #[error("network error")]
    Network,

    /// Request exceeded its deadline.
    #[error("request timed out")]
    Timeout,

    #[error("not authenticated (401)")]
    Unauthorized,

    #[error("not allowed (403)")]
    Forbidden,

    #[error("product not found (404)")]
    NotFound,

    /// Product is already in the favorite list.
    #[error("favorite already exists (409)")]
    Conflict,

    #[error("server error ({status})")]
    Server { status: u16 },

    /// Nothing structured matched but the server sent its own message.
    #[error("{message}")]
    Rejected { message: String },

    #[error("unknown failure")]
    Unknown,
}

impl FavoriteError {
    /// Classify a raw failure. Precedence: transport code, HTTP status
    /// (401, 403, 404, 409, then 5xx), server message, unknown.
    pub fn classify(failure: &ApiFailure) -> Self {
        if let Some(code) = failure.code.as_deref() {
            match code {
                "NETWORK_ERROR" | "ERR_NETWORK" => return Self::Network,
                "TIMEOUT" | "ERR_TIMEOUT" => return Self::Timeout,
                _ => {}
            }
        }

        if let Some(status) = failure.status {
            match status {
                401 => return Self::Unauthorized,
                403 => return Self::Forbidden,
                404 => return Self::NotFound,
                409 => return Self::Conflict,
                500..=599 => return Self::Server { status },
                _ => {}
            }
        }

        match failure.message.as_deref() {
            Some(message) if !message.is_empty() => Self::Rejected {
                message: message.to_string(),
            },
            _ => Self::Unknown,
        }
    }

    /// HTTP status this classification corresponds to, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Forbidden => Some(403),
            Self::NotFound => Some(404),
            Self::Conflict => Some(409),
            Self::Server { status } => Some(*status),
            _ => None,
        }
    }

    /// Stable code string for structured logging and error tracking.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Server { .. } => "SERVER_ERROR",
            Self::Rejected { .. } => "REJECTED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Localized message shown to the end user, exactly once per
    /// terminal failure.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Network => "Lỗi kết nối mạng. Vui lòng kiểm tra đường truyền và thử lại.",
            Self::Timeout => "Yêu cầu quá thời gian chờ. Vui lòng thử lại.",
            Self::Unauthorized => "Vui lòng đăng nhập để sử dụng tính năng này.",
            Self::Forbidden => "Bạn không có quyền thực hiện thao tác này.",
            Self::NotFound => "Không tìm thấy sản phẩm.",
            Self::Conflict => "Sản phẩm đã có trong danh sách yêu thích.",
            Self::Server { .. } => "Hệ thống đang gặp sự cố. Vui lòng thử lại sau.",
            Self::Rejected { message } => message,
            Self::Unknown => "Đã xảy ra lỗi. Vui lòng thử lại.",
        }
    }

    /// Transient failures worth retrying: transport problems and 5xx.
    /// Client errors (4xx) are permanent from the retry policy's view.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::Server { .. })
    }
}
