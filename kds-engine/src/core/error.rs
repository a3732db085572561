//! 统一错误处理
//!
//! # 错误分类
//!
//! | 分类 | 处理策略 |
//! |------|----------|
//! | 验证错误 | 触发任何 I/O 之前拒绝，永不重试 |
//! | 资源不存在 | 直接返回给调用方 |
//! | 存储瞬时错误 | 读路径降级为直接查询；写路径在缓存失效后上抛 |
//! | 熔断器打开 | 不发起网络请求，立即失败 |
//! | 路由失败 | 仅记录日志，绝不阻塞订单创建 |

use thiserror::Error;

use crate::store::StoreError;

/// Engine error taxonomy
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed identifier or out-of-range field — rejected before any I/O
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Referenced entry/order/station absent
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The station registry returned no active stations
    #[error("No active stations available")]
    NoActiveStations,

    /// Order could not be routed; logged, never blocks order creation
    #[error("Routing failed: {0}")]
    Routing(String),

    /// Transient network/timeout failure from the persistent store
    #[error("Store error: {0}")]
    Store(String),

    /// Circuit breaker open — failed fast without attempting I/O
    #[error("Circuit breaker open until {open_until} (unix millis)")]
    CircuitOpen {
        /// Unix millis after which attempts proceed again
        open_until: i64,
    },
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn routing(msg: impl Into<String>) -> Self {
        Self::Routing(msg.into())
    }

    /// Whether a retry at the connection-manager layer can help
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(msg) => Self::NotFound(msg),
            StoreError::Transient(msg) => Self::Store(msg),
        }
    }
}

/// Engine-level Result type
pub type EngineResult<T> = Result<T, EngineError>;
