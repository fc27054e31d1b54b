/// Server-level configuration for the operation routing framework.
///
/// Controls operation timeouts and concurrency limits.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Default timeout for operations in milliseconds.
    pub default_operation_timeout_ms: u64,
    /// Maximum number of concurrent operations before load shedding.
    pub max_concurrent_operations: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_operation_timeout_ms: 5_000,
            max_concurrent_operations: 1000,
        }
    }
}
