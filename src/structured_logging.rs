//! Structured logging and submission context

use uuid::Uuid;

/// Structured logger for submission lifecycle events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    context_id: String,
}

impl StructuredLogger {
    pub fn new(context_id: String) -> Self {
        Self { context_id }
    }

    pub fn log_decoded(&self, action: &str, format: &str, bytes: usize) {
        tracing::debug!(
            context_id = %self.context_id,
            action = %action,
            format = %format,
            bytes = %bytes,
            "Transaction decoded"
        );
    }

    pub fn log_downgraded(&self, action: &str) {
        tracing::info!(
            context_id = %self.context_id,
            action = %action,
            "Versioned transaction downgraded to legacy for wallet"
        );
    }

    pub fn log_signed(&self, action: &str, signer: &str, latency_ms: u64) {
        tracing::debug!(
            context_id = %self.context_id,
            action = %action,
            signer = %signer,
            latency_ms = %latency_ms,
            "Transaction signed"
        );
    }

    pub fn log_submitted(&self, action: &str, signature: &str) {
        tracing::info!(
            context_id = %self.context_id,
            action = %action,
            signature = %signature,
            "Transaction submitted"
        );
    }

    pub fn log_confirmed(&self, action: &str, signature: &str, latency_ms: u64) {
        tracing::info!(
            context_id = %self.context_id,
            action = %action,
            signature = %signature,
            latency_ms = %latency_ms,
            "Transaction confirmed"
        );
    }

    pub fn log_already_processed(&self, action: &str, tier: &str, reference: &str) {
        tracing::info!(
            context_id = %self.context_id,
            action = %action,
            recovery_tier = %tier,
            reference = %reference,
            "Duplicate submission raced an earlier success; reference recovered"
        );
    }

    pub fn log_failure(&self, action: &str, category: &str, error: &str, latency_ms: u64) {
        tracing::warn!(
            context_id = %self.context_id,
            action = %action,
            category = %category,
            error = %error,
            latency_ms = %latency_ms,
            "Submission failed"
        );
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(
            context_id = %self.context_id,
            message = %message,
            "Warning"
        );
    }
}

/// Submission execution context for correlating log lines
#[derive(Debug, Clone)]
pub struct SubmissionContext {
    /// Unique request ID
    pub request_id: String,

    /// Operation name
    pub operation: String,

    /// Timestamp
    pub timestamp: u64,

    /// Structured logger instance
    pub logger: StructuredLogger,
}

impl SubmissionContext {
    /// Create a new submission context
    pub fn new(operation: &str) -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let request_id = Uuid::new_v4().to_string();

        Self {
            request_id: request_id.clone(),
            operation: operation.to_string(),
            timestamp: now,
            logger: StructuredLogger::new(request_id),
        }
    }
}

impl Default for SubmissionContext {
    fn default() -> Self {
        Self::new("default")
    }
}
