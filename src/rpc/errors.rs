use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_request::{RpcError as ClientRpcError, RpcResponseErrorData};
use solana_sdk::transaction::TransactionError;
use thiserror::Error;

/// Solana RPC error types, classified from `solana-client` errors
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// Transport-level errors (network, connection)
    #[error("Transport error: {message} (endpoint: {endpoint})")]
    Transport { endpoint: String, message: String },

    /// Timeout errors
    #[error("Timeout after {timeout_ms}ms (endpoint: {endpoint})")]
    Timeout { endpoint: String, timeout_ms: u64 },

    /// RPC response errors (from the RPC server)
    #[error("RPC response error: {message} (endpoint: {endpoint}, code: {code:?})")]
    RpcResponse {
        endpoint: String,
        message: String,
        code: Option<i64>,
    },

    /// Preflight simulation rejected the transaction
    #[error("Transaction simulation failed: {message}")]
    SimulationFailed {
        message: String,
        logs: Vec<String>,
        tx_error: Option<TransactionError>,
    },

    /// Transaction-level error reported without simulation details
    #[error("Transaction error: {0}")]
    Transaction(TransactionError),

    #[error("Blockhash not found (endpoint: {endpoint})")]
    BlockhashNotFound { endpoint: String },

    #[error("Transaction expired (endpoint: {endpoint})")]
    TransactionExpired { endpoint: String },

    #[error("Account not found: {account} (endpoint: {endpoint})")]
    AccountNotFound { account: String, endpoint: String },

    #[error("Insufficient funds (endpoint: {endpoint})")]
    InsufficientFunds { endpoint: String },

    #[error("Rate limit exceeded (endpoint: {endpoint})")]
    RateLimitExceeded { endpoint: String },

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RpcError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Transport { .. } => true,
            RpcError::Timeout { .. } => true,
            RpcError::RateLimitExceeded { .. } => true,
            RpcError::BlockhashNotFound { .. } => true,

            RpcError::SimulationFailed { .. } => false,
            RpcError::Transaction(_) => false,
            RpcError::TransactionExpired { .. } => false,
            RpcError::AccountNotFound { .. } => false,
            RpcError::InsufficientFunds { .. } => false,
            RpcError::Internal(_) => false,

            // Retry on server errors (5xx)
            RpcError::RpcResponse { code, .. } => matches!(code, Some(c) if (500..600).contains(c)),
        }
    }

    /// Get the endpoint associated with this error, if any
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            RpcError::Transport { endpoint, .. }
            | RpcError::Timeout { endpoint, .. }
            | RpcError::RpcResponse { endpoint, .. }
            | RpcError::BlockhashNotFound { endpoint }
            | RpcError::TransactionExpired { endpoint }
            | RpcError::AccountNotFound { endpoint, .. }
            | RpcError::InsufficientFunds { endpoint }
            | RpcError::RateLimitExceeded { endpoint } => Some(endpoint),
            _ => None,
        }
    }

    /// Program logs attached to the error (preflight failures only)
    pub fn logs(&self) -> &[String] {
        match self {
            RpcError::SimulationFailed { logs, .. } => logs,
            _ => &[],
        }
    }

    /// Transaction error attached to the error, if any
    pub fn transaction_error(&self) -> Option<&TransactionError> {
        match self {
            RpcError::SimulationFailed { tx_error, .. } => tx_error.as_ref(),
            RpcError::Transaction(err) => Some(err),
            _ => None,
        }
    }

    /// Create from ClientError with context
    pub fn from_client_error(err: ClientError, endpoint: &str) -> Self {
        match err.kind() {
            ClientErrorKind::RpcError(ClientRpcError::RpcResponseError {
                message,
                data: RpcResponseErrorData::SendTransactionPreflightFailure(sim),
                ..
            }) => {
                return RpcError::SimulationFailed {
                    message: message.clone(),
                    logs: sim.logs.clone().unwrap_or_default(),
                    tx_error: err.get_transaction_error(),
                };
            }
            ClientErrorKind::TransactionError(tx_err) => {
                return RpcError::Transaction(tx_err.clone());
            }
            ClientErrorKind::Reqwest(req_err) if req_err.is_timeout() => {
                return RpcError::Timeout {
                    endpoint: endpoint.to_string(),
                    timeout_ms: 0,
                };
            }
            ClientErrorKind::Reqwest(req_err) => {
                return RpcError::Transport {
                    endpoint: endpoint.to_string(),
                    message: req_err.to_string(),
                };
            }
            _ => {}
        }

        Self::from_message(&err.to_string(), endpoint)
    }

    /// Classify a free-text RPC failure
    pub fn from_message(message: &str, endpoint: &str) -> Self {
        let err_str = message.to_lowercase();

        if err_str.contains("blockhash not found") {
            RpcError::BlockhashNotFound {
                endpoint: endpoint.to_string(),
            }
        } else if err_str.contains("transaction expired") || err_str.contains("block height exceeded")
        {
            RpcError::TransactionExpired {
                endpoint: endpoint.to_string(),
            }
        } else if err_str.contains("account not found") || err_str.contains("could not find account")
        {
            RpcError::AccountNotFound {
                account: "unknown".to_string(),
                endpoint: endpoint.to_string(),
            }
        } else if err_str.contains("insufficient funds") || err_str.contains("insufficient lamports")
        {
            RpcError::InsufficientFunds {
                endpoint: endpoint.to_string(),
            }
        } else if err_str.contains("rate limit")
            || err_str.contains("too many requests")
            || err_str.contains("429")
        {
            RpcError::RateLimitExceeded {
                endpoint: endpoint.to_string(),
            }
        } else if err_str.contains("timeout") || err_str.contains("timed out") {
            RpcError::Timeout {
                endpoint: endpoint.to_string(),
                timeout_ms: 0,
            }
        } else if err_str.contains("error sending request")
            || err_str.contains("connection refused")
            || err_str.contains("dns error")
        {
            RpcError::Transport {
                endpoint: endpoint.to_string(),
                message: message.to_string(),
            }
        } else {
            // Extract error code if available
            let code = err_str
                .split("code:")
                .nth(1)
                .and_then(|s| s.split_whitespace().next())
                .and_then(|s| s.trim_matches(|c: char| !c.is_ascii_digit() && c != '-').parse::<i64>().ok());

            RpcError::RpcResponse {
                endpoint: endpoint.to_string(),
                message: message.to_string(),
                code,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::instruction::InstructionError;

    #[test]
    fn test_error_is_retryable() {
        assert!(RpcError::Transport {
            endpoint: "test".to_string(),
            message: "connection failed".to_string(),
        }
        .is_retryable());

        assert!(RpcError::BlockhashNotFound {
            endpoint: "test".to_string(),
        }
        .is_retryable());

        assert!(!RpcError::Internal("test".to_string()).is_retryable());
        assert!(!RpcError::TransactionExpired {
            endpoint: "test".to_string(),
        }
        .is_retryable());

        assert!(RpcError::RpcResponse {
            endpoint: "test".to_string(),
            message: "bad gateway".to_string(),
            code: Some(502),
        }
        .is_retryable());
        assert!(!RpcError::RpcResponse {
            endpoint: "test".to_string(),
            message: "invalid params".to_string(),
            code: Some(-32602),
        }
        .is_retryable());
    }

    #[test]
    fn test_from_message_classification() {
        assert!(matches!(
            RpcError::from_message("Blockhash not found", "e"),
            RpcError::BlockhashNotFound { .. }
        ));
        assert!(matches!(
            RpcError::from_message("Invalid param: could not find account", "e"),
            RpcError::AccountNotFound { .. }
        ));
        assert!(matches!(
            RpcError::from_message("HTTP status client error (429 Too Many Requests)", "e"),
            RpcError::RateLimitExceeded { .. }
        ));
        assert!(matches!(
            RpcError::from_message("operation timed out", "e"),
            RpcError::Timeout { .. }
        ));
    }

    #[test]
    fn test_simulation_failure_exposes_logs() {
        let err = RpcError::SimulationFailed {
            message: "Transaction simulation failed: Error processing Instruction 0".to_string(),
            logs: vec![
                "Program log: Instruction: LockTokens".to_string(),
                "Program log: Error: Tokens are still locked".to_string(),
            ],
            tx_error: None,
        };
        assert_eq!(err.logs().len(), 2);
        assert!(err.endpoint().is_none());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_transaction_error_kind() {
        let tx_err = TransactionError::InstructionError(0, InstructionError::Custom(6000));
        let client_err = ClientError::from(ClientErrorKind::TransactionError(tx_err.clone()));

        let err = RpcError::from_client_error(client_err, "https://rpc.test");
        assert_eq!(err.transaction_error(), Some(&tx_err));
    }
}
