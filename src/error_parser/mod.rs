//! User-facing error messages
//!
//! [`normalize`] turns any failure from the transaction flow, the RPC node,
//! the backend or the wallet into one short sentence. Failures are first
//! captured as an [`ErrorReport`] (message, program logs, custom code) so
//! the same rules apply whatever produced them.
//!
//! Resolution order, first hit wins:
//!
//! 0. wallet rejection phrases
//! 1. custom program code carried by the error
//! 2. code found in the logs
//! 3. `Program log: Error: ...` line (beats any code)
//! 4. code table lookup
//! 5. phrase heuristics
//! 6. extraction patterns
//! 7. first non stack-trace line
//! 8. fixed fallback

pub mod codes;
pub mod heuristics;

use crate::api::ApiError;
use crate::dashboard::DashboardError;
use crate::rpc::RpcError;
use crate::tx_flow::FlowError;
use crate::wallet::WalletError;
use heuristics::Heuristic;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use solana_sdk::{instruction::InstructionError, transaction::TransactionError};

pub use codes::{AnchorFrameworkError, PatronProgramError};

static LOG_ERROR_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Error Code: (\d+)").expect("valid regex"));
static LOG_ERROR_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Error Number: (\d+)").expect("valid regex"));
static LOG_CUSTOM_HEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"custom program error: 0x([0-9a-fA-F]+)").expect("valid regex"));
static LOG_PROGRAM_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Program log: Error: (.+)").expect("valid regex"));

/// Maximum nesting searched for a custom code in JSON error values
const MAX_JSON_DEPTH: usize = 8;

/// Everything the normalizer looks at
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorReport {
    pub message: String,
    pub logs: Vec<String>,
    pub custom_code: Option<u32>,
    /// Structured transaction error, used by [`classify`]
    pub transaction_error: Option<TransactionError>,
}

impl ErrorReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_logs(mut self, logs: Vec<String>) -> Self {
        self.logs = logs;
        self
    }

    pub fn with_custom_code(mut self, code: u32) -> Self {
        self.custom_code = Some(code);
        self
    }

    pub fn with_transaction_error(mut self, error: TransactionError) -> Self {
        if self.custom_code.is_none() {
            self.custom_code = custom_code_of(&error);
        }
        self.transaction_error = Some(error);
        self
    }
}

/// Custom program code of an `InstructionError(_, Custom(n))`
pub fn custom_code_of(error: &TransactionError) -> Option<u32> {
    match error {
        TransactionError::InstructionError(_, InstructionError::Custom(code)) => Some(*code),
        _ => None,
    }
}

impl From<&str> for ErrorReport {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ErrorReport {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&RpcError> for ErrorReport {
    fn from(err: &RpcError) -> Self {
        let report = Self::new(err.to_string()).with_logs(err.logs().to_vec());
        match err.transaction_error() {
            Some(tx_err) => report.with_transaction_error(tx_err.clone()),
            None => report,
        }
    }
}

impl From<&FlowError> for ErrorReport {
    fn from(err: &FlowError) -> Self {
        let report = Self::new(err.to_string()).with_logs(err.logs().to_vec());
        match err.transaction_error() {
            Some(tx_err) => report.with_transaction_error(tx_err.clone()),
            None => report,
        }
    }
}

impl From<&WalletError> for ErrorReport {
    fn from(err: &WalletError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<&ApiError> for ErrorReport {
    fn from(err: &ApiError) -> Self {
        Self::new(err.to_string())
    }
}

/// Reads the JS error shape: `message`, nested `error`, `logs` and
/// `err.InstructionError[1].Custom` at any depth.
impl From<&Value> for ErrorReport {
    fn from(value: &Value) -> Self {
        let message = match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Object(_) => json_message(value).unwrap_or_default(),
            other => other.to_string(),
        };
        Self {
            message,
            logs: json_logs(value),
            custom_code: json_custom_code(value, 0),
            transaction_error: None,
        }
    }
}

impl From<Value> for ErrorReport {
    fn from(value: Value) -> Self {
        Self::from(&value)
    }
}

impl From<&anyhow::Error> for ErrorReport {
    fn from(err: &anyhow::Error) -> Self {
        if let Some(dashboard) = err.downcast_ref::<DashboardError>() {
            return dashboard.into();
        }
        if let Some(flow) = err.downcast_ref::<FlowError>() {
            return flow.into();
        }
        if let Some(rpc) = err.downcast_ref::<RpcError>() {
            return rpc.into();
        }
        if let Some(api) = err.downcast_ref::<ApiError>() {
            return api.into();
        }
        Self::new(format!("{:#}", err))
    }
}

fn json_message(value: &Value) -> Option<String> {
    let obj = value.as_object()?;
    for key in ["message", "error", "msg"] {
        match obj.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
            Some(nested @ Value::Object(_)) => {
                if let Some(inner) = json_message(nested) {
                    return Some(inner);
                }
            }
            _ => {}
        }
    }
    None
}

fn json_logs(value: &Value) -> Vec<String> {
    let direct = value
        .get("logs")
        .and_then(Value::as_array)
        .map(|logs| logs.iter().filter_map(Value::as_str).map(str::to_string).collect::<Vec<_>>());
    if let Some(logs) = direct.filter(|l| !l.is_empty()) {
        return logs;
    }
    ["error", "data"]
        .iter()
        .filter_map(|key| value.get(key))
        .map(json_logs)
        .find(|logs| !logs.is_empty())
        .unwrap_or_default()
}

fn json_custom_code(value: &Value, depth: usize) -> Option<u32> {
    if depth > MAX_JSON_DEPTH {
        return None;
    }
    match value {
        Value::Object(obj) => {
            if let Some(code) = obj
                .get("InstructionError")
                .and_then(|ie| ie.get(1))
                .and_then(|detail| detail.get("Custom"))
                .and_then(Value::as_u64)
                .and_then(|c| u32::try_from(c).ok())
            {
                return Some(code);
            }
            obj.values().find_map(|v| json_custom_code(v, depth + 1))
        }
        Value::Array(items) => items.iter().find_map(|v| json_custom_code(v, depth + 1)),
        _ => None,
    }
}

/// First error code in `logs`, scanned in the order given
pub fn code_from_logs(logs: &[String]) -> Option<u32> {
    logs.iter().find_map(|line| {
        LOG_ERROR_CODE
            .captures(line)
            .or_else(|| LOG_ERROR_NUMBER.captures(line))
            .and_then(|caps| caps[1].parse::<u32>().ok())
            .or_else(|| {
                LOG_CUSTOM_HEX
                    .captures(line)
                    .and_then(|caps| u32::from_str_radix(&caps[1], 16).ok())
            })
    })
}

/// Message of the first `Program log: Error: ...` line
pub fn program_log_error(logs: &[String]) -> Option<String> {
    logs.iter().find_map(|line| {
        LOG_PROGRAM_ERROR
            .captures(line)
            .map(|caps| caps[1].trim().to_string())
            .filter(|msg| !msg.is_empty())
    })
}

/// One non-empty user-facing sentence for `report`
pub fn normalize(report: &ErrorReport) -> String {
    if heuristics::is_user_rejection(&report.message) {
        return heuristics::USER_CANCELLED.to_string();
    }

    let code = report.custom_code.or_else(|| code_from_logs(&report.logs));

    if let Some(message) = program_log_error(&report.logs) {
        return message;
    }
    if let Some(message) = code.and_then(codes::lookup) {
        return message.to_string();
    }
    if let Some(heuristic) = heuristics::match_heuristic(&report.message) {
        return heuristic.message().to_string();
    }
    heuristics::extract_message(&report.message)
        .or_else(|| heuristics::first_meaningful_line(&report.message))
        .unwrap_or_else(|| heuristics::FALLBACK.to_string())
}

/// Normalize anything that converts into a report
pub fn normalize_error<'a, E>(err: &'a E) -> String
where
    ErrorReport: From<&'a E>,
{
    normalize(&ErrorReport::from(err))
}

/// Normalize a JS-style JSON error value
pub fn normalize_json(value: &Value) -> String {
    normalize(&ErrorReport::from(value))
}

/// Broad failure class, used to pick toast severity and remediation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    UserRejection,
    Network,
    StaleBlockhash,
    OnChain,
    AccountNotFound,
    InsufficientFunds,
    Unknown,
}

pub fn classify(report: &ErrorReport) -> ErrorClass {
    if heuristics::is_user_rejection(&report.message) {
        return ErrorClass::UserRejection;
    }

    if let Some(tx_err) = &report.transaction_error {
        match tx_err {
            TransactionError::AccountNotFound | TransactionError::ProgramAccountNotFound => {
                return ErrorClass::AccountNotFound
            }
            TransactionError::InsufficientFundsForFee
            | TransactionError::InsufficientFundsForRent { .. } => {
                return ErrorClass::InsufficientFunds
            }
            TransactionError::BlockhashNotFound => return ErrorClass::StaleBlockhash,
            _ => {}
        }
    }

    if let Some(code) = report.custom_code.or_else(|| code_from_logs(&report.logs)) {
        return match (PatronProgramError::from_code(code), AnchorFrameworkError::from_code(code)) {
            (Some(PatronProgramError::InsufficientFunds), _) => ErrorClass::InsufficientFunds,
            (_, Some(AnchorFrameworkError::AccountNotInitialized)) => ErrorClass::AccountNotFound,
            _ => ErrorClass::OnChain,
        };
    }

    match heuristics::match_heuristic(&report.message) {
        Some(Heuristic::UserRejection) => ErrorClass::UserRejection,
        Some(Heuristic::InsufficientFunds) => ErrorClass::InsufficientFunds,
        Some(Heuristic::Network) | Some(Heuristic::ServerUnavailable) => ErrorClass::Network,
        Some(Heuristic::StaleBlockhash) => ErrorClass::StaleBlockhash,
        Some(Heuristic::MissingAccount) => ErrorClass::AccountNotFound,
        Some(Heuristic::SignatureVerification) | Some(Heuristic::ProgramFailure) => {
            ErrorClass::OnChain
        }
        None if program_log_error(&report.logs).is_some() => ErrorClass::OnChain,
        None => ErrorClass::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use solana_sdk::signature::Signature;

    #[test]
    fn test_custom_code_from_json() {
        let value = json!({"err": {"InstructionError": [0, {"Custom": 6005}]}});
        assert_eq!(normalize_json(&value), "Insufficient funds");

        let nested = json!({"error": {"data": {"err": {"InstructionError": [2, {"Custom": 6000}]}}}});
        assert_eq!(ErrorReport::from(&nested).custom_code, Some(6000));
        assert_eq!(normalize_json(&nested), "Swap is not active");
    }

    #[test]
    fn test_program_log_beats_code() {
        let report = ErrorReport::new("Transaction simulation failed")
            .with_custom_code(6000)
            .with_logs(vec![
                "Program log: Instruction: AcceptSwap".into(),
                "Program log: Error:   Swap already taken  ".into(),
            ]);
        assert_eq!(normalize(&report), "Swap already taken");
    }

    #[test]
    fn test_log_code_formats() {
        let anchor = vec![
            "Program log: AnchorError occurred. Error Code: TokensLocked. Error Number: 6003. Error Message: Tokens are still locked.".to_string(),
        ];
        assert_eq!(code_from_logs(&anchor), Some(6003));

        let rpc = vec!["Program X failed: custom program error: 0x1771".to_string()];
        assert_eq!(code_from_logs(&rpc), Some(6001));

        let plain = vec!["noise".to_string(), "Error Code: 6004".to_string()];
        assert_eq!(code_from_logs(&plain), Some(6004));
        assert_eq!(normalize(&ErrorReport::new("x").with_logs(plain)), "Swap has expired");
    }

    #[test]
    fn test_user_rejection_short_circuits() {
        let report = ErrorReport::new("User rejected the request.")
            .with_custom_code(6005)
            .with_logs(vec!["Program log: Error: boom".into()]);
        assert_eq!(normalize(&report), "Transaction cancelled by user");
        assert_eq!(classify(&report), ErrorClass::UserRejection);
    }

    #[test]
    fn test_unknown_code_falls_through() {
        let report = ErrorReport::new("failed to send transaction: custom program error: 0x1")
            .with_custom_code(1);
        assert_eq!(normalize(&report), heuristics::PROGRAM_FAILED);
        assert_eq!(classify(&report), ErrorClass::OnChain);
    }

    #[test]
    fn test_empty_inputs_use_fallback() {
        assert_eq!(normalize(&ErrorReport::default()), heuristics::FALLBACK);
        assert_eq!(normalize_json(&Value::Null), heuristics::FALLBACK);
        assert_eq!(normalize_json(&json!({})), heuristics::FALLBACK);
        assert_eq!(normalize_json(&json!(42)), "42");
    }

    #[test]
    fn test_flow_error_report() {
        let err = FlowError::OnChain {
            signature: Signature::default(),
            error: TransactionError::InstructionError(1, InstructionError::Custom(6007)),
        };
        let report = ErrorReport::from(&err);
        assert_eq!(report.custom_code, Some(6007));
        assert_eq!(normalize(&report), "Rewards have already been claimed");
        assert_eq!(classify(&report), ErrorClass::OnChain);
    }

    #[test]
    fn test_classify_account_not_found() {
        let err = FlowError::Submission(RpcError::SimulationFailed {
            message: "Attempt to debit an account but found no record of a prior credit.".into(),
            logs: vec![],
            tx_error: Some(TransactionError::AccountNotFound),
        });
        assert_eq!(classify(&ErrorReport::from(&err)), ErrorClass::AccountNotFound);

        let by_code = ErrorReport::new("x").with_custom_code(3012);
        assert_eq!(classify(&by_code), ErrorClass::AccountNotFound);

        let by_text = ErrorReport::new("AccountNotFound: user claim");
        assert_eq!(classify(&by_text), ErrorClass::AccountNotFound);
    }

    #[test]
    fn test_classify_network_and_stale() {
        assert_eq!(classify(&"Failed to fetch".into()), ErrorClass::Network);
        assert_eq!(classify(&"HTTP 503".into()), ErrorClass::Network);
        assert_eq!(classify(&"Blockhash not found".into()), ErrorClass::StaleBlockhash);
        assert_eq!(classify(&"something odd".into()), ErrorClass::Unknown);
    }

    #[test]
    fn test_anyhow_downcast() {
        let err = anyhow::Error::new(FlowError::UserRejection("declined".into()));
        assert_eq!(normalize(&ErrorReport::from(&err)), "Transaction cancelled by user");

        let err = anyhow::anyhow!("Error: disk full").context("saving");
        assert_eq!(normalize(&ErrorReport::from(&err)), "disk full");
    }
}
