//! Free-text heuristics, the last resort of the normalizer
//!
//! Everything here depends on the exact wording of upstream messages, so it
//! is kept apart from the structured code lookup and tested on its own.

use once_cell::sync::Lazy;
use regex::Regex;

pub const USER_CANCELLED: &str = "Transaction cancelled by user";
pub const INSUFFICIENT_FUNDS: &str = "Insufficient funds. Please check your balance and try again";
pub const NETWORK_ERROR: &str = "Network error. Please check your connection and try again";
pub const SERVER_UNAVAILABLE: &str = "Server is temporarily unavailable. Please try again later";
pub const TRANSACTION_EXPIRED: &str = "Transaction expired. Please try again";
pub const ACCOUNT_NOT_FOUND: &str = "Account not found. Please make sure your account is initialized";
pub const SIGNATURE_FAILED: &str = "Transaction signature verification failed. Please try again";
pub const PROGRAM_FAILED: &str = "Smart contract execution failed. Please try again";
pub const FALLBACK: &str = "An unexpected error occurred. Please try again";

/// Heuristic categories in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heuristic {
    UserRejection,
    InsufficientFunds,
    Network,
    ServerUnavailable,
    StaleBlockhash,
    MissingAccount,
    SignatureVerification,
    ProgramFailure,
}

impl Heuristic {
    pub const PRIORITY: [Heuristic; 8] = [
        Self::UserRejection,
        Self::InsufficientFunds,
        Self::Network,
        Self::ServerUnavailable,
        Self::StaleBlockhash,
        Self::MissingAccount,
        Self::SignatureVerification,
        Self::ProgramFailure,
    ];

    fn phrases(self) -> &'static [&'static str] {
        match self {
            Self::UserRejection => &[
                "user rejected",
                "user denied",
                "rejected the request",
                "request rejected",
                "transaction rejected",
                "user cancelled",
                "user canceled",
            ],
            Self::InsufficientFunds => &[
                "insufficient funds",
                "insufficient lamports",
                "insufficient balance",
                "insufficient sol",
            ],
            Self::Network => &[
                "failed to fetch",
                "network error",
                "networkerror",
                "network request failed",
                "error sending request",
                "connection refused",
                "connection reset",
                "dns error",
                "timed out",
            ],
            Self::ServerUnavailable => &["bad gateway", "service unavailable"],
            Self::StaleBlockhash => &[
                "blockhash not found",
                "block height exceeded",
                "blockhash expired",
                "transaction expired",
            ],
            Self::MissingAccount => &[
                "account not found",
                "accountnotfound",
                "could not find account",
                "account does not exist",
                "account not initialized",
            ],
            Self::SignatureVerification => &[
                "signature verification failed",
                "missing signature",
                "invalid signature",
            ],
            Self::ProgramFailure => &[
                "custom program error",
                "program failed to complete",
                "instruction error",
            ],
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::UserRejection => USER_CANCELLED,
            Self::InsufficientFunds => INSUFFICIENT_FUNDS,
            Self::Network => NETWORK_ERROR,
            Self::ServerUnavailable => SERVER_UNAVAILABLE,
            Self::StaleBlockhash => TRANSACTION_EXPIRED,
            Self::MissingAccount => ACCOUNT_NOT_FOUND,
            Self::SignatureVerification => SIGNATURE_FAILED,
            Self::ProgramFailure => PROGRAM_FAILED,
        }
    }

    /// Whether this heuristic fires for an already-lowercased message
    pub fn matches(self, lowered: &str) -> bool {
        match self {
            Self::ServerUnavailable => {
                HTTP_UNAVAILABLE.is_match(lowered)
                    || self.phrases().iter().any(|p| lowered.contains(p))
            }
            _ => self.phrases().iter().any(|p| lowered.contains(p)),
        }
    }
}

static HTTP_UNAVAILABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b50[23]\b").expect("valid regex"));

static EXTRACTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"Error Message: (.+)",
        r"(?i)failed to send transaction: (.+)",
        r"(?i)Transaction simulation failed: (.+)",
        r"Error: (.+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static STACK_FRAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*at\s+\S").expect("valid regex"));

/// First heuristic matching `message`, in priority order
pub fn match_heuristic(message: &str) -> Option<Heuristic> {
    let lowered = message.to_lowercase();
    Heuristic::PRIORITY
        .into_iter()
        .find(|h| h.matches(&lowered))
}

/// Whether `message` reads as a wallet rejection
pub fn is_user_rejection(message: &str) -> bool {
    Heuristic::UserRejection.matches(&message.to_lowercase())
}

/// First non-empty capture of the extraction patterns
pub fn extract_message(message: &str) -> Option<String> {
    EXTRACTION_PATTERNS.iter().find_map(|re| {
        re.captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// First non-empty line that is not a stack frame
pub fn first_meaningful_line(message: &str) -> Option<String> {
    message
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !STACK_FRAME.is_match(line))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        // Rejection beats everything else in the same message
        assert_eq!(
            match_heuristic("User rejected: insufficient funds, failed to fetch"),
            Some(Heuristic::UserRejection)
        );
        assert_eq!(
            match_heuristic("insufficient lamports; blockhash not found"),
            Some(Heuristic::InsufficientFunds)
        );
        assert_eq!(
            match_heuristic("Failed to fetch (503)"),
            Some(Heuristic::Network)
        );
    }

    #[test]
    fn test_http_unavailable_needs_word_boundary() {
        assert_eq!(match_heuristic("HTTP 502 Bad Gateway"), Some(Heuristic::ServerUnavailable));
        assert_eq!(match_heuristic("status 503"), Some(Heuristic::ServerUnavailable));
        assert_eq!(match_heuristic("slot 15020 reached"), None);
    }

    #[test]
    fn test_each_heuristic_fires() {
        let samples = [
            ("User denied transaction signature", Heuristic::UserRejection),
            ("Attempt to debit an account but found no record of a prior credit. insufficient funds", Heuristic::InsufficientFunds),
            ("NetworkError when attempting to fetch resource", Heuristic::Network),
            ("Service Unavailable", Heuristic::ServerUnavailable),
            ("Blockhash not found", Heuristic::StaleBlockhash),
            ("AccountNotFound: pubkey=abc", Heuristic::MissingAccount),
            ("Signature verification failed", Heuristic::SignatureVerification),
            ("Program failed to complete", Heuristic::ProgramFailure),
        ];
        for (message, expected) in samples {
            assert_eq!(match_heuristic(message), Some(expected), "{}", message);
        }
    }

    #[test]
    fn test_extraction_patterns() {
        assert_eq!(
            extract_message("AnchorError occurred. Error Code: TokensLocked. Error Number: 6003. Error Message: Tokens are still locked."),
            Some("Tokens are still locked.".to_string())
        );
        assert_eq!(
            extract_message("failed to send transaction: Transaction precompile verification failure"),
            Some("Transaction precompile verification failure".to_string())
        );
        assert_eq!(extract_message("Error: boom"), Some("boom".to_string()));
        assert_eq!(extract_message("Error:    "), None);
        assert_eq!(extract_message("nothing to see"), None);
    }

    #[test]
    fn test_first_meaningful_line_skips_stack() {
        let message = "\n   at Object.sign (wallet.js:10:5)\n\nSomething broke\n    at run (app.js:1:1)";
        assert_eq!(first_meaningful_line(message), Some("Something broke".to_string()));
        assert_eq!(first_meaningful_line("  \n\t"), None);
    }
}
