use super::ApiError;
use serde::{Deserialize, Deserializer, Serialize};

/// Uniform backend response: `{success, data?, error?}`.
///
/// `data` is present exactly when `success` is true and `error` exactly when
/// it is false. The fields are private so only [`ApiResponse::ok`] and
/// [`ApiResponse::err`] can build one.
///
/// For a non-2xx response `error` is the response text, except when the body
/// is a JSON object with a non-empty `error`, `message` or `detail` string;
/// that string is used instead. An empty body becomes `HTTP <status>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ApiResponse<U> {
        ApiResponse {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
        }
    }

    pub fn into_result(self) -> Result<T, ApiError> {
        match (self.data, self.error) {
            (Some(data), _) if self.success => Ok(data),
            (_, Some(error)) => Err(ApiError::Backend(error)),
            _ => Err(ApiError::Backend("empty response".into())),
        }
    }
}

impl<T> From<Result<T, ApiError>> for ApiResponse<T> {
    fn from(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::err(err.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct RawEnvelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

// Wire envelopes that break the success/data/error pairing are rejected
impl<'de, T: Deserialize<'de>> Deserialize<'de> for ApiResponse<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawEnvelope::<T>::deserialize(deserializer)?;
        match (raw.success, raw.data, raw.error) {
            (true, Some(data), None) => Ok(Self::ok(data)),
            (false, None, Some(error)) => Ok(Self::err(error)),
            (true, _, _) => Err(serde::de::Error::custom(
                "successful response must carry data and no error",
            )),
            (false, _, _) => Err(serde::de::Error::custom(
                "failed response must carry an error and no data",
            )),
        }
    }
}
