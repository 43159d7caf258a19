use serde::{Deserialize, Serialize};

/// Error object returned by the remote poll API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ErrorBody {
    /// `"{message}. {cause}"`, or just the message when there is no cause.
    pub fn describe(&self) -> String {
        match self.cause.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(cause) => format!("{}. {}", self.message, cause),
            None => self.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorBody;

    #[test]
    fn describe_joins_message_and_cause() {
        let body = ErrorBody {
            message: "Not found".into(),
            cause: Some("poll not found".into()),
        };
        assert_eq!(body.describe(), "Not found. poll not found");
    }

    #[test]
    fn describe_without_cause() {
        let body: ErrorBody = serde_json::from_str(r#"{"message":"Bad request"}"#).unwrap();
        assert_eq!(body.describe(), "Bad request");
    }
}
