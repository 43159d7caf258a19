use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Bounds applied to poll content and identifiers. Shared by the BFF request
/// validation and the client's local checks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub nano_id_alphabet: String,
    pub nano_id_length: usize,
    pub prompt_min_length: usize,
    pub prompt_max_length: usize,
    pub option_min_length: usize,
    pub option_max_length: usize,
    pub min_options: usize,
    pub max_options: usize,
    /// Seconds.
    pub min_duration: u64,
    /// Seconds.
    pub max_duration: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            nano_id_alphabet: "0123456789abcdefghijklmnopqrstuvwxyz".to_string(),
            nano_id_length: 12,
            prompt_min_length: 1,
            prompt_max_length: 280,
            option_min_length: 1,
            option_max_length: 100,
            min_options: 2,
            max_options: 10,
            min_duration: 60,
            max_duration: 604_800,
        }
    }
}

impl Limits {
    /// Check internal consistency. Every problem is reported, not just the
    /// first one.
    pub fn validate(&self) -> Result<(), CoreError> {
        let issues = self.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Config(issues))
        }
    }

    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.nano_id_alphabet.is_empty() {
            issues.push("nano_id_alphabet must not be empty".to_string());
        }
        if self.nano_id_length < 1 {
            issues.push("nano_id_length must be at least 1".to_string());
        }
        for (name, value) in [
            ("prompt_min_length", self.prompt_min_length),
            ("prompt_max_length", self.prompt_max_length),
            ("option_min_length", self.option_min_length),
            ("option_max_length", self.option_max_length),
        ] {
            if value < 1 {
                issues.push(format!("{name} must be at least 1"));
            }
        }
        for (name, value) in [("min_options", self.min_options), ("max_options", self.max_options)] {
            if value < 2 {
                issues.push(format!("{name} must be at least 2"));
            }
        }
        for (name, value) in [("min_duration", self.min_duration), ("max_duration", self.max_duration)] {
            if value < 1 {
                issues.push(format!("{name} must be at least 1"));
            }
        }

        if self.prompt_max_length < self.prompt_min_length {
            issues.push(
                "Max prompt length must be greater than or equal to min prompt length".to_string(),
            );
        }
        if self.option_max_length < self.option_min_length {
            issues.push(
                "Max option length must be greater than or equal to min option length".to_string(),
            );
        }
        if self.max_options < self.min_options {
            issues.push("Max options must be greater than or equal to min options".to_string());
        }
        if self.max_duration < self.min_duration {
            issues.push("Max duration must be greater than or equal to min duration".to_string());
        }

        issues
    }
}
