//! Request validation for poll identifiers and bodies.
//!
//! Each validator collects every issue it finds; callers surface them joined
//! with ". ".

use pollcast_models::{CreatePoll, DurationUpdate};

use crate::error::CoreError;
use crate::limits::Limits;

fn pluralize(n: u64, singular: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {singular}s")
    }
}

fn finish(issues: Vec<String>) -> Result<(), CoreError> {
    if issues.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Validation(issues))
    }
}

fn id_issues(limits: &Limits, value: &str, issues: &mut Vec<String>) {
    let length = limits.nano_id_length as u64;
    if value.chars().count() != limits.nano_id_length {
        issues.push(format!("ID should be {} long", pluralize(length, "character")));
    }
    if value.is_empty() || !value.chars().all(|ch| limits.nano_id_alphabet.contains(ch)) {
        issues.push(format!(
            "ID should only contain characters from the alphabet: {}",
            limits.nano_id_alphabet
        ));
    }
}

fn duration_issues(limits: &Limits, duration: u64, issues: &mut Vec<String>) {
    if duration < limits.min_duration {
        issues.push(format!(
            "Poll duration should be at least {}",
            pluralize(limits.min_duration, "second")
        ));
    }
    if duration > limits.max_duration {
        issues.push(format!(
            "Poll duration should be at most {}",
            pluralize(limits.max_duration, "second")
        ));
    }
}

pub fn validate_poll_id(limits: &Limits, poll_id: &str) -> Result<(), CoreError> {
    let mut issues = Vec::new();
    id_issues(limits, poll_id, &mut issues);
    finish(issues)
}

pub fn validate_vote_params(limits: &Limits, poll_id: &str, option_id: &str) -> Result<(), CoreError> {
    let mut issues = Vec::new();
    id_issues(limits, poll_id, &mut issues);
    id_issues(limits, option_id, &mut issues);
    finish(issues)
}

pub fn validate_create_poll(limits: &Limits, body: &CreatePoll) -> Result<(), CoreError> {
    let mut issues = Vec::new();

    let prompt_len = body.prompt.chars().count();
    if prompt_len < limits.prompt_min_length {
        issues.push(format!(
            "Prompt should be at least {}",
            pluralize(limits.prompt_min_length as u64, "character")
        ));
    }
    if prompt_len > limits.prompt_max_length {
        issues.push(format!(
            "Prompt should be at most {}",
            pluralize(limits.prompt_max_length as u64, "character")
        ));
    }

    for option in &body.options {
        let len = option.chars().count();
        if len < limits.option_min_length {
            issues.push(format!(
                "Option should be at least {}",
                pluralize(limits.option_min_length as u64, "character")
            ));
        }
        if len > limits.option_max_length {
            issues.push(format!(
                "Option should be at most {}",
                pluralize(limits.option_max_length as u64, "character")
            ));
        }
    }

    if body.options.len() < limits.min_options {
        issues.push(format!(
            "Poll should have at least {}",
            pluralize(limits.min_options as u64, "option")
        ));
    }
    if body.options.len() > limits.max_options {
        issues.push(format!(
            "Poll should have at most {}",
            pluralize(limits.max_options as u64, "option")
        ));
    }

    duration_issues(limits, body.duration, &mut issues);
    finish(issues)
}

/// `CloseNow` is always acceptable; explicit durations must fall inside the
/// configured range.
pub fn validate_duration_update(limits: &Limits, update: DurationUpdate) -> Result<(), CoreError> {
    let mut issues = Vec::new();
    if let DurationUpdate::Seconds(seconds) = update {
        duration_issues(limits, seconds, &mut issues);
    }
    finish(issues)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits {
            nano_id_alphabet: "abc123".to_string(),
            nano_id_length: 6,
            ..Limits::default()
        }
    }

    fn messages(err: CoreError) -> Vec<String> {
        match err {
            CoreError::Validation(issues) => issues,
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn accepts_well_formed_id() {
        assert!(validate_poll_id(&limits(), "abc123").is_ok());
    }

    #[test]
    fn rejects_wrong_length_and_alphabet() {
        let issues = messages(validate_poll_id(&limits(), "xyz").unwrap_err());
        assert_eq!(
            issues,
            vec![
                "ID should be 6 characters long".to_string(),
                "ID should only contain characters from the alphabet: abc123".to_string(),
            ]
        );
    }

    #[test]
    fn vote_params_check_both_ids() {
        let issues = messages(validate_vote_params(&limits(), "abc123", "zzzzzz").unwrap_err());
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("alphabet"));
    }

    #[test]
    fn lunch_poll_is_valid() {
        let body = CreatePoll {
            prompt: "Lunch?".into(),
            options: vec!["Pizza".into(), "Salad".into()],
            duration: 3600,
        };
        assert!(validate_create_poll(&limits(), &body).is_ok());
    }

    #[test]
    fn create_poll_reports_every_issue() {
        let body = CreatePoll {
            prompt: String::new(),
            options: vec!["Pizza".into()],
            duration: 10,
        };
        let issues = messages(validate_create_poll(&limits(), &body).unwrap_err());
        assert_eq!(
            issues,
            vec![
                "Prompt should be at least 1 character".to_string(),
                "Poll should have at least 2 options".to_string(),
                "Poll duration should be at least 60 seconds".to_string(),
            ]
        );
    }

    #[test]
    fn close_now_bypasses_duration_range() {
        assert!(validate_duration_update(&limits(), DurationUpdate::CloseNow).is_ok());
        assert!(validate_duration_update(&limits(), DurationUpdate::Seconds(3600)).is_ok());
        assert!(validate_duration_update(&limits(), DurationUpdate::Seconds(30)).is_err());
        assert!(validate_duration_update(&limits(), DurationUpdate::Seconds(10_000_000)).is_err());
    }

    #[test]
    fn validation_errors_join_with_period() {
        let err = validate_poll_id(&limits(), "").unwrap_err();
        assert_eq!(
            err.to_string(),
            "ID should be 6 characters long. ID should only contain characters from the alphabet: abc123"
        );
    }
}
