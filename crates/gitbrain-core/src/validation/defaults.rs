//! Schemas for the six built-in message kinds.

use serde::de::DeserializeOwned;

use super::{FieldType, Schema, ValidationError};
use crate::model::{
    CommentType, FeedbackType, HeartbeatStatus, MessageKind, Role, TaskType, Value,
};
use crate::status::KindStatus;

pub fn default_schemas() -> Vec<Schema> {
    vec![
        task_schema(),
        review_schema(),
        code_schema(),
        score_schema(),
        feedback_schema(),
        heartbeat_schema(),
    ]
}

fn task_schema() -> Schema {
    Schema::new(MessageKind::Task.as_str())
        .required("task_id", FieldType::String)
        .required("title", FieldType::String)
        .required("description", FieldType::String)
        .required("task_type", FieldType::String)
        .optional("files", FieldType::Array)
        .optional("deadline", FieldType::String)
        .optional("priority", FieldType::Int)
        .optional("status", FieldType::String)
        .check("task_type", one_of::<TaskType>("task_type"))
        .check("priority", int_in_range("priority", 1, 10))
        .check("deadline", timestamp("deadline"))
        .check("status", status_of(MessageKind::Task))
}

fn review_schema() -> Schema {
    Schema::new(MessageKind::Review.as_str())
        .required("task_id", FieldType::String)
        .required("approved", FieldType::Bool)
        .required("reviewer", FieldType::String)
        .required("feedback", FieldType::String)
        .optional("comments", FieldType::Array)
        .optional("files_reviewed", FieldType::Array)
        .optional("status", FieldType::String)
        .check("comments", review_comments)
        .check("status", status_of(MessageKind::Review))
}

fn code_schema() -> Schema {
    Schema::new(MessageKind::Code.as_str())
        .required("code_id", FieldType::String)
        .required("title", FieldType::String)
        .required("description", FieldType::String)
        .required("files", FieldType::Array)
        .optional("branch", FieldType::String)
        .optional("commit_sha", FieldType::String)
        .optional("status", FieldType::String)
        .check("commit_sha", commit_sha)
        .check("status", status_of(MessageKind::Code))
}

fn score_schema() -> Schema {
    Schema::new(MessageKind::Score.as_str())
        .required("task_id", FieldType::String)
        .required("requested_score", FieldType::Int)
        .required("justification", FieldType::String)
        .optional("awarded_score", FieldType::Int)
        .optional("award_reason", FieldType::String)
        .optional("reject_reason", FieldType::String)
        .optional("status", FieldType::String)
        .check("requested_score", int_in_range("requested_score", 0, i64::MAX))
        .check("awarded_score", int_in_range("awarded_score", 0, i64::MAX))
        .check("status", status_of(MessageKind::Score))
}

fn feedback_schema() -> Schema {
    Schema::new(MessageKind::Feedback.as_str())
        .required("feedback_type", FieldType::String)
        .required("subject", FieldType::String)
        .required("content", FieldType::String)
        .optional("related_task_id", FieldType::String)
        .optional("response", FieldType::String)
        .optional("status", FieldType::String)
        .check("feedback_type", one_of::<FeedbackType>("feedback_type"))
        .check("status", status_of(MessageKind::Feedback))
}

fn heartbeat_schema() -> Schema {
    Schema::new(MessageKind::Heartbeat.as_str())
        .required("status", FieldType::String)
        .optional("current_task", FieldType::String)
        .optional("metadata", FieldType::Map)
        .optional("role", FieldType::String)
        .optional("progress", FieldType::Int)
        .check("status", one_of::<HeartbeatStatus>("status"))
        .check("role", one_of::<Role>("role"))
        .check("progress", int_in_range("progress", 0, 100))
}

/// The string must name a variant of `T`.
fn one_of<T: DeserializeOwned>(
    field: &'static str,
) -> impl Fn(&Value) -> Result<(), ValidationError> + Send + Sync {
    move |value| {
        let name = value.as_str().unwrap_or_default();
        serde_json::from_value::<T>(serde_json::Value::String(name.to_string()))
            .map(|_| ())
            .map_err(|_| ValidationError::invalid_value(field, format!("unknown value '{name}'")))
    }
}

fn status_of(kind: MessageKind) -> impl Fn(&Value) -> Result<(), ValidationError> + Send + Sync {
    move |value| {
        let name = value.as_str().unwrap_or_default();
        KindStatus::parse(kind, name)
            .map(|_| ())
            .map_err(|e| ValidationError::invalid_value("status", e.to_string()))
    }
}

fn int_in_range(
    field: &'static str,
    min: i64,
    max: i64,
) -> impl Fn(&Value) -> Result<(), ValidationError> + Send + Sync {
    move |value| match value.as_i64() {
        Some(n) if (min..=max).contains(&n) => Ok(()),
        Some(n) if max == i64::MAX => Err(ValidationError::invalid_value(
            field,
            format!("{n} is below {min}"),
        )),
        Some(n) => Err(ValidationError::invalid_value(
            field,
            format!("{n} is outside {min}..={max}"),
        )),
        None => Err(ValidationError::invalid_value(field, "not an integer")),
    }
}

fn timestamp(field: &'static str) -> impl Fn(&Value) -> Result<(), ValidationError> + Send + Sync {
    move |value| {
        let raw = value.as_str().unwrap_or_default();
        chrono::DateTime::parse_from_rfc3339(raw)
            .map(|_| ())
            .map_err(|e| ValidationError::invalid_format(field, format!("'{raw}': {e}")))
    }
}

fn commit_sha(value: &Value) -> Result<(), ValidationError> {
    let sha = value.as_str().unwrap_or_default();
    if (7..=40).contains(&sha.len()) && sha.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(ValidationError::invalid_format(
            "commit_sha",
            format!("'{sha}' is not an abbreviated or full hex commit id"),
        ))
    }
}

fn review_comments(value: &Value) -> Result<(), ValidationError> {
    let comments = value.as_array().unwrap_or_default();
    for (i, comment) in comments.iter().enumerate() {
        let field = format!("comments[{i}]");
        let map = comment
            .as_map()
            .ok_or_else(|| ValidationError::invalid_format(&field, "comment must be a map"))?;

        let line = map
            .get("start_line")
            .or_else(|| map.get("line"))
            .and_then(Value::as_i64);
        match line {
            Some(n) if n >= 0 => {}
            Some(n) => {
                return Err(ValidationError::invalid_value(
                    &field,
                    format!("line {n} is negative"),
                ))
            }
            None => return Err(ValidationError::MissingField(format!("{field}.start_line"))),
        }

        let comment_type = map
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ValidationError::MissingField(format!("{field}.type")))?;
        if serde_json::from_value::<CommentType>(comment_type.into()).is_err() {
            return Err(ValidationError::invalid_value(
                &field,
                format!("unknown comment type '{comment_type}'"),
            ));
        }

        match map.get("message").and_then(Value::as_str) {
            Some(m) if !m.trim().is_empty() => {}
            _ => {
                return Err(ValidationError::invalid_value(
                    &field,
                    "message must not be empty",
                ))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::model::{
        CodeMessage, CommentType, Content, GitFileReference, HeartbeatMessage, Payload,
        ReviewComment, ReviewMessage, TaskMessage, TaskType, Value,
    };
    use crate::status::{CodeStatus, ReviewStatus, TaskStatus};
    use crate::validation::{MessageValidator, ValidationError};

    fn task_content() -> Content {
        Payload::from(TaskMessage {
            task_id: "t-1".into(),
            title: "Write tests".into(),
            description: "Cover the parser".into(),
            task_type: TaskType::Testing,
            files: None,
            deadline: None,
            status: TaskStatus::Pending,
        })
        .to_content()
        .unwrap()
    }

    #[test]
    fn test_typed_payloads_pass_default_schemas() {
        let v = MessageValidator::with_default_schemas();
        assert!(v.validate(&task_content()).is_ok());

        let code = Payload::from(CodeMessage {
            code_id: "c-1".into(),
            title: "Parser".into(),
            description: "First cut".into(),
            files: vec!["src/parser.rs".into()],
            branch: Some("feature/parser".into()),
            commit_sha: Some("a1b2c3d".into()),
            status: CodeStatus::Pending,
        });
        assert!(v.validate(&code.to_content().unwrap()).is_ok());

        let review = Payload::from(ReviewMessage {
            task_id: "t-1".into(),
            approved: false,
            reviewer: "overseer".into(),
            comments: Some(vec![ReviewComment::new(
                GitFileReference::new("src/parser.rs"),
                0,
                CommentType::Warning,
                "unused import",
            )]),
            feedback: "see comments".into(),
            files_reviewed: None,
            status: ReviewStatus::InReview,
        });
        assert!(v.validate(&review.to_content().unwrap()).is_ok());

        let heartbeat = Payload::from(HeartbeatMessage {
            status: Default::default(),
            current_task: None,
            metadata: Some(Content::new().with("role", "coder")),
        });
        assert!(v.validate(&heartbeat.to_content().unwrap()).is_ok());
    }

    #[test]
    fn test_unknown_task_type() {
        let v = MessageValidator::with_default_schemas();
        let content = task_content().with("task_type", "juggling");
        assert!(matches!(
            v.validate(&content),
            Err(ValidationError::InvalidValue { field, .. }) if field == "task_type"
        ));
    }

    #[test]
    fn test_task_priority_range() {
        let v = MessageValidator::with_default_schemas();
        assert!(v.validate(&task_content().with("priority", 10i64)).is_ok());
        assert!(v.validate(&task_content().with("priority", 11i64)).is_err());
    }

    #[test]
    fn test_bad_deadline_is_format_error() {
        let v = MessageValidator::with_default_schemas();
        let content = task_content().with("deadline", "next tuesday");
        assert!(matches!(
            v.validate(&content),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_unknown_status_name() {
        let v = MessageValidator::with_default_schemas();
        let content = task_content().with("status", "merged");
        assert!(v.validate(&content).is_err());
    }

    #[test]
    fn test_comment_rules() {
        let v = MessageValidator::with_default_schemas();
        let base = Content::new()
            .with("type", "review")
            .with("task_id", "t")
            .with("approved", true)
            .with("reviewer", "overseer")
            .with("feedback", "ok");

        let negative = Content::new()
            .with("start_line", -1i64)
            .with("type", "info")
            .with("message", "x");
        let result = v.validate(&base.clone().with("comments", Value::Array(vec![negative.into()])));
        assert!(matches!(result, Err(ValidationError::InvalidValue { .. })));

        let empty_message = Content::new()
            .with("line", 3i64)
            .with("type", "info")
            .with("message", " ");
        let result =
            v.validate(&base.clone().with("comments", Value::Array(vec![empty_message.into()])));
        assert!(result.is_err());

        let bad_type = Content::new()
            .with("line", 3i64)
            .with("type", "rant")
            .with("message", "x");
        let result = v.validate(&base.with("comments", Value::Array(vec![bad_type.into()])));
        assert!(result.is_err());
    }

    #[test]
    fn test_heartbeat_role_and_progress() {
        let v = MessageValidator::with_default_schemas();
        let base = Content::new().with("type", "heartbeat").with("status", "busy");
        assert!(v.validate(&base.clone().with("role", "overseer")).is_ok());
        assert!(v.validate(&base.clone().with("role", "monitor")).is_err());
        assert!(v.validate(&base.clone().with("progress", 100i64)).is_ok());
        assert!(v.validate(&base.with("progress", 101i64)).is_err());
    }

    #[test]
    fn test_commit_sha_format() {
        let v = MessageValidator::with_default_schemas();
        let content = Content::new()
            .with("type", "code")
            .with("code_id", "c")
            .with("title", "t")
            .with("description", "d")
            .with("files", Value::Array(vec![]))
            .with("commit_sha", "not-hex!");
        assert!(matches!(
            v.validate(&content),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }
}
