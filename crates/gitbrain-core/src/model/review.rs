use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A file at an optional commit or branch. Equality is by fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GitFileReference {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl GitFileReference {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            commit_hash: None,
            branch: None,
        }
    }

    pub fn at_commit(mut self, commit_hash: impl Into<String>) -> Self {
        self.commit_hash = Some(commit_hash.into());
        self
    }

    pub fn on_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentType {
    Error,
    Warning,
    Suggestion,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentSeverity {
    Critical,
    #[default]
    Major,
    Minor,
    Nitpick,
}

/// A review remark anchored to a line range of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewComment {
    pub id: Uuid,
    pub file: GitFileReference,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(rename = "type")]
    pub comment_type: CommentType,
    #[serde(default)]
    pub severity: CommentSeverity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ReviewComment {
    /// A comment on a single line. Widen it with [`ReviewComment::through`].
    pub fn new(
        file: GitFileReference,
        line: u32,
        comment_type: CommentType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            file,
            start_line: line,
            end_line: line,
            comment_type,
            severity: CommentSeverity::default(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn through(mut self, end_line: u32) -> Self {
        self.end_line = end_line.max(self.start_line);
        self
    }

    pub fn with_severity(mut self, severity: CommentSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn line_count(&self) -> u32 {
        self.end_line - self.start_line + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_reference_equality_by_fields() {
        let a = GitFileReference::new("src/lib.rs").at_commit("abc123");
        let b = GitFileReference::new("src/lib.rs").at_commit("abc123");
        assert_eq!(a, b);
        assert_ne!(a, b.on_branch("main"));
    }

    #[test]
    fn test_optional_fields_omitted() {
        let json = serde_json::to_string(&GitFileReference::new("a.rs")).unwrap();
        assert_eq!(json, r#"{"path":"a.rs"}"#);
    }

    #[test]
    fn test_comment_range_never_inverts() {
        let c = ReviewComment::new(GitFileReference::new("a.rs"), 10, CommentType::Info, "x")
            .through(4);
        assert_eq!(c.start_line, 10);
        assert_eq!(c.end_line, 10);
        assert_eq!(c.line_count(), 1);
    }

    #[test]
    fn test_comment_wire_shape() {
        let c = ReviewComment::new(GitFileReference::new("a.rs"), 3, CommentType::Warning, "unused")
            .through(5)
            .with_suggestion("remove it");
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "warning");
        assert_eq!(json["severity"], "major");
        assert_eq!(json["start_line"], 3);
        let back: ReviewComment = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }
}
