use std::fmt;
use tracing::error;

/// Category of a problem found while compiling a specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileIssueKind {
    /// No controller declared anywhere on the directive ancestry
    MissingController,
    /// A directive has a value that is neither a string nor null
    InvalidDirective,
    /// An operation names an around hook that was never registered
    UnknownHook,
    /// Two operations compile to the same method and route template
    DuplicateRoute,
    /// A parameter object is malformed (missing `name`, unknown `in`, ...)
    InvalidParameter,
    /// A route template could not be compiled into a matcher
    InvalidRoute,
}

impl fmt::Display for CompileIssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompileIssueKind::MissingController => "MissingController",
            CompileIssueKind::InvalidDirective => "InvalidDirective",
            CompileIssueKind::UnknownHook => "UnknownHook",
            CompileIssueKind::DuplicateRoute => "DuplicateRoute",
            CompileIssueKind::InvalidParameter => "InvalidParameter",
            CompileIssueKind::InvalidRoute => "InvalidRoute",
        };
        f.write_str(s)
    }
}

/// A single problem located at `METHOD path` (or a document scope).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileIssue {
    pub location: String,
    pub kind: CompileIssueKind,
    pub message: String,
}

impl CompileIssue {
    pub fn new(location: impl Into<String>, kind: CompileIssueKind, message: impl Into<String>) -> Self {
        CompileIssue {
            location: location.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for CompileIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.location, self.message)
    }
}

/// Fatal error raised while building the dispatch table.
///
/// A service must not start serving when this is returned.
#[derive(Debug)]
pub enum CompileError {
    /// The specification could not be loaded or parsed
    Load(String),
    /// The gateway configuration is unusable
    Config(crate::gateway::ConfigError),
    /// One or more operations failed to compile
    Issues(Vec<CompileIssue>),
}

impl CompileError {
    /// Issues carried by this error (empty for load/config failures).
    pub fn issues(&self) -> &[CompileIssue] {
        match self {
            CompileError::Issues(issues) => issues,
            _ => &[],
        }
    }

    pub fn has_kind(&self, kind: CompileIssueKind) -> bool {
        self.issues().iter().any(|i| i.kind == kind)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Load(msg) => write!(f, "failed to load specification: {msg}"),
            CompileError::Config(err) => write!(f, "invalid gateway configuration: {err}"),
            CompileError::Issues(issues) => {
                write!(f, "specification failed to compile ({} issue(s))", issues.len())?;
                for issue in issues {
                    write!(f, "\n  {issue}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CompileError {}

impl From<crate::gateway::ConfigError> for CompileError {
    fn from(err: crate::gateway::ConfigError) -> Self {
        CompileError::Config(err)
    }
}

/// Log every issue and turn a non-empty list into an error.
pub fn fail_if_issues(issues: Vec<CompileIssue>) -> Result<(), CompileError> {
    if issues.is_empty() {
        return Ok(());
    }
    for issue in &issues {
        error!(
            kind = %issue.kind,
            location = %issue.location,
            message = %issue.message,
            "Specification compile issue"
        );
    }
    Err(CompileError::Issues(issues))
}
