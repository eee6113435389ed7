//! Error taxonomy with stable error codes for the warden authorization engine.
//!
//! Each stage of the pipeline owns a focused error enum ([`ModelError`],
//! [`RequestError`], [`ExpressionError`], ...). They all convert into the
//! crate-spanning [`Error`], which exposes a machine-readable [`ErrorCode`]
//! grouped by [`ErrorCategory`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Model definition could not be loaded.
    Model,
    /// Request shape was rejected before evaluation.
    Request,
    /// Stored policy rows are inconsistent with the model.
    Policy,
    /// Role manager construction or lookup failed.
    Rbac,
    /// Matcher expression failed to parse or evaluate.
    Expression,
    /// Effect expression is not supported.
    Effect,
    /// Persistence adapter failure.
    Adapter,
    /// Change-notification failure.
    Watcher,
    /// Configuration file or value is invalid.
    Config,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Model => "model",
            Self::Request => "request",
            Self::Policy => "policy",
            Self::Rbac => "rbac",
            Self::Expression => "expression",
            Self::Effect => "effect",
            Self::Adapter => "adapter",
            Self::Watcher => "watcher",
            Self::Config => "config",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serialises to a `SCREAMING_SNAKE_CASE` string that does not
/// change across patch releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- Model --
    /// One or more required sections are absent.
    ModelMissingSection,
    /// A definition inside the model is malformed.
    ModelInvalid,
    /// The model source could not be read.
    ModelIo,

    // -- Request --
    /// Request field count does not match the request definition.
    RequestArity,
    /// The request selected an unknown `r`/`p`/`e`/`m` type.
    RequestUnknownType,

    // -- Policy --
    /// A stored policy row has the wrong number of fields.
    PolicySize,
    /// A grouping row is shorter than its role definition.
    PolicyArity,
    /// A policy type does not exist in the model.
    PolicyUnknownType,
    /// `eval()` was used while the policy table is empty.
    PolicyEvalWithoutRules,

    // -- Rbac --
    /// Role definition is malformed.
    RbacInvalidDefinition,
    /// A role manager was requested for an unknown grouping type.
    RbacNotFound,

    // -- Expression --
    /// Matcher text failed to parse.
    ExpressionParse,
    /// Matcher evaluation failed.
    ExpressionEval,

    // -- Effect --
    /// Effect expression is not one of the supported forms.
    EffectUnsupported,

    // -- Adapter --
    /// The adapter lacks a capability the call requires.
    AdapterUnsupported,
    /// Operation is not allowed while the policy is filtered.
    AdapterFiltered,
    /// Adapter I/O or backend failure.
    AdapterIo,

    // -- Watcher --
    /// Watcher could not deliver a notification.
    WatcherNotify,

    // -- Config --
    /// Configuration file or value is invalid.
    ConfigInvalid,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ModelMissingSection | Self::ModelInvalid | Self::ModelIo => ErrorCategory::Model,

            Self::RequestArity | Self::RequestUnknownType => ErrorCategory::Request,

            Self::PolicySize
            | Self::PolicyArity
            | Self::PolicyUnknownType
            | Self::PolicyEvalWithoutRules => ErrorCategory::Policy,

            Self::RbacInvalidDefinition | Self::RbacNotFound => ErrorCategory::Rbac,

            Self::ExpressionParse | Self::ExpressionEval => ErrorCategory::Expression,

            Self::EffectUnsupported => ErrorCategory::Effect,

            Self::AdapterUnsupported | Self::AdapterFiltered | Self::AdapterIo => {
                ErrorCategory::Adapter
            }

            Self::WatcherNotify => ErrorCategory::Watcher,

            Self::ConfigInvalid => ErrorCategory::Config,
        }
    }

    /// Stable `&'static str` representation of the code (e.g. `"REQUEST_ARITY"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModelMissingSection => "MODEL_MISSING_SECTION",
            Self::ModelInvalid => "MODEL_INVALID",
            Self::ModelIo => "MODEL_IO",
            Self::RequestArity => "REQUEST_ARITY",
            Self::RequestUnknownType => "REQUEST_UNKNOWN_TYPE",
            Self::PolicySize => "POLICY_SIZE",
            Self::PolicyArity => "POLICY_ARITY",
            Self::PolicyUnknownType => "POLICY_UNKNOWN_TYPE",
            Self::PolicyEvalWithoutRules => "POLICY_EVAL_WITHOUT_RULES",
            Self::RbacInvalidDefinition => "RBAC_INVALID_DEFINITION",
            Self::RbacNotFound => "RBAC_NOT_FOUND",
            Self::ExpressionParse => "EXPRESSION_PARSE",
            Self::ExpressionEval => "EXPRESSION_EVAL",
            Self::EffectUnsupported => "EFFECT_UNSUPPORTED",
            Self::AdapterUnsupported => "ADAPTER_UNSUPPORTED",
            Self::AdapterFiltered => "ADAPTER_FILTERED",
            Self::AdapterIo => "ADAPTER_IO",
            Self::WatcherNotify => "WATCHER_NOTIFY",
            Self::ConfigInvalid => "CONFIG_INVALID",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Stage errors
// ---------------------------------------------------------------------------

/// Failures while loading or editing a model definition.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Required sections are absent or empty.
    #[error("missing required sections: {}", .sections.join(", "))]
    MissingSections {
        /// Human-readable section names, e.g. `request_definition`.
        sections: Vec<String>,
    },

    /// A role definition has fewer than two `_` placeholders.
    #[error("role definition `{key} = {value}` needs at least two `_` placeholders")]
    InvalidRoleDefinition {
        /// Grouping type, e.g. `g2`.
        key: String,
        /// Raw definition text.
        value: String,
    },

    /// The definition text itself could not be parsed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The model file could not be read.
    #[error("failed to read model {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Requests rejected before any rule is evaluated.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Field count does not match the request definition.
    #[error("invalid request size: expected {expected}, got {got}")]
    Arity {
        /// Token count of the request definition.
        expected: usize,
        /// Number of values supplied.
        got: usize,
    },

    /// The enforce context selected a type that the model does not define.
    #[error("unknown {kind} type `{key}`")]
    UnknownType {
        /// `request`, `policy`, `effect` or `matcher`.
        kind: &'static str,
        /// The missing key, e.g. `r2`.
        key: String,
    },
}

/// Stored policy rows that disagree with the model.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// A policy row has the wrong number of fields for its definition.
    #[error("invalid policy size for `{ptype}`: expected {expected}, got {got}")]
    Size {
        /// Policy type, e.g. `p`.
        ptype: String,
        /// Token count of the policy definition.
        expected: usize,
        /// Field count of the row.
        got: usize,
    },

    /// A grouping row is shorter than its role definition.
    #[error("grouping policy `{ptype}` row has {got} fields, role definition needs {expected}")]
    RoleArity {
        /// Grouping type, e.g. `g`.
        ptype: String,
        /// Placeholder count of the role definition.
        expected: usize,
        /// Field count of the row.
        got: usize,
    },

    /// The section/type pair is not part of the model.
    #[error("unknown policy type `{ptype}` in section `{sec}`")]
    UnknownType {
        /// Section key, `p` or `g`.
        sec: String,
        /// Policy type.
        ptype: String,
    },

    /// `eval()` requires at least one policy row to substitute.
    #[error("please make sure the policy table is not empty when the matcher uses eval()")]
    EvalWithoutRules,
}

/// Role manager construction and lookup failures.
#[derive(Debug, thiserror::Error)]
pub enum RbacError {
    /// Role links accept zero or one domain.
    #[error("role links accept at most one domain, got {count}")]
    DomainArity {
        /// Number of domains supplied.
        count: usize,
    },

    /// No role manager exists for the grouping type.
    #[error("no role manager for grouping type `{ptype}`")]
    NotFound {
        /// Grouping type, e.g. `g2`.
        ptype: String,
    },
}

/// Matcher expression parse and evaluation failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    /// Syntax error at a byte offset.
    #[error("parse error at {position}: {message}")]
    Parse {
        /// Byte offset in the source text.
        position: usize,
        /// What went wrong.
        message: String,
    },

    /// Expression text exceeds the length limit.
    #[error("expression is {len} bytes, limit is {max}")]
    TooLong {
        /// Actual length.
        len: usize,
        /// Configured limit.
        max: usize,
    },

    /// Expression nesting exceeds the depth limit.
    #[error("expression nesting exceeds depth {max}")]
    TooDeep {
        /// Configured limit.
        max: usize,
    },

    /// A variable is not bound in the evaluation scope.
    #[error("unknown variable `{0}`")]
    UnknownVariable(String),

    /// A function is not registered.
    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    /// A function was called with the wrong number of arguments.
    #[error("{name}() expects {expected} arguments, got {got}")]
    ArgumentCount {
        /// Function name.
        name: String,
        /// Human-readable expectation, e.g. `2` or `2 or 3`.
        expected: String,
        /// Number of arguments supplied.
        got: usize,
    },

    /// Operand types do not fit the operator or function.
    #[error("type mismatch in `{op}`: {detail}")]
    TypeMismatch {
        /// Operator or function name.
        op: String,
        /// Operand description.
        detail: String,
    },

    /// A regular expression failed to compile.
    #[error("invalid regex `{pattern}`: {message}")]
    InvalidRegex {
        /// The pattern text.
        pattern: String,
        /// Compiler message.
        message: String,
    },

    /// A function argument has an invalid value.
    #[error("{name}(): {message}")]
    InvalidArgument {
        /// Function name.
        name: String,
        /// What was wrong with the argument.
        message: String,
    },

    /// The matcher produced something other than a bool or number.
    #[error("matcher result should be bool or number, got {0}")]
    MatcherResult(String),
}

/// Effect merge failures.
#[derive(Debug, thiserror::Error)]
pub enum EffectorError {
    /// Effect expression is not one of the supported forms.
    #[error("unsupported effect: {0}")]
    Unsupported(String),
}

/// Persistence adapter failures.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The adapter cannot load a filtered subset of the policy.
    #[error("filtered policies are not supported by this adapter")]
    FilteringUnsupported,

    /// The adapter lacks an optional capability.
    #[error("adapter does not support {capability}")]
    Unsupported {
        /// Capability name, e.g. `batch operations`.
        capability: &'static str,
    },

    /// Saving is refused while only a filtered subset is loaded.
    #[error("cannot save a filtered policy")]
    FilteredSave,

    /// File-backed adapters need a path.
    #[error("invalid file path, file path cannot be empty")]
    EmptyPath,

    /// A policy text line could not be interpreted.
    #[error("invalid policy line {line}: {reason}")]
    InvalidLine {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// File I/O failure.
    #[error("policy file {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Backend-specific failure from a third-party adapter.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Change-notification failures.
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    /// The notification could not be delivered.
    #[error("watcher notification failed: {0}")]
    Notify(String),
}

/// Configuration reader failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file does not exist.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was looked up.
        path: String,
    },

    /// Content could not be parsed.
    #[error("parse the content error : line {line}: {reason}")]
    Parse {
        /// 1-based line number, 0 when unknown.
        line: usize,
        /// What went wrong.
        reason: String,
    },

    /// A value could not be converted to the requested type.
    #[error("`{key}` = `{value}` is not a valid {expected}")]
    InvalidValue {
        /// Lookup key.
        key: String,
        /// Raw value text.
        value: String,
        /// Expected type name.
        expected: &'static str,
    },

    /// Semantic validation failed.
    #[error("validation failed: {}", .reasons.join("; "))]
    ValidationError {
        /// Every violated rule.
        reasons: Vec<String>,
    },

    /// Keys must not be empty.
    #[error("key cannot be empty")]
    EmptyKey,
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Unified warden error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Model loading failure.
    #[error(transparent)]
    Model(#[from] ModelError),
    /// Request rejected before evaluation.
    #[error(transparent)]
    Request(#[from] RequestError),
    /// Policy table inconsistency.
    #[error(transparent)]
    Policy(#[from] PolicyError),
    /// Role manager failure.
    #[error(transparent)]
    Rbac(#[from] RbacError),
    /// Matcher failure.
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    /// Effect merge failure.
    #[error(transparent)]
    Effector(#[from] EffectorError),
    /// Persistence failure.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    /// Notification failure.
    #[error(transparent)]
    Watcher(#[from] WatcherError),
    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Model(e) => match e {
                ModelError::MissingSections { .. } => ErrorCode::ModelMissingSection,
                ModelError::InvalidRoleDefinition { .. } | ModelError::Config(_) => {
                    ErrorCode::ModelInvalid
                }
                ModelError::Io { .. } => ErrorCode::ModelIo,
            },
            Self::Request(e) => match e {
                RequestError::Arity { .. } => ErrorCode::RequestArity,
                RequestError::UnknownType { .. } => ErrorCode::RequestUnknownType,
            },
            Self::Policy(e) => match e {
                PolicyError::Size { .. } => ErrorCode::PolicySize,
                PolicyError::RoleArity { .. } => ErrorCode::PolicyArity,
                PolicyError::UnknownType { .. } => ErrorCode::PolicyUnknownType,
                PolicyError::EvalWithoutRules => ErrorCode::PolicyEvalWithoutRules,
            },
            Self::Rbac(e) => match e {
                RbacError::DomainArity { .. } => ErrorCode::RbacInvalidDefinition,
                RbacError::NotFound { .. } => ErrorCode::RbacNotFound,
            },
            Self::Expression(e) => match e {
                ExpressionError::Parse { .. }
                | ExpressionError::TooLong { .. }
                | ExpressionError::TooDeep { .. } => ErrorCode::ExpressionParse,
                _ => ErrorCode::ExpressionEval,
            },
            Self::Effector(_) => ErrorCode::EffectUnsupported,
            Self::Adapter(e) => match e {
                AdapterError::FilteringUnsupported | AdapterError::Unsupported { .. } => {
                    ErrorCode::AdapterUnsupported
                }
                AdapterError::FilteredSave => ErrorCode::AdapterFiltered,
                _ => ErrorCode::AdapterIo,
            },
            Self::Watcher(_) => ErrorCode::WatcherNotify,
            Self::Config(_) => ErrorCode::ConfigInvalid,
        }
    }

    /// Shorthand for `self.code().category()`.
    pub fn category(&self) -> ErrorCategory {
        self.code().category()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
