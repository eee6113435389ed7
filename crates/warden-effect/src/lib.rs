//! warden-effect
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Effect combination: turns the outcomes of individual policy rows into one
//! allow/deny decision according to the model's `[policy_effect]` expression.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

pub use warden_error::EffectorError;

/// `some(where (p_eft == allow))`
pub const ALLOW_OVERRIDE: &str = "some(where (p_eft == allow))";
/// `!some(where (p_eft == deny))`
pub const DENY_OVERRIDE: &str = "!some(where (p_eft == deny))";
/// `some(where (p_eft == allow)) && !some(where (p_eft == deny))`
pub const ALLOW_AND_DENY: &str = "some(where (p_eft == allow)) && !some(where (p_eft == deny))";
/// `priority(p_eft) || deny`
pub const PRIORITY: &str = "priority(p_eft) || deny";
/// `subjectPriority(p_eft) || deny`
pub const SUBJECT_PRIORITY: &str = "subjectPriority(p_eft) || deny";

/// Outcome declared by a policy row, or produced by a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// Grant.
    #[default]
    Allow,
    /// No decision yet.
    Indeterminate,
    /// Refuse.
    Deny,
}

impl Effect {
    /// Effect named by a policy `eft` field. Anything other than `allow` or
    /// `deny` is [`Effect::Indeterminate`].
    pub fn from_eft(value: &str) -> Self {
        match value {
            "allow" => Self::Allow,
            "deny" => Self::Deny,
            _ => Self::Indeterminate,
        }
    }

    /// Lower-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Indeterminate => "indeterminate",
            Self::Deny => "deny",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one merge step: the effect and the row that decided it.
pub type Merged = (Effect, Option<usize>);

/// Effect-combination capability.
///
/// `effects` and `matches` are aligned with the policy rows; only entries up to
/// `policy_index` are meaningful. The enforcer calls this once per row and
/// stops at the first answer that is not [`Effect::Indeterminate`].
pub trait Effector: Send + Sync {
    /// Fold the outcomes seen so far.
    fn merge_effects(
        &self,
        expr: &str,
        effects: &[Effect],
        matches: &[bool],
        policy_index: usize,
        policy_length: usize,
    ) -> Result<Merged, EffectorError>;
}

/// Supported effect expressions after normalisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    /// Some matched rule allows.
    AllowOverride,
    /// No matched rule denies.
    DenyOverride,
    /// Some matched rule allows and none denies.
    AllowAndDeny,
    /// Last matched rule wins.
    Priority,
    /// Last matched rule wins, with rows ordered by subject hierarchy.
    SubjectPriority,
}

static PTYPE_EFT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bp[0-9]*_eft\b").expect("static regex"));

impl EffectKind {
    /// Recognise an effect expression. Whitespace and the numeric suffix of the
    /// policy type (`p2_eft`) are ignored.
    pub fn parse(expr: &str) -> Result<Self, EffectorError> {
        let squeezed: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
        let norm = PTYPE_EFT.replace_all(&squeezed, "p_eft");
        let kind = match norm.as_ref() {
            "some(where(p_eft==allow))" => Self::AllowOverride,
            "!some(where(p_eft==deny))" => Self::DenyOverride,
            "some(where(p_eft==allow))&&!some(where(p_eft==deny))" => Self::AllowAndDeny,
            "priority(p_eft)||deny" => Self::Priority,
            "subjectPriority(p_eft)||deny" => Self::SubjectPriority,
            _ => return Err(EffectorError::Unsupported(expr.to_string())),
        };
        Ok(kind)
    }

    /// Canonical expression text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllowOverride => ALLOW_OVERRIDE,
            Self::DenyOverride => DENY_OVERRIDE,
            Self::AllowAndDeny => ALLOW_AND_DENY,
            Self::Priority => PRIORITY,
            Self::SubjectPriority => SUBJECT_PRIORITY,
        }
    }
}

/// Effector for the stock expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEffector;

impl DefaultEffector {
    /// New effector.
    pub fn new() -> Self {
        Self
    }
}

fn matched(matches: &[bool], i: usize) -> bool {
    matches.get(i).copied().unwrap_or(false)
}

fn effect_at(effects: &[Effect], i: usize) -> Effect {
    effects.get(i).copied().unwrap_or(Effect::Indeterminate)
}

impl Effector for DefaultEffector {
    fn merge_effects(
        &self,
        expr: &str,
        effects: &[Effect],
        matches: &[bool],
        policy_index: usize,
        policy_length: usize,
    ) -> Result<Merged, EffectorError> {
        let last = policy_index + 1 >= policy_length;

        let merged = match EffectKind::parse(expr)? {
            EffectKind::AllowOverride => {
                if matched(matches, policy_index)
                    && effect_at(effects, policy_index) == Effect::Allow
                {
                    (Effect::Allow, Some(policy_index))
                } else {
                    (Effect::Indeterminate, None)
                }
            }
            EffectKind::DenyOverride => {
                if matched(matches, policy_index)
                    && effect_at(effects, policy_index) == Effect::Deny
                {
                    (Effect::Deny, Some(policy_index))
                } else if last {
                    (Effect::Allow, None)
                } else {
                    (Effect::Indeterminate, None)
                }
            }
            EffectKind::AllowAndDeny => {
                if matched(matches, policy_index)
                    && effect_at(effects, policy_index) == Effect::Deny
                {
                    (Effect::Deny, Some(policy_index))
                } else if !last {
                    (Effect::Indeterminate, None)
                } else {
                    (0..policy_length)
                        .find(|&i| matched(matches, i) && effect_at(effects, i) == Effect::Allow)
                        .map_or((Effect::Indeterminate, None), |i| (Effect::Allow, Some(i)))
                }
            }
            EffectKind::Priority | EffectKind::SubjectPriority => (0..policy_length)
                .rev()
                .filter(|&i| matched(matches, i))
                .map(|i| (effect_at(effects, i), i))
                .find(|(eft, _)| *eft != Effect::Indeterminate)
                .map_or((Effect::Indeterminate, None), |(eft, i)| (eft, Some(i))),
        };
        Ok(merged)
    }
}
