// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::Enforcer;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use warden_effect::Effect;
use warden_error::{ExpressionError, PolicyError, RequestError, Result};
use warden_expr::{Scope, Value, expect_args, str_arg};
use warden_model::{escape_assertion, remove_comments};

/// Nested `eval()` calls allowed inside one matcher evaluation.
const MAX_EVAL_NESTING: usize = 8;

/// Outcome of one enforcement call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Decision {
    /// Whether the request is granted.
    pub allowed: bool,
    /// The policy rule that determined the outcome, when one did.
    pub explain: Option<Vec<String>>,
}

impl Decision {
    fn new(allowed: bool, explain: Option<Vec<String>>) -> Self {
        Self { allowed, explain }
    }
}

/// Which request, policy, effect and matcher definitions a call uses.
///
/// The default selects `r`, `p`, `e` and `m`; [`EnforceContext::new`]
/// selects numbered variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforceContext {
    /// Request definition key.
    pub r_type: String,
    /// Policy definition key.
    pub p_type: String,
    /// Effect definition key.
    pub e_type: String,
    /// Matcher definition key.
    pub m_type: String,
}

impl EnforceContext {
    /// Context for the definitions numbered `suffix`, e.g. `"2"` selects
    /// `r2`, `p2`, `e2` and `m2`.
    pub fn new(suffix: &str) -> Self {
        Self {
            r_type: format!("r{suffix}"),
            p_type: format!("p{suffix}"),
            e_type: format!("e{suffix}"),
            m_type: format!("m{suffix}"),
        }
    }
}

impl Default for EnforceContext {
    fn default() -> Self {
        Self::new("")
    }
}

/// Collect request fields. Strings stay strings; structured values pass
/// through for attribute matchers.
pub(crate) fn request_values<I, V>(rvals: I) -> Vec<Value>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    rvals.into_iter().map(Into::into).collect()
}

/// Variable and function resolution for one policy row.
struct RowScope<'a> {
    enforcer: &'a Enforcer,
    r_tokens: &'a [String],
    rvals: &'a [Value],
    p_tokens: &'a [String],
    pvals: Option<&'a [String]>,
    eval_depth: Cell<usize>,
}

impl RowScope<'_> {
    fn has_link(&self, ptype: &str, args: &[Value]) -> std::result::Result<Value, ExpressionError> {
        if args.len() < 2 {
            return Err(ExpressionError::ArgumentCount {
                name: ptype.to_string(),
                expected: "2 or 3".into(),
                got: args.len(),
            });
        }
        let names = (0..args.len())
            .map(|i| str_arg(ptype, args, i))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let Some(rm) = self.enforcer.rms.get(ptype) else {
            return Err(ExpressionError::UnknownFunction(ptype.to_string()));
        };
        rm.has_link(names[0], names[1], &names[2..])
            .map(Value::Bool)
            .map_err(|e| ExpressionError::InvalidArgument {
                name: ptype.to_string(),
                message: e.to_string(),
            })
    }

    fn eval_rule(&self, args: &[Value]) -> std::result::Result<Value, ExpressionError> {
        expect_args("eval", args, 1)?;
        let rule = escape_assertion(str_arg("eval", args, 0)?);
        let depth = self.eval_depth.get();
        if depth >= MAX_EVAL_NESTING {
            return Err(ExpressionError::TooDeep {
                max: MAX_EVAL_NESTING,
            });
        }
        let compiled = self.enforcer.matchers.get_or_compile(&rule)?;
        self.eval_depth.set(depth + 1);
        let out = compiled.expr.eval(self);
        self.eval_depth.set(depth);
        out
    }
}

impl Scope for RowScope<'_> {
    fn variable(&self, name: &str) -> Option<Value> {
        if let Some(i) = self.r_tokens.iter().position(|t| t == name) {
            return self.rvals.get(i).cloned();
        }
        let i = self.p_tokens.iter().position(|t| t == name)?;
        let field = self.pvals.and_then(|row| row.get(i)).cloned().unwrap_or_default();
        Some(Value::Str(field))
    }

    fn call(&self, name: &str, args: &[Value]) -> std::result::Result<Value, ExpressionError> {
        if name == "eval" {
            return self.eval_rule(args);
        }
        if self.enforcer.rms.contains_key(name) {
            return self.has_link(name, args);
        }
        self.enforcer.functions.call(name, args)
    }
}

impl Enforcer {
    /// Decide whether the request `rvals` is granted.
    ///
    /// ```
    /// use warden_enforcer::Enforcer;
    /// use warden_model::Model;
    ///
    /// let model = Model::from_text(
    ///     "[request_definition]\nr = sub, obj, act\n\
    ///      [policy_definition]\np = sub, obj, act\n\
    ///      [policy_effect]\ne = some(where (p.eft == allow))\n\
    ///      [matchers]\nm = r.sub == p.sub && r.obj == p.obj && r.act == p.act\n",
    /// )
    /// .unwrap();
    /// let mut e = Enforcer::new(model).unwrap();
    /// e.add_policy(["alice", "data1", "read"]).unwrap();
    /// assert!(e.enforce(["alice", "data1", "read"]).unwrap());
    /// assert!(!e.enforce(["alice", "data1", "write"]).unwrap());
    /// ```
    pub fn enforce<I, V>(&self, rvals: I) -> Result<bool>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enforce_values(&EnforceContext::default(), None, &request_values(rvals))
            .map(|d| d.allowed)
    }

    /// Like [`enforce`](Self::enforce), also reporting the deciding rule.
    pub fn enforce_ex<I, V>(&self, rvals: I) -> Result<Decision>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enforce_values(&EnforceContext::default(), None, &request_values(rvals))
    }

    /// Decide using `matcher` instead of the model's matcher. The text uses
    /// the same syntax as the `[matchers]` section.
    pub fn enforce_with_matcher<I, V>(&self, matcher: &str, rvals: I) -> Result<bool>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enforce_values(&EnforceContext::default(), Some(matcher), &request_values(rvals))
            .map(|d| d.allowed)
    }

    /// [`enforce_with_matcher`](Self::enforce_with_matcher) with the deciding
    /// rule.
    pub fn enforce_ex_with_matcher<I, V>(&self, matcher: &str, rvals: I) -> Result<Decision>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enforce_values(&EnforceContext::default(), Some(matcher), &request_values(rvals))
    }

    /// Decide against the definitions selected by `ctx`.
    pub fn enforce_with_context<I, V>(&self, ctx: &EnforceContext, rvals: I) -> Result<Decision>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enforce_values(ctx, None, &request_values(rvals))
    }

    /// Decide every request in order. The first error aborts the batch.
    pub fn batch_enforce<B, I, V>(&self, requests: B) -> Result<Vec<bool>>
    where
        B: IntoIterator<Item = I>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let ctx = EnforceContext::default();
        requests
            .into_iter()
            .map(|r| Ok(self.enforce_values(&ctx, None, &request_values(r))?.allowed))
            .collect()
    }

    /// [`batch_enforce`](Self::batch_enforce) with a custom matcher.
    pub fn batch_enforce_with_matcher<B, I, V>(&self, matcher: &str, requests: B) -> Result<Vec<bool>>
    where
        B: IntoIterator<Item = I>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let ctx = EnforceContext::default();
        requests
            .into_iter()
            .map(|r| Ok(self.enforce_values(&ctx, Some(matcher), &request_values(r))?.allowed))
            .collect()
    }

    /// The evaluation loop.
    pub(crate) fn enforce_values(
        &self,
        ctx: &EnforceContext,
        matcher: Option<&str>,
        rvals: &[Value],
    ) -> Result<Decision> {
        if !self.enabled {
            return Ok(Decision::new(true, None));
        }

        let unknown = |kind: &'static str, key: &str| RequestError::UnknownType {
            kind,
            key: key.to_string(),
        };
        let r_ast = self
            .model
            .get("r", &ctx.r_type)
            .ok_or_else(|| unknown("request", &ctx.r_type))?;
        let p_ast = self
            .model
            .get("p", &ctx.p_type)
            .ok_or_else(|| unknown("policy", &ctx.p_type))?;
        let e_ast = self
            .model
            .get("e", &ctx.e_type)
            .ok_or_else(|| unknown("effect", &ctx.e_type))?;
        let matcher_text = match matcher {
            Some(m) => remove_comments(&escape_assertion(m)),
            None => self
                .model
                .get("m", &ctx.m_type)
                .ok_or_else(|| unknown("matcher", &ctx.m_type))?
                .value
                .clone(),
        };

        if rvals.len() != r_ast.tokens.len() {
            return Err(RequestError::Arity {
                expected: r_ast.tokens.len(),
                got: rvals.len(),
            }
            .into());
        }

        let compiled = self.matchers.get_or_compile(&matcher_text)?;
        let policy = p_ast.policy();
        let eft_token = format!("{}_eft", ctx.p_type);
        let eft_index = p_ast.tokens.iter().position(|t| *t == eft_token);

        let mut scope = RowScope {
            enforcer: self,
            r_tokens: &r_ast.tokens,
            rvals,
            p_tokens: &p_ast.tokens,
            pvals: None,
            eval_depth: Cell::new(0),
        };

        let (effect, index) = if !policy.is_empty() && compiled.references(&p_ast.tokens) {
            let n = policy.len();
            let mut effects = vec![Effect::Indeterminate; n];
            let mut matches = vec![false; n];
            let mut merged = (Effect::Indeterminate, None);
            for (i, row) in policy.iter().enumerate() {
                if row.len() != p_ast.tokens.len() {
                    return Err(PolicyError::Size {
                        ptype: ctx.p_type.clone(),
                        expected: p_ast.tokens.len(),
                        got: row.len(),
                    }
                    .into());
                }
                scope.pvals = Some(row.as_slice());
                if compiled.expr.matches(&scope)? {
                    matches[i] = true;
                    effects[i] = eft_index.map_or(Effect::Allow, |j| Effect::from_eft(&row[j]));
                }
                merged = self
                    .effector
                    .merge_effects(&e_ast.value, &effects, &matches, i, n)?;
                if merged.0 != Effect::Indeterminate {
                    break;
                }
            }
            merged
        } else {
            if compiled.uses_eval && policy.is_empty() {
                return Err(PolicyError::EvalWithoutRules.into());
            }
            let effect = if compiled.expr.matches(&scope)? {
                Effect::Allow
            } else {
                Effect::Indeterminate
            };
            self.effector
                .merge_effects(&e_ast.value, &[effect], &[true], 0, 1)?
        };

        let explain = index.and_then(|i| policy.get(i)).cloned();
        let allowed = effect == Effect::Allow;
        self.logger
            .log_enforce(&matcher_text, rvals, allowed, explain.as_deref());
        Ok(Decision::new(allowed, explain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_error::Error;
    use warden_model::Model;

    const BASIC: &str = "\
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = r.sub == p.sub && r.obj == p.obj && r.act == p.act
";

    fn basic() -> Enforcer {
        let mut e = Enforcer::new(Model::from_text(BASIC).unwrap()).unwrap();
        e.add_policy(["alice", "data1", "read"]).unwrap();
        e.add_policy(["bob", "data2", "write"]).unwrap();
        e
    }

    #[test]
    fn explains_the_matching_rule() {
        let e = basic();
        let d = e.enforce_ex(["alice", "data1", "read"]).unwrap();
        assert_eq!(
            d,
            Decision::new(true, Some(vec!["alice".into(), "data1".into(), "read".into()]))
        );
        assert_eq!(e.enforce_ex(["alice", "data1", "write"]).unwrap(), Decision::new(false, None));
    }

    #[test]
    fn request_arity_is_checked_first() {
        let e = basic();
        let err = e.enforce(["alice", "data1"]).unwrap_err();
        assert!(matches!(err, Error::Request(RequestError::Arity { expected: 3, got: 2 })));
    }

    #[test]
    fn disabled_enforcer_allows_everything() {
        let mut e = basic();
        e.enable_enforce(false);
        assert!(e.enforce(["mallory", "data9", "drop"]).unwrap());
        assert!(e.enforce(["too", "short"]).unwrap());
    }

    #[test]
    fn empty_policy_still_evaluates_once() {
        let text = BASIC.replace(
            "m = r.sub == p.sub && r.obj == p.obj && r.act == p.act",
            "m = r.sub == 'root'",
        );
        let e = Enforcer::new(Model::from_text(&text).unwrap()).unwrap();
        assert!(e.enforce(["root", "x", "y"]).unwrap());
        assert!(!e.enforce(["alice", "x", "y"]).unwrap());
    }

    #[test]
    fn matcher_errors_propagate() {
        let e = basic();
        let err = e
            .enforce_with_matcher("unknownFn(r.sub)", ["alice", "data1", "read"])
            .unwrap_err();
        assert!(matches!(err, Error::Expression(ExpressionError::UnknownFunction(_))));
    }

    #[test]
    fn custom_matcher_overrides_model_matcher() {
        let e = basic();
        assert!(
            e.enforce_with_matcher("r.sub == p.sub && r.obj == p.obj", ["alice", "data1", "write"])
                .unwrap()
        );
    }

    #[test]
    fn unknown_context_type_is_rejected() {
        let e = basic();
        let err = e
            .enforce_with_context(&EnforceContext::new("2"), ["alice", "data1", "read"])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Request(RequestError::UnknownType { kind: "request", .. })
        ));
    }

    #[test]
    fn batch_enforce_keeps_order() {
        let e = basic();
        let out = e
            .batch_enforce([
                ["alice", "data1", "read"],
                ["bob", "data2", "read"],
                ["bob", "data2", "write"],
            ])
            .unwrap();
        assert_eq!(out, vec![true, false, true]);
    }

    #[test]
    fn structured_request_fields_are_addressable() {
        let text = BASIC.replace(
            "m = r.sub == p.sub && r.obj == p.obj && r.act == p.act",
            "m = r.sub.Age >= 18 && r.obj == p.obj && r.act == p.act",
        );
        let mut e = Enforcer::new(Model::from_text(&text).unwrap()).unwrap();
        e.add_policy(["anyone", "bar", "enter"]).unwrap();
        let adult = Value::from_json(serde_json::json!({"Name": "ann", "Age": 30}));
        let minor = Value::from_json(serde_json::json!({"Name": "tim", "Age": 12}));
        assert!(e.enforce(vec![adult, "bar".into(), "enter".into()]).unwrap());
        assert!(!e.enforce(vec![minor, "bar".into(), "enter".into()]).unwrap());
    }

    #[test]
    fn self_referencing_eval_rule_is_bounded() {
        let text = "\
[request_definition]
r = sub, obj
[policy_definition]
p = rule, obj
[policy_effect]
e = some(where (p.eft == allow))
[matchers]
m = eval(p.rule) && r.obj == p.obj
";
        let mut e = Enforcer::new(Model::from_text(text).unwrap()).unwrap();
        e.add_policy(["eval(p.rule)", "data1"]).unwrap();
        let err = e.enforce(["alice", "data1"]).unwrap_err();
        assert!(matches!(err, Error::Expression(ExpressionError::TooDeep { .. })));
    }
}
