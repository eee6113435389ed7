// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compiled matcher cache.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use warden_expr::{Expr, ExpressionError};

/// A matcher compiled once and shared between calls.
#[derive(Debug)]
pub(crate) struct CompiledMatcher {
    pub(crate) expr: Expr,
    pub(crate) variables: BTreeSet<String>,
    pub(crate) uses_eval: bool,
}

impl CompiledMatcher {
    fn compile(text: &str) -> Result<Self, ExpressionError> {
        let expr = Expr::parse(text)?;
        Ok(Self {
            variables: expr.variables(),
            uses_eval: expr.functions().contains("eval"),
            expr,
        })
    }

    /// Whether any of `tokens` is referenced.
    pub(crate) fn references(&self, tokens: &[String]) -> bool {
        tokens.iter().any(|t| self.variables.contains(t))
    }
}

/// Matcher and `eval()` rule texts, compiled, keyed by source text.
#[derive(Debug, Default)]
pub(crate) struct MatcherCache {
    compiled: RwLock<HashMap<String, Arc<CompiledMatcher>>>,
}

impl MatcherCache {
    pub(crate) fn get_or_compile(&self, text: &str) -> Result<Arc<CompiledMatcher>, ExpressionError> {
        if let Some(m) = self.compiled.read().get(text) {
            return Ok(Arc::clone(m));
        }
        let m = Arc::new(CompiledMatcher::compile(text)?);
        self.compiled
            .write()
            .entry(text.to_string())
            .or_insert_with(|| Arc::clone(&m));
        Ok(m)
    }

    pub(crate) fn clear(&self) {
        self.compiled.write().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.compiled.read().len()
    }
}
