//! warden-model
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Model definitions and the policy tables bound to them.
//!
//! A [`Model`] maps each section key (`r`, `p`, `g`, `e`, `m`) to one
//! [`Assertion`] per policy type (`p`, `p2`, ...). Request and policy
//! assertions carry field tokens (`p_sub`) used to bind matcher variables;
//! policy and grouping assertions own their rule tables.

mod assertion;
mod function;
mod model;
mod policy_line;
mod text;

pub use assertion::{Assertion, PolicyOp};
pub use function::builtin_functions;
pub use model::{Model, REQUIRED_SECTIONS, RoleManagers, SECTIONS, section_name};
pub use policy_line::{load_policy_array, load_policy_line, parse_policy_line, policy_to_line};
pub use text::{escape_assertion, eval_rule_names, has_eval, remove_comments};
pub use warden_error::{ModelError, PolicyError};
