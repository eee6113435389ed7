//! warden-enforcer
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The authorization engine: an [`Enforcer`] binds a model, its policy
//! tables, one role manager per grouping type and an effector, and decides
//! requests by evaluating the model's matcher against every policy rule.
//!
//! On top of the core loop this crate provides the management, RBAC and
//! domain APIs, a [`Logger`] capability, a decision-caching wrapper
//! ([`CachedEnforcer`]) and a thread-safe handle with periodic reload
//! ([`SyncedEnforcer`]).
//!
//! ```
//! use warden_enforcer::Enforcer;
//! use warden_model::Model;
//!
//! let model = Model::from_text(
//!     "[request_definition]\nr = sub, obj, act\n\
//!      [policy_definition]\np = sub, obj, act\n\
//!      [policy_effect]\ne = some(where (p.eft == allow))\n\
//!      [matchers]\nm = r.sub == p.sub && r.obj == p.obj && r.act == p.act\n",
//! )
//! .unwrap();
//! let mut e = Enforcer::new(model).unwrap();
//! e.add_policy(["alice", "data1", "read"]).unwrap();
//! assert!(e.enforce(["alice", "data1", "read"]).unwrap());
//! assert!(!e.enforce(["alice", "data1", "write"]).unwrap());
//! ```

mod cache;
mod cached;
mod enforcer;
mod evaluate;
mod logger;
mod management;
mod matcher;
mod rbac;
mod rbac_domains;
mod synced;

pub use cache::{Cache, DefaultCache};
pub use cached::CachedEnforcer;
pub use enforcer::Enforcer;
pub use evaluate::{Decision, EnforceContext};
pub use logger::{DefaultLogger, Logger};
pub use synced::SyncedEnforcer;
pub use warden_error::{Error, Result};
