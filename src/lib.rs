//! warden
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Model-driven authorization: ACL, RBAC with domains and attribute-based
//! matchers, configured by a small model definition and a table of policy
//! rules.
//!
//! This package re-exports the workspace crates under short module names and
//! bundles the common types in [`prelude`].
//!
//! ```
//! use warden::prelude::*;
//!
//! let model = Model::from_text(
//!     "[request_definition]\nr = sub, obj, act\n\
//!      [policy_definition]\np = sub, obj, act\n\
//!      [role_definition]\ng = _, _\n\
//!      [policy_effect]\ne = some(where (p.eft == allow))\n\
//!      [matchers]\nm = g(r.sub, p.sub) && r.obj == p.obj && r.act == p.act\n",
//! )
//! .unwrap();
//! let adapter = MemoryAdapter::from_text("p, admin, data1, read\ng, alice, admin\n");
//! let e = Enforcer::with_adapter(model, Box::new(adapter)).unwrap();
//! assert!(e.enforce(["alice", "data1", "read"]).unwrap());
//! ```

pub use warden_config as config;
pub use warden_effect as effect;
pub use warden_enforcer as enforcer;
pub use warden_error as error;
pub use warden_expr as expr;
pub use warden_match as matching;
pub use warden_model as model;
pub use warden_persist as persist;
pub use warden_rbac as rbac;

/// The types most callers need.
pub mod prelude {
    pub use warden_config::EngineSettings;
    pub use warden_effect::{DefaultEffector, Effect, Effector};
    pub use warden_enforcer::{
        Cache, CachedEnforcer, Decision, DefaultCache, DefaultLogger, EnforceContext, Enforcer,
        Logger, SyncedEnforcer,
    };
    pub use warden_error::{Error, Result};
    pub use warden_expr::{Function, FunctionMap, Value};
    pub use warden_model::Model;
    pub use warden_persist::{
        Adapter, FileAdapter, Filter, FilteredFileAdapter, MemoryAdapter, StringAdapter, Watcher,
    };
    pub use warden_rbac::{DefaultRoleManager, RoleManager};
}
