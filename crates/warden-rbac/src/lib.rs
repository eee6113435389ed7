//! warden-rbac
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Role-link graphs for role-based and domain-scoped access control.
//!
//! A link `u -> r [d]` means "`u` has role `r` in domain `d`" (or globally
//! when no domain is given). Lookups follow links transitively up to the
//! configured hierarchy depth.

mod default_role_manager;

pub use default_role_manager::{DEFAULT_MAX_HIERARCHY_LEVEL, DefaultRoleManager, Link};
pub use warden_error::RbacError;
pub use warden_match::MatchingFn;

/// Capability set of a role manager.
///
/// `domains` carries zero or one domain; more than one is rejected with
/// [`RbacError::DomainArity`]. Looking up unknown names yields empty results,
/// never an error.
pub trait RoleManager: Send + Sync {
    /// Drop every link.
    fn clear(&mut self);

    /// Insert `name1 -> name2`. Returns `false` when the link already existed.
    fn add_link(&mut self, name1: &str, name2: &str, domains: &[&str]) -> Result<bool, RbacError>;

    /// Remove `name1 -> name2`. Returns `false` when the link did not exist.
    fn delete_link(&mut self, name1: &str, name2: &str, domains: &[&str])
    -> Result<bool, RbacError>;

    /// Whether `name2` is reachable from `name1`.
    fn has_link(&self, name1: &str, name2: &str, domains: &[&str]) -> Result<bool, RbacError>;

    /// Direct roles of `name`.
    fn get_roles(&self, name: &str, domains: &[&str]) -> Result<Vec<String>, RbacError>;

    /// Direct members of role `name`.
    fn get_users(&self, name: &str, domains: &[&str]) -> Result<Vec<String>, RbacError>;

    /// Domains in which `name` has at least one role.
    fn get_domains(&self, name: &str) -> Vec<String>;

    /// Every domain that holds links.
    fn get_all_domains(&self) -> Vec<String>;

    /// Hook run once per rule after a bulk rebuild. Must be idempotent.
    fn build_relationship(
        &mut self,
        _name1: &str,
        _name2: &str,
        _domains: &[&str],
    ) -> Result<(), RbacError> {
        Ok(())
    }

    /// Compare names through `f` instead of plain equality.
    fn add_matching_fn(&mut self, name: &str, f: MatchingFn);

    /// Compare domains through `f` instead of plain equality.
    fn add_domain_matching_fn(&mut self, name: &str, f: MatchingFn);

    /// Every stored link.
    fn links(&self) -> Vec<Link>;

    /// Emit every link as a tracing event.
    fn print_roles(&self) {
        for link in self.links() {
            tracing::info!(target: "warden.rbac", "{link}");
        }
    }
}
