//! Access control and lifecycle rules.
//!
//! * [`bucket_policy`] parses and evaluates JSON bucket policies.
//! * [`acl`] expands canned ACLs and checks grants.
//! * [`authorize`] combines both into a single allow/deny decision.
//! * [`lifecycle`] validates lifecycle configurations and matches rules.

pub mod acl;
pub mod authorize;
pub mod bucket_policy;
pub mod lifecycle;

pub use acl::{acl_allows, expand_canned, grants_for, validate_policy};
pub use authorize::{AclTarget, check_access, check_owner};
pub use bucket_policy::{BucketPolicy, PolicyDecision, PolicyRequest};
pub use lifecycle::{LifecycleAction, LifecycleSubject};
