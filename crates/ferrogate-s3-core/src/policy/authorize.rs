//! Access decision combining ownership, bucket policy and ACLs.

use ferrogate_s3_model::request::RequestContext;
use ferrogate_s3_model::types::{Acl, Owner, Permission};
use tracing::debug;

use super::acl::{acl_allows, grants_for};
use super::bucket_policy::{BucketPolicy, PolicyDecision, PolicyRequest};
use crate::error::{S3ServiceError, S3ServiceResult};
use crate::meta::BucketRecord;

/// The resource whose ACL is consulted.
#[derive(Debug, Clone, Copy)]
pub enum AclTarget<'a> {
    /// The bucket ACL.
    Bucket,
    /// An object ACL.
    Object {
        /// Object owner.
        owner: &'a Owner,
        /// Stored object ACL.
        acl: &'a Acl,
    },
}

/// Decide whether the request may perform `action` on the bucket or object.
///
/// A policy `Deny` wins over everything, including ownership of the
/// resource. Otherwise the resource owner, a policy `Allow` or a matching
/// ACL grant permits the request.
pub fn check_access(
    bucket: &BucketRecord,
    target: AclTarget<'_>,
    permission: Permission,
    action: &str,
    object_key: Option<&str>,
    ctx: &RequestContext,
) -> S3ServiceResult<()> {
    let requester = (!ctx.is_anonymous()).then(|| ctx.user_id());

    let decision = match &bucket.policy {
        Some(document) => match BucketPolicy::parse(document, &bucket.name) {
            Ok(policy) => policy.evaluate(&PolicyRequest {
                account: ctx.user_id(),
                action,
                bucket: &bucket.name,
                object: object_key,
                condition_values: &ctx.condition_values,
            }),
            Err(err) => {
                debug!(bucket = %bucket.name, error = %err, "stored bucket policy no longer parses");
                PolicyDecision::Neutral
            }
        },
        None => PolicyDecision::Neutral,
    };

    // An explicit policy Deny overrides even the resource owner.
    if decision == PolicyDecision::Deny {
        return Err(S3ServiceError::AccessDenied);
    }

    let resource_owner = match target {
        AclTarget::Bucket => &bucket.owner,
        AclTarget::Object { owner, .. } => owner,
    };
    if requester.is_some_and(|id| id == resource_owner.id) {
        return Ok(());
    }
    if decision == PolicyDecision::Allow {
        return Ok(());
    }

    let grants = match target {
        AclTarget::Bucket => grants_for(&bucket.acl, &bucket.owner, None),
        AclTarget::Object { owner, acl } => grants_for(acl, owner, Some(&bucket.owner)),
    };
    if acl_allows(&grants, requester, permission) {
        return Ok(());
    }
    debug!(
        bucket = %bucket.name,
        action,
        requester = requester.unwrap_or("anonymous"),
        "access denied"
    );
    Err(S3ServiceError::AccessDenied)
}

/// Owner-only operations such as bucket configuration writes. A policy may
/// still deny the owner.
pub fn check_owner(bucket: &BucketRecord, action: &str, ctx: &RequestContext) -> S3ServiceResult<()> {
    if let Some(document) = &bucket.policy
        && let Ok(policy) = BucketPolicy::parse(document, &bucket.name)
        && policy.evaluate(&PolicyRequest {
            account: ctx.user_id(),
            action,
            bucket: &bucket.name,
            object: None,
            condition_values: &ctx.condition_values,
        }) == PolicyDecision::Deny
    {
        return Err(S3ServiceError::AccessDenied);
    }
    if !ctx.is_anonymous() && ctx.user_id() == bucket.owner.id {
        Ok(())
    } else {
        Err(S3ServiceError::AccessDenied)
    }
}

#[cfg(test)]
mod tests {
    use ferrogate_s3_model::request::Identity;
    use ferrogate_s3_model::types::CannedAcl;

    use super::*;

    fn owner(id: &str) -> Owner {
        Owner {
            id: id.to_owned(),
            display_name: id.to_owned(),
        }
    }

    fn ctx(user: Option<&str>) -> RequestContext {
        let ctx = RequestContext::new("req");
        match user {
            Some(id) => ctx.with_identity(Identity {
                user_id: id.to_owned(),
                display_name: id.to_owned(),
                access_key: format!("AK{id}"),
            }),
            None => ctx,
        }
    }

    fn bucket() -> BucketRecord {
        BucketRecord::new("photos", owner("alice"), "us-east-1")
    }

    #[test]
    fn test_should_allow_owner_and_deny_strangers() {
        let bucket = bucket();
        assert!(check_access(&bucket, AclTarget::Bucket, Permission::Read, "s3:ListBucket", None, &ctx(Some("alice"))).is_ok());
        assert!(check_access(&bucket, AclTarget::Bucket, Permission::Read, "s3:ListBucket", None, &ctx(Some("bob"))).is_err());
        assert!(check_access(&bucket, AclTarget::Bucket, Permission::Read, "s3:ListBucket", None, &ctx(None)).is_err());
    }

    #[test]
    fn test_should_honour_public_acl_for_anonymous() {
        let mut bucket = bucket();
        bucket.acl = Acl::Canned(CannedAcl::PublicRead);
        assert!(check_access(&bucket, AclTarget::Bucket, Permission::Read, "s3:ListBucket", None, &ctx(None)).is_ok());
        assert!(check_access(&bucket, AclTarget::Bucket, Permission::Write, "s3:PutObject", None, &ctx(None)).is_err());
    }

    #[test]
    fn test_should_let_policy_deny_override_acl_grant() {
        let mut bucket = bucket();
        bucket.acl = Acl::Canned(CannedAcl::PublicRead);
        bucket.policy = Some(
            r#"{"Statement": {"Effect": "Deny", "Principal": "*", "Action": "s3:GetObject", "Resource": "arn:aws:s3:::photos/secret/*"}}"#
                .to_owned(),
        );
        let object_owner = owner("alice");
        let acl = Acl::Canned(CannedAcl::PublicRead);
        let target = AclTarget::Object { owner: &object_owner, acl: &acl };
        assert!(check_access(&bucket, target, Permission::Read, "s3:GetObject", Some("secret/a"), &ctx(None)).is_err());
        assert!(check_access(&bucket, target, Permission::Read, "s3:GetObject", Some("secret/a"), &ctx(Some("alice"))).is_err());
        assert!(check_access(&bucket, target, Permission::Read, "s3:GetObject", Some("open/a"), &ctx(None)).is_ok());
    }

    #[test]
    fn test_should_let_policy_deny_override_owner() {
        let mut bucket = bucket();
        bucket.policy = Some(
            r#"{"Statement": {"Effect": "Deny", "Principal": {"AWS": "alice"}, "Action": "s3:ListBucket", "Resource": "arn:aws:s3:::photos"}}"#
                .to_owned(),
        );
        assert!(check_access(&bucket, AclTarget::Bucket, Permission::Read, "s3:ListBucket", None, &ctx(Some("alice"))).is_err());
        assert!(check_access(&bucket, AclTarget::Bucket, Permission::Write, "s3:PutObject", None, &ctx(Some("alice"))).is_ok());
        assert!(check_owner(&bucket, "s3:ListBucket", &ctx(Some("alice"))).is_err());
    }

    #[test]
    fn test_should_let_policy_allow_grant_access() {
        let mut bucket = bucket();
        bucket.policy = Some(
            r#"{"Statement": {"Effect": "Allow", "Principal": {"AWS": "bob"}, "Action": "s3:*", "Resource": "arn:aws:s3:::photos"}}"#
                .to_owned(),
        );
        assert!(check_access(&bucket, AclTarget::Bucket, Permission::Read, "s3:ListBucket", None, &ctx(Some("bob"))).is_ok());
        assert!(check_owner(&bucket, "s3:PutBucketPolicy", &ctx(Some("bob"))).is_err());
        assert!(check_owner(&bucket, "s3:PutBucketPolicy", &ctx(Some("alice"))).is_ok());
    }
}
