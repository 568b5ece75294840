//! Canned ACL expansion and grant checks.

use ferrogate_s3_model::types::{
    ALL_USERS_URI, AUTHENTICATED_USERS_URI, AccessControlPolicy, Acl, CannedAcl, Grant, Grantee,
    LOG_DELIVERY_URI, Owner, Permission,
};

use crate::error::{S3ServiceError, S3ServiceResult};

fn user_grant(owner: &Owner, permission: Permission) -> Grant {
    Grant {
        grantee: Grantee::CanonicalUser {
            id: owner.id.clone(),
            display_name: owner.display_name.clone(),
        },
        permission,
    }
}

fn group_grant(uri: &str, permission: Permission) -> Grant {
    Grant {
        grantee: Grantee::Group {
            uri: uri.to_owned(),
        },
        permission,
    }
}

/// Expand a canned ACL into explicit grants. The owner's `FULL_CONTROL`
/// grant always comes first.
///
/// `bucket_owner` is only consulted by the `bucket-owner-*` variants and only
/// adds a grant when it differs from `owner`.
#[must_use]
pub fn expand_canned(canned: CannedAcl, owner: &Owner, bucket_owner: Option<&Owner>) -> Vec<Grant> {
    let mut grants = vec![user_grant(owner, Permission::FullControl)];
    match canned {
        CannedAcl::Private | CannedAcl::AwsExecRead => {}
        CannedAcl::PublicRead => grants.push(group_grant(ALL_USERS_URI, Permission::Read)),
        CannedAcl::PublicReadWrite => {
            grants.push(group_grant(ALL_USERS_URI, Permission::Read));
            grants.push(group_grant(ALL_USERS_URI, Permission::Write));
        }
        CannedAcl::AuthenticatedRead => {
            grants.push(group_grant(AUTHENTICATED_USERS_URI, Permission::Read));
        }
        CannedAcl::BucketOwnerRead => {
            if let Some(bucket_owner) = bucket_owner.filter(|b| b.id != owner.id) {
                grants.push(user_grant(bucket_owner, Permission::Read));
            }
        }
        CannedAcl::BucketOwnerFullControl => {
            if let Some(bucket_owner) = bucket_owner.filter(|b| b.id != owner.id) {
                grants.push(user_grant(bucket_owner, Permission::FullControl));
            }
        }
    }
    grants
}

/// Grants of a stored ACL.
#[must_use]
pub fn grants_for(acl: &Acl, owner: &Owner, bucket_owner: Option<&Owner>) -> Vec<Grant> {
    match acl {
        Acl::Canned(canned) => expand_canned(*canned, owner, bucket_owner),
        Acl::Grants(grants) => grants.clone(),
    }
}

/// Whether `grants` give `requester` the `wanted` permission. `requester` is
/// `None` for anonymous requests.
#[must_use]
pub fn acl_allows(grants: &[Grant], requester: Option<&str>, wanted: Permission) -> bool {
    grants.iter().any(|grant| {
        let permits = grant.permission == wanted || grant.permission == Permission::FullControl;
        permits
            && match &grant.grantee {
                Grantee::CanonicalUser { id, .. } => requester.is_some_and(|r| r == id),
                Grantee::Group { uri } if uri == ALL_USERS_URI => true,
                Grantee::Group { uri } if uri == AUTHENTICATED_USERS_URI => requester.is_some(),
                Grantee::Group { .. } | Grantee::Email { .. } => false,
            }
    })
}

/// Validate an `AccessControlPolicy` body against the resource owner.
pub fn validate_policy(policy: &AccessControlPolicy, owner: &Owner) -> S3ServiceResult<Acl> {
    if !policy.owner.id.is_empty() && policy.owner.id != owner.id {
        return Err(S3ServiceError::AccessDenied);
    }
    for grant in &policy.grants {
        if let Grantee::Group { uri } = &grant.grantee
            && uri != ALL_USERS_URI
            && uri != AUTHENTICATED_USERS_URI
            && uri != LOG_DELIVERY_URI
        {
            return Err(S3ServiceError::MalformedAcl {
                message: format!("unknown group {uri}"),
            });
        }
        if let Grantee::Email { .. } = grant.grantee {
            return Err(S3ServiceError::NotImplemented {
                feature: "Grant by e-mail".to_owned(),
            });
        }
    }
    Ok(Acl::Grants(policy.grants.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(id: &str) -> Owner {
        Owner {
            id: id.to_owned(),
            display_name: id.to_owned(),
        }
    }

    #[test]
    fn test_should_put_owner_full_control_first() {
        for canned in [
            CannedAcl::Private,
            CannedAcl::PublicRead,
            CannedAcl::PublicReadWrite,
            CannedAcl::AuthenticatedRead,
        ] {
            let grants = expand_canned(canned, &owner("alice"), None);
            assert_eq!(grants[0], user_grant(&owner("alice"), Permission::FullControl));
        }
        assert_eq!(expand_canned(CannedAcl::PublicReadWrite, &owner("a"), None).len(), 3);
    }

    #[test]
    fn test_should_grant_bucket_owner_only_when_different() {
        let same = expand_canned(CannedAcl::BucketOwnerFullControl, &owner("a"), Some(&owner("a")));
        assert_eq!(same.len(), 1);
        let other = expand_canned(CannedAcl::BucketOwnerRead, &owner("a"), Some(&owner("b")));
        assert_eq!(other[1], user_grant(&owner("b"), Permission::Read));
    }

    #[test]
    fn test_should_check_grantee_classes() {
        let public = expand_canned(CannedAcl::PublicRead, &owner("a"), None);
        assert!(acl_allows(&public, None, Permission::Read));
        assert!(!acl_allows(&public, None, Permission::Write));
        assert!(acl_allows(&public, Some("a"), Permission::WriteAcp));

        let authed = expand_canned(CannedAcl::AuthenticatedRead, &owner("a"), None);
        assert!(!acl_allows(&authed, None, Permission::Read));
        assert!(acl_allows(&authed, Some("bob"), Permission::Read));
    }

    #[test]
    fn test_should_reject_acl_with_foreign_owner() {
        let policy = AccessControlPolicy {
            owner: owner("mallory"),
            grants: Vec::new(),
        };
        assert!(matches!(
            validate_policy(&policy, &owner("alice")),
            Err(S3ServiceError::AccessDenied)
        ));
    }
}
