//! Lifecycle configuration validation and rule matching.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use ferrogate_s3_model::types::{LifecycleConfiguration, LifecycleRule, RuleStatus, StorageClass, Tag};

use crate::error::{S3ServiceError, S3ServiceResult};

const MAX_RULES: usize = 1000;
const MAX_RULE_ID_LEN: usize = 255;

/// What a lifecycle pass should do with one object version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Leave the version alone.
    None,
    /// Move the latest version to another tier.
    Transition(StorageClass),
    /// Expire the latest version (delete, or delete marker when versioned).
    Expire,
    /// Move a non-current version to another tier.
    TransitionNoncurrent(StorageClass),
    /// Permanently remove a non-current version.
    ExpireNoncurrent,
}

/// The object version being evaluated.
#[derive(Debug, Clone)]
pub struct LifecycleSubject<'a> {
    /// Object key.
    pub key: &'a str,
    /// Object tags.
    pub tags: &'a [Tag],
    /// Last modification time; age is measured from here.
    pub last_modified: DateTime<Utc>,
    /// Whether this is the latest version.
    pub is_latest: bool,
    /// Current tier.
    pub storage_class: StorageClass,
}

fn malformed(message: impl Into<String>) -> S3ServiceError {
    S3ServiceError::MalformedXml {
        message: message.into(),
    }
}

/// Validate a configuration before it is stored.
pub fn validate(config: &LifecycleConfiguration) -> S3ServiceResult<()> {
    if config.rules.is_empty() {
        return Err(malformed("lifecycle configuration has no rules"));
    }
    if config.rules.len() > MAX_RULES {
        return Err(S3ServiceError::invalid_argument(format!(
            "at most {MAX_RULES} lifecycle rules are allowed"
        )));
    }
    let mut ids = HashSet::new();
    for rule in &config.rules {
        if let Some(id) = &rule.id {
            if id.len() > MAX_RULE_ID_LEN {
                return Err(S3ServiceError::invalid_argument("lifecycle rule id is too long"));
            }
            if !ids.insert(id.as_str()) {
                return Err(S3ServiceError::invalid_argument(format!(
                    "duplicate lifecycle rule id: {id}"
                )));
            }
        }
        if rule.prefix.is_some() && rule.filter.is_some() {
            return Err(malformed("rule may not set both Prefix and Filter"));
        }
        validate_actions(rule)?;
    }
    Ok(())
}

fn validate_actions(rule: &LifecycleRule) -> S3ServiceResult<()> {
    let has_action = !rule.transitions.is_empty()
        || rule.expiration.is_some()
        || !rule.noncurrent_version_transitions.is_empty()
        || rule.noncurrent_version_expiration.is_some()
        || rule.abort_incomplete_multipart_upload_days.is_some();
    if !has_action {
        return Err(malformed("rule has no action"));
    }
    for transition in &rule.transitions {
        if transition.days.is_some() == transition.date.is_some() {
            return Err(malformed("transition needs exactly one of Days or Date"));
        }
        if transition.storage_class == StorageClass::Standard {
            return Err(S3ServiceError::InvalidStorageClass);
        }
    }
    if let Some(expiration) = &rule.expiration {
        let set = usize::from(expiration.days.is_some())
            + usize::from(expiration.date.is_some())
            + usize::from(expiration.expired_object_delete_marker.is_some());
        if set != 1 {
            return Err(malformed(
                "expiration needs exactly one of Days, Date or ExpiredObjectDeleteMarker",
            ));
        }
    }
    let zero_days = rule.transitions.iter().any(|t| t.days == Some(0))
        || rule.expiration.as_ref().is_some_and(|e| e.days == Some(0))
        || rule.noncurrent_version_transitions.iter().any(|t| t.noncurrent_days == 0)
        || rule
            .noncurrent_version_expiration
            .as_ref()
            .is_some_and(|e| e.noncurrent_days == 0)
        || rule.abort_incomplete_multipart_upload_days == Some(0);
    if zero_days {
        return Err(S3ServiceError::invalid_argument("lifecycle days must be positive"));
    }
    if rule
        .noncurrent_version_transitions
        .iter()
        .any(|t| t.storage_class == StorageClass::Standard)
    {
        return Err(S3ServiceError::InvalidStorageClass);
    }
    Ok(())
}

fn rule_matches(rule: &LifecycleRule, key: &str, tags: &[Tag]) -> bool {
    if rule.status != RuleStatus::Enabled {
        return false;
    }
    if let Some(prefix) = &rule.prefix
        && !key.starts_with(prefix.as_str())
    {
        return false;
    }
    match &rule.filter {
        Some(filter) => {
            filter.prefix.as_deref().is_none_or(|p| key.starts_with(p))
                && filter.tags.iter().all(|t| tags.contains(t))
        }
        None => true,
    }
}

fn age_days(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - since).num_days()
}

/// Decide the action for one object version at `now`.
///
/// Expiration takes priority over transitions. Among transitions the one
/// with the greatest `days` not exceeding the object's age wins, provided it
/// moves the object to a different tier.
#[must_use]
pub fn evaluate(
    config: &LifecycleConfiguration,
    subject: &LifecycleSubject<'_>,
    now: DateTime<Utc>,
) -> LifecycleAction {
    let age = age_days(subject.last_modified, now);
    let mut best_transition: Option<(i64, StorageClass)> = None;

    for rule in config
        .rules
        .iter()
        .filter(|r| rule_matches(r, subject.key, subject.tags))
    {
        if subject.is_latest {
            if let Some(expiration) = &rule.expiration {
                let by_days = expiration.days.is_some_and(|d| age >= i64::from(d));
                let by_date = expiration.date.is_some_and(|d| now >= d);
                if by_days || by_date {
                    return LifecycleAction::Expire;
                }
            }
            for transition in &rule.transitions {
                if transition.storage_class == subject.storage_class {
                    continue;
                }
                let due = match (transition.days, transition.date) {
                    (Some(days), _) if age >= i64::from(days) => Some(i64::from(days)),
                    (None, Some(date)) if now >= date => Some(age_days(date, now).min(age)),
                    _ => None,
                };
                if let Some(days) = due
                    && best_transition.is_none_or(|(best, _)| days > best)
                {
                    best_transition = Some((days, transition.storage_class));
                }
            }
        } else {
            if let Some(expiration) = &rule.noncurrent_version_expiration
                && age >= i64::from(expiration.noncurrent_days)
            {
                return LifecycleAction::ExpireNoncurrent;
            }
            for transition in &rule.noncurrent_version_transitions {
                let days = i64::from(transition.noncurrent_days);
                if transition.storage_class != subject.storage_class
                    && age >= days
                    && best_transition.is_none_or(|(best, _)| days > best)
                {
                    best_transition = Some((days, transition.storage_class));
                }
            }
        }
    }

    match best_transition {
        Some((_, class)) if subject.is_latest => LifecycleAction::Transition(class),
        Some((_, class)) => LifecycleAction::TransitionNoncurrent(class),
        None => LifecycleAction::None,
    }
}

/// Whether an incomplete upload of `key` initiated at `initiated` is due for
/// abort at `now`.
#[must_use]
pub fn should_abort_upload(
    config: &LifecycleConfiguration,
    key: &str,
    initiated: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    let age = age_days(initiated, now);
    config.rules.iter().any(|rule| {
        rule_matches(rule, key, &[])
            && rule
                .abort_incomplete_multipart_upload_days
                .is_some_and(|days| age >= i64::from(days))
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use ferrogate_s3_model::types::{
        Expiration, LifecycleFilter, NoncurrentVersionExpiration, Transition,
    };

    use super::*;

    fn subject(key: &str, age_days: i64, is_latest: bool) -> LifecycleSubject<'_> {
        LifecycleSubject {
            key,
            tags: &[],
            last_modified: Utc::now() - Duration::days(age_days),
            is_latest,
            storage_class: StorageClass::Standard,
        }
    }

    fn tiering_rule() -> LifecycleRule {
        LifecycleRule {
            id: Some("tiering".to_owned()),
            filter: Some(LifecycleFilter {
                prefix: Some("logs/".to_owned()),
                tags: Vec::new(),
            }),
            transitions: vec![
                Transition {
                    days: Some(30),
                    date: None,
                    storage_class: StorageClass::StandardIa,
                },
                Transition {
                    days: Some(90),
                    date: None,
                    storage_class: StorageClass::Glacier,
                },
            ],
            expiration: Some(Expiration {
                days: Some(365),
                ..Expiration::default()
            }),
            ..LifecycleRule::default()
        }
    }

    #[test]
    fn test_should_pick_greatest_due_transition() {
        let config = LifecycleConfiguration {
            rules: vec![tiering_rule()],
        };
        let now = Utc::now();
        assert_eq!(evaluate(&config, &subject("logs/a", 10, true), now), LifecycleAction::None);
        assert_eq!(
            evaluate(&config, &subject("logs/a", 45, true), now),
            LifecycleAction::Transition(StorageClass::StandardIa)
        );
        assert_eq!(
            evaluate(&config, &subject("logs/a", 120, true), now),
            LifecycleAction::Transition(StorageClass::Glacier)
        );
        assert_eq!(evaluate(&config, &subject("logs/a", 400, true), now), LifecycleAction::Expire);
        assert_eq!(evaluate(&config, &subject("data/a", 400, true), now), LifecycleAction::None);
    }

    #[test]
    fn test_should_skip_transition_to_current_class() {
        let config = LifecycleConfiguration {
            rules: vec![tiering_rule()],
        };
        let mut glacier = subject("logs/a", 120, true);
        glacier.storage_class = StorageClass::Glacier;
        assert_eq!(
            evaluate(&config, &glacier, Utc::now()),
            LifecycleAction::Transition(StorageClass::StandardIa)
        );
    }

    #[test]
    fn test_should_apply_noncurrent_rules_only_to_old_versions() {
        let config = LifecycleConfiguration {
            rules: vec![LifecycleRule {
                noncurrent_version_expiration: Some(NoncurrentVersionExpiration { noncurrent_days: 7 }),
                ..LifecycleRule::default()
            }],
        };
        let now = Utc::now();
        assert_eq!(evaluate(&config, &subject("k", 10, true), now), LifecycleAction::None);
        assert_eq!(
            evaluate(&config, &subject("k", 10, false), now),
            LifecycleAction::ExpireNoncurrent
        );
    }

    #[test]
    fn test_should_ignore_disabled_rules() {
        let mut rule = tiering_rule();
        rule.status = RuleStatus::Disabled;
        let config = LifecycleConfiguration { rules: vec![rule] };
        assert_eq!(
            evaluate(&config, &subject("logs/a", 400, true), Utc::now()),
            LifecycleAction::None
        );
    }

    #[test]
    fn test_should_reject_invalid_configurations() {
        assert!(validate(&LifecycleConfiguration::default()).is_err());
        assert!(validate(&LifecycleConfiguration { rules: vec![LifecycleRule::default()] }).is_err());

        let mut to_standard = tiering_rule();
        to_standard.transitions[0].storage_class = StorageClass::Standard;
        assert!(matches!(
            validate(&LifecycleConfiguration { rules: vec![to_standard] }),
            Err(S3ServiceError::InvalidStorageClass)
        ));

        let duplicated = LifecycleConfiguration {
            rules: vec![tiering_rule(), tiering_rule()],
        };
        assert!(validate(&duplicated).is_err());
        assert!(validate(&LifecycleConfiguration { rules: vec![tiering_rule()] }).is_ok());
    }

    #[test]
    fn test_should_abort_stale_uploads() {
        let config = LifecycleConfiguration {
            rules: vec![LifecycleRule {
                abort_incomplete_multipart_upload_days: Some(3),
                ..LifecycleRule::default()
            }],
        };
        let now = Utc::now();
        assert!(should_abort_upload(&config, "k", now - Duration::days(4), now));
        assert!(!should_abort_upload(&config, "k", now - Duration::days(1), now));
    }
}
