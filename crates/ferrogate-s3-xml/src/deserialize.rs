//! S3 XML deserialization: request bodies.
//!
//! The root element is consumed by [`from_xml`]; each [`S3Deserialize`]
//! implementation reads its children until the matching end tag. Unknown
//! elements are skipped.

use std::str::FromStr;

use ferrogate_s3_model::types::{
    AccessControlPolicy, BucketVersioningStatus, CompletedPart, CorsConfiguration, CorsRule,
    Delete, Expiration, Grant, Grantee, LifecycleConfiguration, LifecycleFilter, LifecycleRule,
    LoggingStatus, NoncurrentVersionExpiration, NoncurrentVersionTransition, ObjectIdentifier,
    Owner, Permission, Redirect, RedirectAllRequestsTo, RoutingCondition, RoutingRule,
    RuleStatus, ServerSideEncryption, ServerSideEncryptionConfiguration, StorageClass, Tag,
    Transition, WebsiteConfiguration,
};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::XmlError;

/// Trait for deserializing S3 types from XML.
///
/// The reader is positioned just after the opening tag of this element.
pub trait S3Deserialize: Sized {
    /// Deserialize an instance from the given XML reader.
    ///
    /// # Errors
    ///
    /// Returns `XmlError` if the XML is malformed or required fields are missing.
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError>;
}

/// Deserialize S3-compatible XML into a typed value.
///
/// # Errors
///
/// Returns `XmlError` if the XML is malformed or deserialization fails.
pub fn from_xml<T: S3Deserialize>(xml: &[u8]) -> Result<T, XmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Start(_) => return T::deserialize_xml(&mut reader),
            Event::Empty(_) => {
                // `<Root/>` carries no children; parse an equivalent open/close pair.
                let mut empty = Reader::from_reader(&b"<x></x>"[..]);
                empty.read_event()?;
                return T::deserialize_xml(&mut empty);
            }
            Event::Eof => return Err(XmlError::MissingElement("root element".to_string())),
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Walk the children of the current element.
///
/// `on_child` receives the local tag name and start event of every child and
/// must consume that child completely.
fn read_children<F>(
    reader: &mut Reader<&[u8]>,
    context: &str,
    mut on_child: F,
) -> Result<(), XmlError>
where
    F: FnMut(&mut Reader<&[u8]>, &str, &BytesStart<'_>) -> Result<(), XmlError>,
{
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let tag = std::str::from_utf8(e.local_name().as_ref())
                    .map_err(|err| XmlError::ParseError(err.to_string()))?
                    .to_owned();
                on_child(reader, &tag, &e)?;
            }
            Event::End(_) => return Ok(()),
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(format!(
                    "unexpected EOF in {context}"
                )));
            }
            _ => {}
        }
    }
}

/// Read the text content of the current element and consume its end tag.
fn read_text_content(reader: &mut Reader<&[u8]>) -> Result<String, XmlError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let decoded = e
                    .decode()
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                let unescaped = quick_xml::escape::unescape(&decoded)
                    .map_err(|err| XmlError::ParseError(err.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::CData(e) => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Event::End(_) => return Ok(text),
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while reading text content".to_string(),
                ));
            }
            _ => {}
        }
    }
}

/// Skip over an element and all its children.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), XmlError> {
    let mut depth: u32 = 1;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(XmlError::UnexpectedElement(
                    "unexpected EOF while skipping element".to_string(),
                ));
            }
            _ => {}
        }
    }
}

fn parse_bool(s: &str) -> Result<bool, XmlError> {
    match s {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(XmlError::ParseError(format!("invalid boolean: {s}"))),
    }
}

fn parse_number<N>(s: &str) -> Result<N, XmlError>
where
    N: FromStr,
    N::Err: std::fmt::Display,
{
    s.trim()
        .parse::<N>()
        .map_err(|e| XmlError::ParseError(format!("invalid number '{s}': {e}")))
}

fn parse_timestamp(s: &str) -> Result<chrono::DateTime<chrono::Utc>, XmlError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ")
                .map(|ndt| ndt.and_utc())
        })
        .map_err(|e| XmlError::ParseError(format!("invalid timestamp '{s}': {e}")))
}

fn parse_storage_class(s: &str) -> Result<StorageClass, XmlError> {
    StorageClass::parse(s).ok_or_else(|| XmlError::ParseError(format!("invalid storage class: {s}")))
}

fn read_string_element(
    reader: &mut Reader<&[u8]>,
    context: &str,
    wanted: &str,
) -> Result<Option<String>, XmlError> {
    let mut value = None;
    read_children(reader, context, |r, tag, _| {
        if tag == wanted {
            value = Some(read_text_content(r)?);
            Ok(())
        } else {
            skip_element(r)
        }
    })?;
    Ok(value)
}

// ---------------------------------------------------------------------------
// Request wrapper documents
// ---------------------------------------------------------------------------

/// Body of CreateBucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateBucketConfiguration {
    /// Requested region.
    pub location_constraint: Option<String>,
}

impl S3Deserialize for CreateBucketConfiguration {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let location_constraint =
            read_string_element(reader, "CreateBucketConfiguration", "LocationConstraint")?;
        Ok(Self {
            location_constraint: location_constraint.filter(|l| !l.is_empty()),
        })
    }
}

/// Body of PutBucketVersioning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersioningConfiguration {
    /// Requested state.
    pub status: Option<BucketVersioningStatus>,
}

impl S3Deserialize for VersioningConfiguration {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let status = read_string_element(reader, "VersioningConfiguration", "Status")?
            .map(|s| {
                BucketVersioningStatus::parse(&s)
                    .ok_or_else(|| XmlError::ParseError(format!("invalid versioning status: {s}")))
            })
            .transpose()?;
        Ok(Self { status })
    }
}

/// Body of RestoreObject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreRequest {
    /// Lifetime of the restored copy.
    pub days: u32,
}

impl S3Deserialize for RestoreRequest {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let days = read_string_element(reader, "RestoreRequest", "Days")?
            .ok_or_else(|| XmlError::MissingElement("Days".to_string()))?;
        Ok(Self {
            days: parse_number(&days)?,
        })
    }
}

/// Body of CompleteMultipartUpload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompleteMultipartUpload {
    /// Parts in request order.
    pub parts: Vec<CompletedPart>,
}

impl S3Deserialize for CompleteMultipartUpload {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut parts = Vec::new();
        read_children(reader, "CompleteMultipartUpload", |r, tag, _| match tag {
            "Part" => {
                let mut part = CompletedPart::default();
                let mut number = None;
                read_children(r, "Part", |r, tag, _| {
                    match tag {
                        "PartNumber" => number = Some(parse_number(&read_text_content(r)?)?),
                        "ETag" => part.etag = read_text_content(r)?,
                        _ => skip_element(r)?,
                    }
                    Ok(())
                })?;
                part.part_number =
                    number.ok_or_else(|| XmlError::MissingElement("PartNumber".to_string()))?;
                parts.push(part);
                Ok(())
            }
            _ => skip_element(r),
        })?;
        Ok(Self { parts })
    }
}

// ---------------------------------------------------------------------------
// ACL
// ---------------------------------------------------------------------------

impl S3Deserialize for Owner {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut owner = Owner::default();
        read_children(reader, "Owner", |r, tag, _| {
            match tag {
                "ID" => owner.id = read_text_content(r)?,
                "DisplayName" => owner.display_name = read_text_content(r)?,
                _ => skip_element(r)?,
            }
            Ok(())
        })?;
        Ok(owner)
    }
}

fn read_grantee(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<Grantee, XmlError> {
    let declared = match start.try_get_attribute("xsi:type")? {
        Some(attr) => Some(String::from_utf8_lossy(&attr.value).into_owned()),
        None => None,
    };

    let mut id = None;
    let mut display_name = String::new();
    let mut uri = None;
    let mut email = None;
    read_children(reader, "Grantee", |r, tag, _| {
        match tag {
            "ID" => id = Some(read_text_content(r)?),
            "DisplayName" => display_name = read_text_content(r)?,
            "URI" => uri = Some(read_text_content(r)?),
            "EmailAddress" => email = Some(read_text_content(r)?),
            _ => skip_element(r)?,
        }
        Ok(())
    })?;

    let missing = |what: &str| XmlError::MissingElement(format!("Grantee {what}"));
    match declared.as_deref() {
        Some("CanonicalUser") => Ok(Grantee::CanonicalUser {
            id: id.ok_or_else(|| missing("ID"))?,
            display_name,
        }),
        Some("Group") => Ok(Grantee::Group {
            uri: uri.ok_or_else(|| missing("URI"))?,
        }),
        Some("AmazonCustomerByEmail") => Ok(Grantee::Email {
            email: email.ok_or_else(|| missing("EmailAddress"))?,
        }),
        Some(other) => Err(XmlError::ParseError(format!("invalid grantee type: {other}"))),
        None => match (id, uri, email) {
            (Some(id), _, _) => Ok(Grantee::CanonicalUser { id, display_name }),
            (None, Some(uri), _) => Ok(Grantee::Group { uri }),
            (None, None, Some(email)) => Ok(Grantee::Email { email }),
            (None, None, None) => Err(missing("identity")),
        },
    }
}

impl S3Deserialize for Grant {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut grantee = None;
        let mut permission = None;
        read_children(reader, "Grant", |r, tag, start| {
            match tag {
                "Grantee" => grantee = Some(read_grantee(r, start)?),
                "Permission" => {
                    let text = read_text_content(r)?;
                    permission = Some(Permission::parse(&text).ok_or_else(|| {
                        XmlError::ParseError(format!("invalid permission: {text}"))
                    })?);
                }
                _ => skip_element(r)?,
            }
            Ok(())
        })?;
        Ok(Grant {
            grantee: grantee.ok_or_else(|| XmlError::MissingElement("Grantee".to_string()))?,
            permission: permission
                .ok_or_else(|| XmlError::MissingElement("Permission".to_string()))?,
        })
    }
}

impl S3Deserialize for AccessControlPolicy {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut policy = AccessControlPolicy::default();
        read_children(reader, "AccessControlPolicy", |r, tag, _| {
            match tag {
                "Owner" => policy.owner = Owner::deserialize_xml(r)?,
                "AccessControlList" => read_children(r, "AccessControlList", |r, tag, _| {
                    if tag == "Grant" {
                        policy.grants.push(Grant::deserialize_xml(r)?);
                        Ok(())
                    } else {
                        skip_element(r)
                    }
                })?,
                _ => skip_element(r)?,
            }
            Ok(())
        })?;
        Ok(policy)
    }
}

// ---------------------------------------------------------------------------
// Bucket sub-resources
// ---------------------------------------------------------------------------

impl S3Deserialize for CorsRule {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut rule = CorsRule::default();
        read_children(reader, "CORSRule", |r, tag, _| {
            match tag {
                "ID" => rule.id = Some(read_text_content(r)?),
                "AllowedOrigin" => rule.allowed_origins.push(read_text_content(r)?),
                "AllowedMethod" => rule.allowed_methods.push(read_text_content(r)?),
                "AllowedHeader" => rule.allowed_headers.push(read_text_content(r)?),
                "ExposeHeader" => rule.expose_headers.push(read_text_content(r)?),
                "MaxAgeSeconds" => {
                    rule.max_age_seconds = Some(parse_number(&read_text_content(r)?)?);
                }
                _ => skip_element(r)?,
            }
            Ok(())
        })?;
        Ok(rule)
    }
}

impl S3Deserialize for CorsConfiguration {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut config = CorsConfiguration::default();
        read_children(reader, "CORSConfiguration", |r, tag, _| {
            if tag == "CORSRule" {
                config.rules.push(CorsRule::deserialize_xml(r)?);
                Ok(())
            } else {
                skip_element(r)
            }
        })?;
        Ok(config)
    }
}

impl S3Deserialize for Tag {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut t = Tag::default();
        read_children(reader, "Tag", |r, tag, _| {
            match tag {
                "Key" => t.key = read_text_content(r)?,
                "Value" => t.value = read_text_content(r)?,
                _ => skip_element(r)?,
            }
            Ok(())
        })?;
        Ok(t)
    }
}

fn read_lifecycle_filter(reader: &mut Reader<&[u8]>) -> Result<LifecycleFilter, XmlError> {
    let mut filter = LifecycleFilter::default();
    read_children(reader, "Filter", |r, tag, _| {
        match tag {
            "Prefix" => filter.prefix = Some(read_text_content(r)?),
            "Tag" => filter.tags.push(Tag::deserialize_xml(r)?),
            "And" => read_children(r, "And", |r, tag, _| {
                match tag {
                    "Prefix" => filter.prefix = Some(read_text_content(r)?),
                    "Tag" => filter.tags.push(Tag::deserialize_xml(r)?),
                    _ => skip_element(r)?,
                }
                Ok(())
            })?,
            _ => skip_element(r)?,
        }
        Ok(())
    })?;
    Ok(filter)
}

fn read_transition(reader: &mut Reader<&[u8]>) -> Result<Transition, XmlError> {
    let mut days = None;
    let mut date = None;
    let mut storage_class = None;
    read_children(reader, "Transition", |r, tag, _| {
        match tag {
            "Days" => days = Some(parse_number(&read_text_content(r)?)?),
            "Date" => date = Some(parse_timestamp(&read_text_content(r)?)?),
            "StorageClass" => storage_class = Some(parse_storage_class(&read_text_content(r)?)?),
            _ => skip_element(r)?,
        }
        Ok(())
    })?;
    Ok(Transition {
        days,
        date,
        storage_class: storage_class
            .ok_or_else(|| XmlError::MissingElement("Transition StorageClass".to_string()))?,
    })
}

fn read_noncurrent_days(reader: &mut Reader<&[u8]>, context: &str) -> Result<u32, XmlError> {
    let days = read_string_element(reader, context, "NoncurrentDays")?
        .ok_or_else(|| XmlError::MissingElement(format!("{context} NoncurrentDays")))?;
    parse_number(&days)
}

impl S3Deserialize for LifecycleRule {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut rule = LifecycleRule::default();
        let mut status = None;
        read_children(reader, "Rule", |r, tag, _| {
            match tag {
                "ID" => rule.id = Some(read_text_content(r)?),
                "Prefix" => rule.prefix = Some(read_text_content(r)?),
                "Filter" => rule.filter = Some(read_lifecycle_filter(r)?),
                "Status" => {
                    let text = read_text_content(r)?;
                    status = Some(RuleStatus::parse(&text).ok_or_else(|| {
                        XmlError::ParseError(format!("invalid rule status: {text}"))
                    })?);
                }
                "Transition" => rule.transitions.push(read_transition(r)?),
                "Expiration" => {
                    let mut exp = Expiration::default();
                    read_children(r, "Expiration", |r, tag, _| {
                        match tag {
                            "Days" => exp.days = Some(parse_number(&read_text_content(r)?)?),
                            "Date" => exp.date = Some(parse_timestamp(&read_text_content(r)?)?),
                            "ExpiredObjectDeleteMarker" => {
                                exp.expired_object_delete_marker =
                                    Some(parse_bool(&read_text_content(r)?)?);
                            }
                            _ => skip_element(r)?,
                        }
                        Ok(())
                    })?;
                    rule.expiration = Some(exp);
                }
                "NoncurrentVersionTransition" => {
                    let mut noncurrent_days = None;
                    let mut storage_class = None;
                    read_children(r, "NoncurrentVersionTransition", |r, tag, _| {
                        match tag {
                            "NoncurrentDays" => {
                                noncurrent_days = Some(parse_number(&read_text_content(r)?)?);
                            }
                            "StorageClass" => {
                                storage_class = Some(parse_storage_class(&read_text_content(r)?)?);
                            }
                            _ => skip_element(r)?,
                        }
                        Ok(())
                    })?;
                    rule.noncurrent_version_transitions
                        .push(NoncurrentVersionTransition {
                            noncurrent_days: noncurrent_days.ok_or_else(|| {
                                XmlError::MissingElement("NoncurrentDays".to_string())
                            })?,
                            storage_class: storage_class.ok_or_else(|| {
                                XmlError::MissingElement("StorageClass".to_string())
                            })?,
                        });
                }
                "NoncurrentVersionExpiration" => {
                    rule.noncurrent_version_expiration = Some(NoncurrentVersionExpiration {
                        noncurrent_days: read_noncurrent_days(r, "NoncurrentVersionExpiration")?,
                    });
                }
                "AbortIncompleteMultipartUpload" => {
                    if let Some(days) =
                        read_string_element(r, "AbortIncompleteMultipartUpload", "DaysAfterInitiation")?
                    {
                        rule.abort_incomplete_multipart_upload_days = Some(parse_number(&days)?);
                    }
                }
                _ => skip_element(r)?,
            }
            Ok(())
        })?;
        rule.status = status.ok_or_else(|| XmlError::MissingElement("Rule Status".to_string()))?;
        Ok(rule)
    }
}

impl S3Deserialize for LifecycleConfiguration {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut config = LifecycleConfiguration::default();
        read_children(reader, "LifecycleConfiguration", |r, tag, _| {
            if tag == "Rule" {
                config.rules.push(LifecycleRule::deserialize_xml(r)?);
                Ok(())
            } else {
                skip_element(r)
            }
        })?;
        Ok(config)
    }
}

fn read_routing_rule(reader: &mut Reader<&[u8]>) -> Result<RoutingRule, XmlError> {
    let mut rule = RoutingRule::default();
    read_children(reader, "RoutingRule", |r, tag, _| {
        match tag {
            "Condition" => {
                let mut cond = RoutingCondition::default();
                read_children(r, "Condition", |r, tag, _| {
                    match tag {
                        "KeyPrefixEquals" => cond.key_prefix_equals = Some(read_text_content(r)?),
                        "HttpErrorCodeReturnedEquals" => {
                            cond.http_error_code_returned_equals =
                                Some(parse_number(&read_text_content(r)?)?);
                        }
                        _ => skip_element(r)?,
                    }
                    Ok(())
                })?;
                rule.condition = Some(cond);
            }
            "Redirect" => {
                let mut redirect = Redirect::default();
                read_children(r, "Redirect", |r, tag, _| {
                    match tag {
                        "HostName" => redirect.host_name = Some(read_text_content(r)?),
                        "HttpRedirectCode" => {
                            redirect.http_redirect_code =
                                Some(parse_number(&read_text_content(r)?)?);
                        }
                        "Protocol" => redirect.protocol = Some(read_text_content(r)?),
                        "ReplaceKeyPrefixWith" => {
                            redirect.replace_key_prefix_with = Some(read_text_content(r)?);
                        }
                        "ReplaceKeyWith" => redirect.replace_key_with = Some(read_text_content(r)?),
                        _ => skip_element(r)?,
                    }
                    Ok(())
                })?;
                rule.redirect = redirect;
            }
            _ => skip_element(r)?,
        }
        Ok(())
    })?;
    Ok(rule)
}

impl S3Deserialize for WebsiteConfiguration {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut config = WebsiteConfiguration::default();
        read_children(reader, "WebsiteConfiguration", |r, tag, _| {
            match tag {
                "RedirectAllRequestsTo" => {
                    let mut redirect = RedirectAllRequestsTo::default();
                    read_children(r, "RedirectAllRequestsTo", |r, tag, _| {
                        match tag {
                            "HostName" => redirect.host_name = read_text_content(r)?,
                            "Protocol" => redirect.protocol = Some(read_text_content(r)?),
                            _ => skip_element(r)?,
                        }
                        Ok(())
                    })?;
                    config.redirect_all_requests_to = Some(redirect);
                }
                "IndexDocument" => {
                    config.index_document_suffix =
                        read_string_element(r, "IndexDocument", "Suffix")?;
                }
                "ErrorDocument" => {
                    config.error_document_key = read_string_element(r, "ErrorDocument", "Key")?;
                }
                "RoutingRules" => read_children(r, "RoutingRules", |r, tag, _| {
                    if tag == "RoutingRule" {
                        config.routing_rules.push(read_routing_rule(r)?);
                        Ok(())
                    } else {
                        skip_element(r)
                    }
                })?,
                _ => skip_element(r)?,
            }
            Ok(())
        })?;
        Ok(config)
    }
}

impl S3Deserialize for ServerSideEncryptionConfiguration {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut algorithm = None;
        let mut kms_master_key_id = None;
        read_children(reader, "ServerSideEncryptionConfiguration", |r, tag, _| {
            if tag != "Rule" {
                return skip_element(r);
            }
            read_children(r, "Rule", |r, tag, _| {
                if tag != "ApplyServerSideEncryptionByDefault" {
                    return skip_element(r);
                }
                read_children(r, "ApplyServerSideEncryptionByDefault", |r, tag, _| {
                    match tag {
                        "SSEAlgorithm" => {
                            let text = read_text_content(r)?;
                            algorithm = Some(ServerSideEncryption::parse(&text).ok_or_else(
                                || XmlError::ParseError(format!("invalid SSE algorithm: {text}")),
                            )?);
                        }
                        "KMSMasterKeyID" => kms_master_key_id = Some(read_text_content(r)?),
                        _ => skip_element(r)?,
                    }
                    Ok(())
                })
            })
        })?;
        Ok(Self {
            sse_algorithm: algorithm
                .ok_or_else(|| XmlError::MissingElement("SSEAlgorithm".to_string()))?,
            kms_master_key_id,
        })
    }
}

impl S3Deserialize for LoggingStatus {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut status = LoggingStatus::default();
        read_children(reader, "BucketLoggingStatus", |r, tag, _| {
            if tag != "LoggingEnabled" {
                return skip_element(r);
            }
            read_children(r, "LoggingEnabled", |r, tag, _| {
                match tag {
                    "TargetBucket" => status.target_bucket = Some(read_text_content(r)?),
                    "TargetPrefix" => status.target_prefix = Some(read_text_content(r)?),
                    _ => skip_element(r)?,
                }
                Ok(())
            })
        })?;
        Ok(status)
    }
}

impl S3Deserialize for Delete {
    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut delete = Delete::default();
        read_children(reader, "Delete", |r, tag, _| {
            match tag {
                "Quiet" => delete.quiet = parse_bool(&read_text_content(r)?)?,
                "Object" => {
                    let mut object = ObjectIdentifier::default();
                    read_children(r, "Object", |r, tag, _| {
                        match tag {
                            "Key" => object.key = read_text_content(r)?,
                            "VersionId" => object.version_id = Some(read_text_content(r)?),
                            _ => skip_element(r)?,
                        }
                        Ok(())
                    })?;
                    delete.objects.push(object);
                }
                _ => skip_element(r)?,
            }
            Ok(())
        })?;
        Ok(delete)
    }
}

#[cfg(test)]
mod tests {
    use ferrogate_s3_model::types::ALL_USERS_URI;

    use super::*;

    #[test]
    fn test_should_parse_complete_multipart_upload() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<CompleteMultipartUpload xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Part><PartNumber>1</PartNumber><ETag>"a54357aff0632cce46d942af68356b38"</ETag></Part>
  <Part><PartNumber>2</PartNumber><ETag>"0c78aef83f66abc1fa1e8477f296d394"</ETag></Part>
</CompleteMultipartUpload>"#;
        let parsed: CompleteMultipartUpload = from_xml(xml).unwrap();
        assert_eq!(parsed.parts.len(), 2);
        assert_eq!(parsed.parts[1].part_number, 2);
        assert_eq!(parsed.parts[0].etag, "\"a54357aff0632cce46d942af68356b38\"");
    }

    #[test]
    fn test_should_reject_part_without_number() {
        let xml = b"<CompleteMultipartUpload><Part><ETag>x</ETag></Part></CompleteMultipartUpload>";
        let result: Result<CompleteMultipartUpload, _> = from_xml(xml);
        assert!(matches!(result, Err(XmlError::MissingElement(_))));
    }

    #[test]
    fn test_should_parse_acl_with_typed_and_inferred_grantees() {
        let xml = br#"<AccessControlPolicy>
  <Owner><ID>owner</ID><DisplayName>o</DisplayName></Owner>
  <AccessControlList>
    <Grant>
      <Grantee xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="Group">
        <URI>http://acs.amazonaws.com/groups/global/AllUsers</URI>
      </Grantee>
      <Permission>READ</Permission>
    </Grant>
    <Grant>
      <Grantee><ID>bob</ID></Grantee>
      <Permission>FULL_CONTROL</Permission>
    </Grant>
  </AccessControlList>
</AccessControlPolicy>"#;
        let acp: AccessControlPolicy = from_xml(xml).unwrap();
        assert_eq!(acp.owner.id, "owner");
        assert_eq!(
            acp.grants[0].grantee,
            Grantee::Group {
                uri: ALL_USERS_URI.to_string()
            }
        );
        assert_eq!(acp.grants[1].permission, Permission::FullControl);
        assert!(matches!(&acp.grants[1].grantee, Grantee::CanonicalUser { id, .. } if id == "bob"));
    }

    #[test]
    fn test_should_reject_unknown_permission() {
        let xml = b"<AccessControlPolicy><AccessControlList><Grant><Grantee><ID>a</ID></Grantee>\
<Permission>EVERYTHING</Permission></Grant></AccessControlList></AccessControlPolicy>";
        let result: Result<AccessControlPolicy, _> = from_xml(xml);
        assert!(matches!(result, Err(XmlError::ParseError(_))));
    }

    #[test]
    fn test_should_parse_lifecycle_with_and_filter() {
        let xml = br#"<LifecycleConfiguration>
  <Rule>
    <ID>logs</ID>
    <Filter><And><Prefix>logs/</Prefix><Tag><Key>k</Key><Value>v</Value></Tag></And></Filter>
    <Status>Enabled</Status>
    <Transition><Days>30</Days><StorageClass>GLACIER</StorageClass></Transition>
    <Expiration><Days>365</Days></Expiration>
    <NoncurrentVersionExpiration><NoncurrentDays>7</NoncurrentDays></NoncurrentVersionExpiration>
    <AbortIncompleteMultipartUpload><DaysAfterInitiation>2</DaysAfterInitiation></AbortIncompleteMultipartUpload>
  </Rule>
</LifecycleConfiguration>"#;
        let config: LifecycleConfiguration = from_xml(xml).unwrap();
        let rule = &config.rules[0];
        let filter = rule.filter.as_ref().unwrap();
        assert_eq!(filter.prefix.as_deref(), Some("logs/"));
        assert_eq!(filter.tags[0].key, "k");
        assert_eq!(rule.transitions[0].storage_class, StorageClass::Glacier);
        assert_eq!(rule.expiration.as_ref().unwrap().days, Some(365));
        assert_eq!(rule.noncurrent_version_expiration.as_ref().unwrap().noncurrent_days, 7);
        assert_eq!(rule.abort_incomplete_multipart_upload_days, Some(2));
    }

    #[test]
    fn test_should_require_rule_status() {
        let xml = b"<LifecycleConfiguration><Rule><Prefix>a</Prefix></Rule></LifecycleConfiguration>";
        let result: Result<LifecycleConfiguration, _> = from_xml(xml);
        assert!(result.is_err());
    }

    #[test]
    fn test_should_parse_website_with_routing_rules() {
        let xml = br#"<WebsiteConfiguration>
  <IndexDocument><Suffix>index.html</Suffix></IndexDocument>
  <ErrorDocument><Key>error.html</Key></ErrorDocument>
  <RoutingRules>
    <RoutingRule>
      <Condition><KeyPrefixEquals>docs/</KeyPrefixEquals></Condition>
      <Redirect><ReplaceKeyPrefixWith>documents/</ReplaceKeyPrefixWith><HttpRedirectCode>301</HttpRedirectCode></Redirect>
    </RoutingRule>
  </RoutingRules>
</WebsiteConfiguration>"#;
        let config: WebsiteConfiguration = from_xml(xml).unwrap();
        assert_eq!(config.index_document_suffix.as_deref(), Some("index.html"));
        assert_eq!(config.error_document_key.as_deref(), Some("error.html"));
        let rule = &config.routing_rules[0];
        assert_eq!(
            rule.condition.as_ref().unwrap().key_prefix_equals.as_deref(),
            Some("docs/")
        );
        assert_eq!(rule.redirect.http_redirect_code, Some(301));
    }

    #[test]
    fn test_should_parse_encryption_configuration() {
        let xml = b"<ServerSideEncryptionConfiguration><Rule><ApplyServerSideEncryptionByDefault>\
<SSEAlgorithm>aws:kms</SSEAlgorithm><KMSMasterKeyID>key-1</KMSMasterKeyID>\
</ApplyServerSideEncryptionByDefault></Rule></ServerSideEncryptionConfiguration>";
        let config: ServerSideEncryptionConfiguration = from_xml(xml).unwrap();
        assert_eq!(config.sse_algorithm, ServerSideEncryption::AwsKms);
        assert_eq!(config.kms_master_key_id.as_deref(), Some("key-1"));
    }

    #[test]
    fn test_should_parse_delete_request() {
        let xml = b"<Delete><Quiet>true</Quiet><Object><Key>a</Key></Object>\
<Object><Key>b</Key><VersionId>v1</VersionId></Object></Delete>";
        let delete: Delete = from_xml(xml).unwrap();
        assert!(delete.quiet);
        assert_eq!(delete.objects.len(), 2);
        assert_eq!(delete.objects[1].version_id.as_deref(), Some("v1"));
    }

    #[test]
    fn test_should_parse_small_wrapper_documents() {
        let loc: CreateBucketConfiguration = from_xml(
            b"<CreateBucketConfiguration><LocationConstraint>eu-west-1</LocationConstraint></CreateBucketConfiguration>",
        )
        .unwrap();
        assert_eq!(loc.location_constraint.as_deref(), Some("eu-west-1"));

        let ver: VersioningConfiguration =
            from_xml(b"<VersioningConfiguration><Status>Suspended</Status></VersioningConfiguration>")
                .unwrap();
        assert_eq!(ver.status, Some(BucketVersioningStatus::Suspended));

        let restore: RestoreRequest =
            from_xml(b"<RestoreRequest><Days>3</Days></RestoreRequest>").unwrap();
        assert_eq!(restore.days, 3);

        let logging: LoggingStatus = from_xml(b"<BucketLoggingStatus/>").unwrap();
        assert!(logging.target_bucket.is_none());
    }

    #[test]
    fn test_should_parse_cors_rules() {
        let xml = b"<CORSConfiguration><CORSRule><AllowedOrigin>*</AllowedOrigin>\
<AllowedMethod>GET</AllowedMethod><AllowedMethod>PUT</AllowedMethod>\
<MaxAgeSeconds>600</MaxAgeSeconds></CORSRule></CORSConfiguration>";
        let config: CorsConfiguration = from_xml(xml).unwrap();
        assert_eq!(config.rules[0].allowed_methods, vec!["GET", "PUT"]);
        assert_eq!(config.rules[0].max_age_seconds, Some(600));
    }
}
