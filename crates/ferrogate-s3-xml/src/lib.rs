//! S3 XML serialization/deserialization for Ferrogate.
//!
//! # Key components
//!
//! - [`S3Serialize`] and [`to_xml`] for response bodies
//! - [`S3Deserialize`] and [`from_xml`] for request bodies
//! - [`error_to_xml`] for `<Error>` documents, including extra elements such as
//!   the `ProposedSize`/`MinSizeAllowed` pair of `EntityTooSmall`
//!
//! # S3 XML conventions
//!
//! - Namespace: `http://s3.amazonaws.com/doc/2006-03-01/`
//! - Booleans: lowercase `true`/`false`
//! - Timestamps: ISO 8601 with milliseconds (`2006-02-03T16:45:09.000Z`)
#![allow(clippy::result_large_err)]

pub mod deserialize;
pub mod error;
pub mod serialize;

pub use deserialize::{
    CompleteMultipartUpload, CreateBucketConfiguration, RestoreRequest, S3Deserialize,
    VersioningConfiguration, from_xml,
};
pub use error::{XmlError, error_to_xml};
pub use serialize::{S3_NAMESPACE, S3Serialize, format_timestamp, to_xml};
