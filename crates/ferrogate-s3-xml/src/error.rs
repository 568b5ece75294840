//! XML error type and `<Error>` document formatting.

use std::io;

use ferrogate_s3_model::error::{S3Error, S3ErrorCode};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};

/// Errors that can occur during S3 XML serialization or deserialization.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// An I/O error during XML writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An error from the underlying quick-xml library.
    #[error("XML processing error: {0}")]
    QuickXml(#[from] quick_xml::Error),

    /// An error from quick-xml attribute handling.
    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// A required XML element was missing.
    #[error("missing required XML element: {0}")]
    MissingElement(String),

    /// An unexpected XML element was encountered.
    #[error("unexpected XML element: {0}")]
    UnexpectedElement(String),

    /// An error parsing a value from XML text content.
    #[error("failed to parse value: {0}")]
    ParseError(String),
}

impl From<XmlError> for S3Error {
    fn from(err: XmlError) -> Self {
        S3Error::new(S3ErrorCode::MalformedXML).with_source(err)
    }
}

/// Format an S3 error as an `<Error>` document.
///
/// Extra elements recorded with [`S3Error::with_detail`] are emitted after
/// `<Message>`, in insertion order.
///
/// ```xml
/// <?xml version="1.0" encoding="UTF-8"?>
/// <Error>
///   <Code>EntityTooSmall</Code>
///   <Message>...</Message>
///   <ProposedSize>3145728</ProposedSize>
///   <MinSizeAllowed>5242880</MinSizeAllowed>
///   <Resource>/bucket/key</Resource>
///   <RequestId>...</RequestId>
/// </Error>
/// ```
#[must_use]
pub fn error_to_xml(err: &S3Error, request_id: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);
    if let Err(e) = write_error_xml(&mut buf, err, request_id) {
        tracing::error!(error = %e, "failed to serialize S3 error XML");
        buf.clear();
    }
    buf
}

fn write_error_xml(buf: &mut Vec<u8>, err: &S3Error, request_id: &str) -> io::Result<()> {
    let mut writer = Writer::new(buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    writer.create_element("Error").write_inner_content(|w| {
        w.create_element("Code")
            .write_text_content(BytesText::new(err.code.as_str()))?;
        w.create_element("Message")
            .write_text_content(BytesText::new(&err.message))?;
        for (name, value) in &err.details {
            w.create_element(*name)
                .write_text_content(BytesText::new(value))?;
        }
        if let Some(res) = err.resource.as_deref() {
            w.create_element("Resource")
                .write_text_content(BytesText::new(res))?;
        }
        w.create_element("RequestId")
            .write_text_content(BytesText::new(request_id))?;
        Ok(())
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(err: &S3Error, request_id: &str) -> String {
        String::from_utf8(error_to_xml(err, request_id)).expect("valid UTF-8")
    }

    #[test]
    fn test_should_format_error_with_resource() {
        let err = S3Error::no_such_bucket("/mybucket");
        let xml_str = render(&err, "tx000001");

        assert!(xml_str.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml_str.contains("<Code>NoSuchBucket</Code>"));
        assert!(xml_str.contains("<Message>The specified bucket does not exist</Message>"));
        assert!(xml_str.contains("<Resource>/mybucket</Resource>"));
        assert!(xml_str.contains("<RequestId>tx000001</RequestId>"));
    }

    #[test]
    fn test_should_emit_entity_too_small_details_in_order() {
        let err = S3Error::new(S3ErrorCode::EntityTooSmall)
            .with_detail("ProposedSize", "3145728")
            .with_detail("MinSizeAllowed", "5242880")
            .with_detail("PartNumber", "1")
            .with_detail("PartETag", "abc");
        let xml_str = render(&err, "tx2");

        let proposed = xml_str.find("<ProposedSize>3145728</ProposedSize>");
        let min = xml_str.find("<MinSizeAllowed>5242880</MinSizeAllowed>");
        let part = xml_str.find("<PartNumber>1</PartNumber>");
        assert!(proposed.is_some() && min.is_some() && part.is_some());
        assert!(proposed < min && min < part);
        assert!(xml_str.contains("<PartETag>abc</PartETag>"));
    }

    #[test]
    fn test_should_escape_special_characters() {
        let err = S3Error::invalid_argument("Value must be < 1024 & > 0").with_resource("/my&bucket");
        let xml_str = render(&err, "tx000003");

        assert!(xml_str.contains("Value must be &lt; 1024 &amp; &gt; 0"));
        assert!(xml_str.contains("/my&amp;bucket"));
        assert!(!xml_str.contains("<ProposedSize>"));
    }
}
