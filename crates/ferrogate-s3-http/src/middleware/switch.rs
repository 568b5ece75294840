//! Operator switch that turns individual operations off.

use std::collections::HashSet;

use ferrogate_s3_model::error::S3Error;
use ferrogate_s3_model::operations::S3Operation;
use tracing::warn;

/// Operations disabled by configuration; they answer `501 NotImplemented`.
#[derive(Debug, Clone, Default)]
pub struct FunctionSwitch {
    disabled: HashSet<S3Operation>,
}

impl FunctionSwitch {
    /// Build from operation names such as `PutBucketWebsite`. Unknown names
    /// are logged and ignored.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let disabled = names
            .into_iter()
            .filter_map(|name| {
                let name = name.as_ref().trim();
                if name.is_empty() {
                    return None;
                }
                let op = S3Operation::from_name(name);
                if op.is_none() {
                    warn!(operation = name, "ignoring unknown operation in disabled list");
                }
                op
            })
            .collect();
        Self { disabled }
    }

    /// Whether `op` is switched off.
    #[must_use]
    pub fn is_disabled(&self, op: S3Operation) -> bool {
        self.disabled.contains(&op)
    }

    /// Let `op` through or reject it.
    ///
    /// # Errors
    ///
    /// `NotImplemented` for a disabled operation.
    pub fn check(&self, op: S3Operation) -> Result<(), S3Error> {
        if self.is_disabled(op) {
            return Err(S3Error::not_implemented(format!(
                "{op} is disabled on this gateway"
            )));
        }
        Ok(())
    }
}
