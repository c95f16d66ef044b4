//! Ordered field records.
//!
//! Field names are never stored on the tag; only the position of each value
//! is. Encoding and decoding must therefore agree on one name list.

use crate::error::{CodecError, Result};

/// Field order of the patient form.
pub const PATIENT_FIELDS: [&str; 8] = [
    "Doctor",
    "Patient Name",
    "Phone",
    "Address",
    "Diagnosis",
    "Past Treatment",
    "Medications",
    "Prescription",
];

/// An ordered sequence of (name, value) pairs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair names with values positionally.
    ///
    /// # Errors
    /// `CodecError::FieldCountMismatch` if the lists differ in length.
    pub fn from_parts<N, V>(names: &[N], values: &[V]) -> Result<Self>
    where
        N: AsRef<str>,
        V: AsRef<str>,
    {
        if names.len() != values.len() {
            return Err(CodecError::FieldCountMismatch {
                names: names.len(),
                values: values.len(),
            }
            .into());
        }

        let fields = names
            .iter()
            .zip(values)
            .map(|(n, v)| (n.as_ref().to_string(), v.as_ref().to_string()))
            .collect();

        Ok(Self { fields })
    }

    /// Append a field at the end.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Value of the first field with this name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fail if any of the named fields is missing or blank.
    pub fn require_non_empty(&self, required: &[&str]) -> Result<()> {
        for &name in required {
            match self.get(name) {
                Some(value) if !value.trim().is_empty() => {}
                _ => {
                    return Err(CodecError::MissingField {
                        field: name.to_string(),
                    }
                    .into())
                }
            }
        }
        Ok(())
    }
}
