//! Input bundle: the validated, immutable record of one report request.

use std::path::Path;

use tracing::debug;

use waterauditor_shared::{AuditError, Result, SampleImage};

/// User-supplied image and context for one report request.
///
/// Only constructible through [`InputBundleBuilder::build`], which enforces
/// that the image is present and every required field is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputBundle {
    image: SampleImage,
    source_type: String,
    usage: String,
    surroundings: String,
    observed_issues: String,
    preferences: Option<String>,
    urgency: Option<String>,
}

impl InputBundle {
    pub fn image(&self) -> &SampleImage {
        &self.image
    }

    /// Where the water comes from (tap, well, river...).
    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    /// What the water is used for (drinking, irrigation...).
    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn surroundings(&self) -> &str {
        &self.surroundings
    }

    pub fn observed_issues(&self) -> &str {
        &self.observed_issues
    }

    pub fn preferences(&self) -> Option<&str> {
        self.preferences.as_deref()
    }

    pub fn urgency(&self) -> Option<&str> {
        self.urgency.as_deref()
    }

    /// Labelled non-image fields, in display order. Optional fields are
    /// included only when set.
    pub fn context_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![
            ("Water Source", self.source_type.as_str()),
            ("Usage", self.usage.as_str()),
            ("Surrounding Area", self.surroundings.as_str()),
            ("Observed Issues", self.observed_issues.as_str()),
        ];
        if let Some(urgency) = &self.urgency {
            fields.push(("Urgency", urgency.as_str()));
        }
        if let Some(preferences) = &self.preferences {
            fields.push(("Preferences", preferences.as_str()));
        }
        fields
    }
}

/// Consuming builder for [`InputBundle`].
#[derive(Debug, Default)]
pub struct InputBundleBuilder {
    image: Option<Vec<u8>>,
    source_type: Option<String>,
    usage: Option<String>,
    surroundings: Option<String>,
    observed_issues: Option<String>,
    preferences: Option<String>,
    urgency: Option<String>,
}

impl InputBundleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw uploaded image bytes.
    pub fn image(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.image = Some(bytes.into());
        self
    }

    /// Read the image from disk. A file that does not exist counts as a
    /// missing image.
    pub fn image_from_path(self, path: &Path) -> Result<Self> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(self.image(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AuditError::missing_input(
                format!("no image found at {}", path.display()),
            )),
            Err(e) => Err(AuditError::io(path, e)),
        }
    }

    pub fn source_type(mut self, value: impl Into<String>) -> Self {
        self.source_type = Some(value.into());
        self
    }

    pub fn usage(mut self, value: impl Into<String>) -> Self {
        self.usage = Some(value.into());
        self
    }

    pub fn surroundings(mut self, value: impl Into<String>) -> Self {
        self.surroundings = Some(value.into());
        self
    }

    pub fn observed_issues(mut self, value: impl Into<String>) -> Self {
        self.observed_issues = Some(value.into());
        self
    }

    pub fn preferences(mut self, value: impl Into<String>) -> Self {
        self.preferences = Some(value.into());
        self
    }

    pub fn urgency(mut self, value: impl Into<String>) -> Self {
        self.urgency = Some(value.into());
        self
    }

    /// Validate and freeze the bundle.
    ///
    /// The image is checked first; an absent or unreadable image fails with
    /// [`AuditError::MissingInput`] before any text field is looked at.
    pub fn build(self) -> Result<InputBundle> {
        let bytes = self
            .image
            .ok_or_else(|| AuditError::missing_input("no image of the water sample was provided"))?;
        let image = SampleImage::from_bytes(bytes)?;

        let bundle = InputBundle {
            image,
            source_type: required("source type", self.source_type)?,
            usage: required("usage", self.usage)?,
            surroundings: required("surroundings", self.surroundings)?,
            observed_issues: required("observed issues", self.observed_issues)?,
            preferences: optional(self.preferences),
            urgency: optional(self.urgency),
        };

        debug!(
            image_kind = ?bundle.image.kind(),
            image_len = bundle.image.bytes().len(),
            source_type = %bundle.source_type,
            usage = %bundle.usage,
            "input bundle built"
        );

        Ok(bundle)
    }
}

fn required(field: &str, value: Option<String>) -> Result<String> {
    optional(value).ok_or_else(|| AuditError::missing_input(format!("{field} must not be empty")))
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
