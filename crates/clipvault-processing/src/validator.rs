/// Pre-flight validation errors for an upload request
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Invalid content type: {content_type} (allowed prefixes: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Empty file")]
    EmptyFile,
}

/// Upload request validator
///
/// Pure decision gate run before any session is created. The declared size
/// is advisory; the streaming loop enforces the same ceiling again against
/// the bytes actually received.
pub struct UploadValidator {
    max_size_bytes: u64,
    allowed_mime_prefixes: Vec<String>,
}

impl UploadValidator {
    pub fn new(max_size_bytes: u64, allowed_mime_prefixes: Vec<String>) -> Self {
        Self {
            max_size_bytes,
            allowed_mime_prefixes,
        }
    }

    /// Validate the declared size against the hard ceiling.
    pub fn validate_declared_size(&self, size: u64) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_size_bytes {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_size_bytes,
            });
        }

        Ok(())
    }

    /// Validate the declared content type against the allowed prefixes.
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = content_type.to_lowercase();

        if !self
            .allowed_mime_prefixes
            .iter()
            .any(|prefix| normalized.starts_with(prefix.as_str()))
        {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_mime_prefixes.clone(),
            });
        }

        Ok(())
    }

    /// Validate everything the gate checks before a session is created.
    pub fn validate(&self, content_type: &str, declared_size: u64) -> Result<(), ValidationError> {
        self.validate_content_type(content_type)?;
        self.validate_declared_size(declared_size)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_validator() -> UploadValidator {
        UploadValidator::new(
            10 * 1024 * 1024, // 10MB
            vec!["video/".to_string()],
        )
    }

    #[test]
    fn test_validate_declared_size_ok() {
        let validator = test_validator();
        assert!(validator.validate_declared_size(5 * 1024 * 1024).is_ok());
        assert!(validator.validate_declared_size(10 * 1024 * 1024).is_ok());
    }

    #[test]
    fn test_validate_declared_size_too_large() {
        let validator = test_validator();
        assert!(matches!(
            validator.validate_declared_size(11 * 1024 * 1024),
            Err(ValidationError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_validate_declared_size_empty() {
        let validator = test_validator();
        assert!(matches!(
            validator.validate_declared_size(0),
            Err(ValidationError::EmptyFile)
        ));
    }

    #[test]
    fn test_validate_content_type_ok() {
        let validator = test_validator();
        assert!(validator.validate_content_type("video/mp4").is_ok());
        assert!(validator.validate_content_type("video/webm").is_ok());
        assert!(validator.validate_content_type("VIDEO/MP4").is_ok()); // case insensitive
    }

    #[test]
    fn test_validate_content_type_rejects_non_video() {
        let validator = test_validator();
        assert!(matches!(
            validator.validate_content_type("image/png"),
            Err(ValidationError::InvalidContentType { .. })
        ));
        assert!(validator.validate_content_type("application/pdf").is_err());
    }

    #[test]
    fn test_validate_content_type_prefix_is_not_substring_match() {
        let validator = test_validator();
        // Prefix must anchor at the start of the media type
        assert!(validator.validate_content_type("application/video/").is_err());
    }

    #[test]
    fn test_multiple_prefixes() {
        let validator = UploadValidator::new(
            1024,
            vec!["video/".to_string(), "application/mp4".to_string()],
        );
        assert!(validator.validate_content_type("video/mp4").is_ok());
        assert!(validator.validate_content_type("application/mp4").is_ok());
        assert!(validator.validate_content_type("audio/mpeg").is_err());
    }

    #[test]
    fn test_validate_all_ok() {
        let validator = test_validator();
        assert!(validator.validate("video/mp4", 1024).is_ok());
    }

    #[test]
    fn test_validate_all_fails_on_size() {
        let validator = test_validator();
        assert!(validator.validate("video/mp4", 11 * 1024 * 1024).is_err());
    }

    #[test]
    fn test_validate_all_fails_on_content_type() {
        let validator = test_validator();
        assert!(validator.validate("image/png", 1024).is_err());
    }
}
