use ocrhl_common::{Deadline, verify_arg};

/// Tuning knobs of a `SourceReader`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReaderOptions {
    /// Size of a cached section in bytes.
    pub section_size: usize,
    /// Number of sections a reader keeps in memory.
    pub max_cached_sections: usize,
    /// Section fetches fail with `DeadlineExceeded` once this passes.
    pub deadline: Option<Deadline>,
}

impl SourceReaderOptions {
    pub const DEFAULT_SECTION_SIZE: usize = 8 * 1024;
    pub const DEFAULT_MAX_CACHED_SECTIONS: usize = 10;
    pub const MIN_SECTION_SIZE: usize = 16;

    pub fn with_section_size(mut self, section_size: usize) -> Self {
        self.section_size = section_size;
        self
    }

    pub fn with_max_cached_sections(mut self, max_cached_sections: usize) -> Self {
        self.max_cached_sections = max_cached_sections;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Deadline>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn validate(&self) -> ocrhl_common::Result<()> {
        verify_arg!(
            section_size,
            self.section_size >= Self::MIN_SECTION_SIZE
        );
        verify_arg!(max_cached_sections, self.max_cached_sections >= 1);
        Ok(())
    }
}

impl Default for SourceReaderOptions {
    fn default() -> Self {
        SourceReaderOptions {
            section_size: Self::DEFAULT_SECTION_SIZE,
            max_cached_sections: Self::DEFAULT_MAX_CACHED_SECTIONS,
            deadline: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use ocrhl_common::error::ErrorKind;

    use super::SourceReaderOptions;

    #[test]
    fn test_validate() {
        assert!(SourceReaderOptions::default().validate().is_ok());
        assert!(
            SourceReaderOptions::default()
                .with_section_size(16)
                .with_max_cached_sections(1)
                .validate()
                .is_ok()
        );

        let err = SourceReaderOptions::default()
            .with_section_size(15)
            .validate()
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { name, .. } if name == "section_size"));

        let err = SourceReaderOptions::default()
            .with_max_cached_sections(0)
            .validate()
            .unwrap_err();
        assert!(
            matches!(err.kind(), ErrorKind::InvalidArgument { name, .. } if name == "max_cached_sections")
        );
    }
}
