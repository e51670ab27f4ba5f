use std::fmt;

#[derive(Debug)]
pub enum DeckFillError {
    TemplateUnreadable(String),
    MissingDetailPage,
    EmptyRuleSet,
    NoRecords,
    InvalidConfiguration(String),
    Serialization(String),
    Io(std::io::Error),
}

impl fmt::Display for DeckFillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeckFillError::TemplateUnreadable(message) => {
                write!(f, "template unreadable: {}", message)
            }
            DeckFillError::MissingDetailPage => {
                write!(f, "template has no detail page to replicate")
            }
            DeckFillError::EmptyRuleSet => write!(f, "mapping rule set is empty"),
            DeckFillError::NoRecords => write!(f, "no records provided for generation"),
            DeckFillError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            DeckFillError::Serialization(message) => {
                write!(f, "serialization failed: {}", message)
            }
            DeckFillError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for DeckFillError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeckFillError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DeckFillError {
    fn from(value: std::io::Error) -> Self {
        DeckFillError::Io(value)
    }
}

/// Non-fatal degradation codes. Everything here is absorbed into the
/// generation report; only the `DeckFillError` variants abort a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarnCode {
    TargetNotFound,
    TargetNotText,
    FormatterFailed,
    CellOutOfBounds,
    ImageFetchFailed,
    ImageInvalid,
    CloneSubstitute,
    RecordFailed,
}

impl WarnCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarnCode::TargetNotFound => "TARGET_NOT_FOUND",
            WarnCode::TargetNotText => "TARGET_NOT_TEXT",
            WarnCode::FormatterFailed => "FORMATTER_FAILED",
            WarnCode::CellOutOfBounds => "CELL_OUT_OF_BOUNDS",
            WarnCode::ImageFetchFailed => "IMAGE_FETCH_FAILED",
            WarnCode::ImageInvalid => "IMAGE_INVALID",
            WarnCode::CloneSubstitute => "CLONE_SUBSTITUTE",
            WarnCode::RecordFailed => "RECORD_FAILED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub code: WarnCode,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub page_count: usize,
    pub record_count: usize,
    pub warnings: Vec<Warning>,
}

impl GenerationReport {
    pub fn warn(&mut self, code: WarnCode, message: impl Into<String>) {
        self.warnings.push(Warning {
            code,
            message: message.into(),
        });
    }

    pub fn count(&self, code: WarnCode) -> usize {
        self.warnings.iter().filter(|w| w.code == code).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_display_includes_code() {
        let mut report = GenerationReport::default();
        report.warn(WarnCode::TargetNotFound, "txt_missing on page 2");
        assert_eq!(
            report.warnings[0].to_string(),
            "TARGET_NOT_FOUND: txt_missing on page 2"
        );
        assert_eq!(report.count(WarnCode::TargetNotFound), 1);
        assert_eq!(report.count(WarnCode::CloneSubstitute), 0);
    }
}
