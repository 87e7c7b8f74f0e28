//! One-shot notices shown on the next rendered page.

use rowdesk_core::PanelError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Danger,
    Warning,
    Info,
}

impl FlashLevel {
    /// CSS class the views attach to the notice.
    pub fn css_class(&self) -> &'static str {
        match self {
            FlashLevel::Success => "flash-success",
            FlashLevel::Danger => "flash-danger",
            FlashLevel::Warning => "flash-warning",
            FlashLevel::Info => "flash-info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Success, message)
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Danger, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Info, message)
    }
}

impl From<&PanelError> for Flash {
    fn from(err: &PanelError) -> Self {
        match err {
            PanelError::GatewayUnreachable { .. } => Flash::danger("Remote service unreachable"),
            PanelError::EmptyExportSet { .. } | PanelError::FilterIndexOutOfRange { .. } => {
                Flash::warning(err.to_string())
            }
            _ => Flash::danger(err.to_string()),
        }
    }
}
