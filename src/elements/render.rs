//! Render formats an element can be asked for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BoardError;

/// Output representation requested from [`ViewElement::render`](crate::elements::ViewElement::render).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    Json,
    Text,
    Html,
}

impl RenderFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderFormat::Json => "json",
            RenderFormat::Text => "text",
            RenderFormat::Html => "html",
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderFormat {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(RenderFormat::Json),
            "text" => Ok(RenderFormat::Text),
            "html" => Ok(RenderFormat::Html),
            _ => Err(BoardError::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        assert_eq!("JSON".parse::<RenderFormat>().unwrap(), RenderFormat::Json);
        assert_eq!("text".parse::<RenderFormat>().unwrap(), RenderFormat::Text);
        assert!(matches!(
            "pdf".parse::<RenderFormat>(),
            Err(BoardError::UnsupportedFormat { .. })
        ));
    }
}
