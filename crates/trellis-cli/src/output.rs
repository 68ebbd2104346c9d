//! Output formatting utilities

use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Pretty,
}

impl OutputFormat {
    pub const NAMES: [&'static str; 3] = ["text", "json", "pretty"];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Serialize `data` as JSON; text output falls back to pretty JSON
pub fn format_json<T: Serialize>(data: &T, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(data)?,
        OutputFormat::Text | OutputFormat::Pretty => serde_json::to_string_pretty(data)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(OutputFormat::parse("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("text"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::parse("table"), None);
    }

    #[test]
    fn test_format_json() {
        let data = serde_json::json!({ "a": 1 });
        assert_eq!(format_json(&data, OutputFormat::Json).unwrap(), "{\"a\":1}");
        assert!(format_json(&data, OutputFormat::Pretty).unwrap().contains('\n'));
    }
}
