//! CLI output formatting

use clap::ValueEnum;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text lines
    Plain,
    /// One JSON object per result
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, subsystem: &str, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Plain-text formatter
pub struct PlainFormatter;

impl OutputFormatter for PlainFormatter {
    fn success(&self, message: &str) {
        println!("{message}");
    }
    fn error(&self, subsystem: &str, message: &str) {
        eprintln!("{subsystem}: {message}");
    }
    fn warn(&self, message: &str) {
        eprintln!("warning: {message}");
    }
    fn info(&self, message: &str) {
        println!("{message}");
    }
    fn print_json(&self, _value: &serde_json::Value) {
        // Plain formatter doesn't print JSON
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!("{}", serde_json::json!({"message": message}));
    }
    fn error(&self, subsystem: &str, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"error": format!("{subsystem}: {message}")})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", serde_json::json!({"warning": message}));
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Plain => Box::new(PlainFormatter),
    }
}
