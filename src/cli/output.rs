//! Output formatting for the vmforge CLI.
//!
//! Colored human-readable output in text mode, raw JSON in json/template
//! mode. Validation reports render as grouped error/warning/recommendation
//! lists.

use colored::Colorize;
use vmforge::generators::ValidationReport;

/// Output formatter for different output modes
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    /// JSON output mode suppresses decorative output
    json_mode: bool,
    /// Verbosity level
    verbosity: u8,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, json_mode: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();

        Self {
            use_color,
            json_mode,
            verbosity,
        }
    }

    /// Print a banner/header
    pub fn banner(&self, title: &str) {
        if self.json_mode {
            return;
        }

        let line = "=".repeat(title.len() + 4);
        if self.use_color {
            println!("\n{}", line.bright_blue());
            println!("{}", format!("  {}  ", title).bright_blue().bold());
            println!("{}\n", line.bright_blue());
        } else {
            println!("\n{}", line);
            println!("  {}  ", title);
            println!("{}\n", line);
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.json_mode {
            return;
        }

        if self.use_color {
            println!("\n{}", title.cyan().bold());
            println!("{}", "-".repeat(title.len()).cyan());
        } else {
            println!("\n{}", title);
            println!("{}", "-".repeat(title.len()));
        }
    }

    /// Print an informational message
    pub fn info(&self, message: &str) {
        if self.json_mode {
            return;
        }
        println!("{}", message);
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.json_mode {
            return;
        }
        if self.use_color {
            println!("{} {}", "ok:".green().bold(), message);
        } else {
            println!("ok: {}", message);
        }
    }

    /// Print a warning message to stderr
    pub fn warning(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "warning:".yellow().bold(), message);
        } else {
            eprintln!("warning: {}", message);
        }
    }

    /// Print an error message to stderr
    pub fn error(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "error:".red().bold(), message);
        } else {
            eprintln!("error: {}", message);
        }
    }

    /// Print a debug message, gated by verbosity
    pub fn debug(&self, message: &str) {
        if self.json_mode || self.verbosity < 2 {
            return;
        }
        if self.use_color {
            println!("{} {}", "debug:".bright_black(), message.bright_black());
        } else {
            println!("debug: {}", message);
        }
    }

    /// Print a JSON value, pretty in text mode, compact otherwise.
    pub fn json(&self, value: &serde_json::Value) {
        let rendered = if self.json_mode {
            serde_json::to_string(value)
        } else {
            serde_json::to_string_pretty(value)
        };
        match rendered {
            Ok(s) => println!("{}", s),
            Err(e) => self.error(&format!("cannot serialize output: {}", e)),
        }
    }

    /// Render a validation report as grouped findings.
    pub fn report(&self, report: &ValidationReport) {
        if self.json_mode {
            return;
        }

        for error in &report.errors {
            self.error(error);
        }
        for warning in &report.warnings {
            self.warning(warning);
        }
        for recommendation in &report.recommendations {
            if self.use_color {
                println!("{} {}", "hint:".cyan(), recommendation);
            } else {
                println!("hint: {}", recommendation);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatter_construction() {
        let formatter = OutputFormatter::new(false, true, 0);
        assert!(!formatter.use_color);
        assert!(formatter.json_mode);
    }

    #[test]
    fn test_report_renders_without_panic() {
        let mut report = ValidationReport::ok();
        report.warn("w");
        report.recommend("r");
        let formatter = OutputFormatter::new(false, false, 0);
        formatter.report(&report);
    }
}
