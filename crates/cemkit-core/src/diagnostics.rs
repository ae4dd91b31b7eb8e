//! Findings from checking a network before optimisation.
//!
//! Errors block a solve; warnings are logged and the run continues.
//!
//! # Example
//!
//! ```
//! use cemkit_core::diagnostics::{Category, Diagnostics, Severity};
//!
//! let mut diag = Diagnostics::new();
//! diag.warning(Category::Structure, "Network has no loads");
//! diag.error(Category::Profile, "p_max_pu has 3 values for 8 snapshots")
//!     .on("Generator solar");
//!
//! assert_eq!(diag.count(Severity::Warning), 1);
//! assert!(diag.has_errors());
//! ```

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Suspicious data; the model still solves
    Warning,
    /// The model cannot be built from this data
    Error,
}

/// What part of the model an issue concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Missing or disconnected components
    Structure,
    /// Per-snapshot series that do not fit the time axis
    Profile,
    /// Out-of-range attribute values
    Parameter,
    /// Names that point at nothing (e.g. undefined carriers)
    Reference,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Structure => "structure",
            Category::Profile => "profile",
            Category::Parameter => "parameter",
            Category::Reference => "reference",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    pub category: Category,
    pub message: String,
    /// Component the issue is about, e.g. "Generator OCGT"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
}

impl DiagnosticIssue {
    /// Attach the offending component.
    pub fn on(&mut self, component: impl Into<String>) -> &mut Self {
        self.component = Some(component.into());
        self
    }
}

impl fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match &self.component {
            Some(component) => write!(
                f,
                "{} [{}] {}: {}",
                level, self.category, component, self.message
            ),
            None => write!(f, "{} [{}] {}", level, self.category, self.message),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(
        &mut self,
        severity: Severity,
        category: Category,
        message: impl Into<String>,
    ) -> &mut DiagnosticIssue {
        self.issues.push(DiagnosticIssue {
            severity,
            category,
            message: message.into(),
            component: None,
        });
        let last = self.issues.len() - 1;
        &mut self.issues[last]
    }

    pub fn warning(&mut self, category: Category, message: impl Into<String>) -> &mut DiagnosticIssue {
        self.push(Severity::Warning, category, message)
    }

    pub fn error(&mut self, category: Category, message: impl Into<String>) -> &mut DiagnosticIssue {
        self.push(Severity::Error, category, message)
    }

    pub fn issues(&self) -> &[DiagnosticIssue] {
        &self.issues
    }

    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.with_severity(Severity::Warning)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.with_severity(severity).count()
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// e.g. "2 warnings, 1 error"
    pub fn summary(&self) -> String {
        let counted = |n: usize, what: &str| {
            format!("{} {}{}", n, what, if n == 1 { "" } else { "s" })
        };
        let parts: Vec<String> = [
            (self.count(Severity::Warning), "warning"),
            (self.count(Severity::Error), "error"),
        ]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, what)| counted(n, what))
        .collect();
        if parts.is_empty() {
            "no issues".to_string()
        } else {
            parts.join(", ")
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())?;
        for issue in &self.issues {
            write!(f, "\n  {}", issue)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_severity() {
        let mut diag = Diagnostics::new();
        diag.warning(Category::Structure, "no loads");
        diag.error(Category::Profile, "length mismatch");
        diag.warning(Category::Parameter, "zero capital cost")
            .on("Generator wind");

        assert_eq!(diag.count(Severity::Warning), 2);
        assert_eq!(diag.count(Severity::Error), 1);
        assert!(diag.has_errors());
        assert_eq!(
            diag.warnings().filter(|i| i.component.is_some()).count(),
            1
        );
    }

    #[test]
    fn test_issue_names_component() {
        let mut diag = Diagnostics::new();
        diag.error(Category::Reference, "unknown bus 'XX'").on("Load demand");
        assert_eq!(
            diag.issues()[0].to_string(),
            "error [reference] Load demand: unknown bus 'XX'"
        );
    }

    #[test]
    fn test_summary_pluralises() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.summary(), "no issues");
        diag.error(Category::Structure, "no buses");
        assert_eq!(diag.summary(), "1 error");
        diag.warning(Category::Structure, "a");
        diag.warning(Category::Profile, "b");
        assert_eq!(diag.summary(), "2 warnings, 1 error");
    }

    #[test]
    fn test_serializes_as_issue_list() {
        let mut diag = Diagnostics::new();
        diag.warning(Category::Structure, "Network has no loads");
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("\"structure\""));
        assert!(!json.contains("component"));
    }
}
