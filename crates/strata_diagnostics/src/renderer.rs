//! Diagnostic rendering backends.

use crate::diagnostic::Diagnostic;

/// Formats a diagnostic into a string for some output target.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic.
    fn render(&self, diag: &Diagnostic) -> String;

    /// Renders a list of diagnostics, one after another.
    fn render_all(&self, diags: &[Diagnostic]) -> String {
        diags.iter().map(|d| self.render(d)).collect()
    }
}

/// Renders diagnostics in a rustc-like terminal format:
///
/// ```text
/// error[P201]: bb cost drifted: tracked 120.5, recomputed 131.0
///   --> bb_cost
///    = note: relative tolerance 0.01
/// ```
pub struct TerminalRenderer {
    /// Whether to wrap the severity in ANSI color codes.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn severity_text(&self, diag: &Diagnostic) -> String {
        if !self.color {
            return diag.severity.to_string();
        }
        let code = match diag.severity {
            crate::Severity::Error => "31",
            crate::Severity::Warning => "33",
            crate::Severity::Note => "36",
        };
        format!("\x1b[1;{code}m{}\x1b[0m", diag.severity)
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = format!(
            "{}[{}]: {}\n",
            self.severity_text(diag),
            diag.code,
            diag.message
        );
        if let Some(subject) = &diag.subject {
            out.push_str(&format!("  --> {subject}\n"));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Category, DiagnosticCode};

    #[test]
    fn plain_render() {
        let diag = Diagnostic::error(DiagnosticCode::new(Category::Noc, 301), "routing cycle")
            .with_subject("noc")
            .with_note("3 links involved");
        let out = TerminalRenderer::new(false).render(&diag);
        assert_eq!(
            out,
            "error[N301]: routing cycle\n  --> noc\n   = note: 3 links involved\n"
        );
    }

    #[test]
    fn color_render_wraps_severity() {
        let diag = Diagnostic::warning(DiagnosticCode::new(Category::Warning, 2), "w");
        let out = TerminalRenderer::new(true).render(&diag);
        assert!(out.starts_with("\x1b[1;33mwarning\x1b[0m[W002]"));
    }

    #[test]
    fn render_all_concatenates() {
        let a = Diagnostic::note(DiagnosticCode::new(Category::Timing, 1), "a");
        let b = Diagnostic::note(DiagnosticCode::new(Category::Timing, 2), "b");
        let out = TerminalRenderer::new(false).render_all(&[a, b]);
        assert_eq!(out.lines().count(), 2);
    }
}
