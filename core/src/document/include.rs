//! `@path` inclusion resolution.
//!
//! Any line whose trimmed content starts with `@` is replaced by the fully
//! resolved content of the named file. Top-level directives resolve against
//! the caller's base directory; directives inside an included file resolve
//! against that file's directory.

use std::path::{Path, PathBuf};

use crate::error::InclusionError;

/// An inclusion that could not be resolved and was degraded to a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeDiagnostic {
    /// Path as written after the `@`.
    pub path: String,
    pub reason: String,
}

pub struct IncludeResolver {
    strict: bool,
    chain: Vec<PathBuf>,
    diagnostics: Vec<IncludeDiagnostic>,
}

impl IncludeResolver {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            chain: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Seed the inclusion chain with the document itself so that a file
    /// including its own parent document is reported as a cycle.
    pub fn with_root(mut self, document: &Path) -> Self {
        self.chain.push(canonical(document));
        self
    }

    pub fn diagnostics(&self) -> &[IncludeDiagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<IncludeDiagnostic> {
        self.diagnostics
    }

    pub fn resolve(&mut self, content: &str, base_dir: &Path) -> Result<String, InclusionError> {
        let mut out: Vec<String> = Vec::new();

        for line in content.split('\n') {
            let trimmed = line.trim();
            let Some(reference) = trimmed.strip_prefix('@') else {
                out.push(line.to_string());
                continue;
            };
            let reference = reference.trim();

            match self.include(reference, base_dir) {
                Ok(text) => out.push(text),
                Err(e) if !self.strict => {
                    let reason = e.reason();
                    tracing::warn!(path = %reference, reason = %reason, "include failed");
                    out.push(format!("# ⚠️ include failed: {reference} ({reason})"));
                    out.push(line.to_string());
                    self.diagnostics.push(IncludeDiagnostic {
                        path: reference.to_string(),
                        reason,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok(out.join("\n"))
    }

    fn include(&mut self, reference: &str, base_dir: &Path) -> Result<String, InclusionError> {
        let full = base_dir.join(reference);
        let key = canonical(&full);

        if self.chain.contains(&key) {
            let mut names: Vec<String> = self
                .chain
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            names.push(key.display().to_string());
            return Err(InclusionError::Cycle {
                chain: names.join(" -> "),
            });
        }

        let text = match std::fs::read_to_string(&full) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(InclusionError::NotFound { path: full });
            }
            Err(source) => return Err(InclusionError::Read { path: full, source }),
        };

        let nested_base = full
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| base_dir.to_path_buf());

        self.chain.push(key);
        let resolved = self.resolve(&text, &nested_base);
        self.chain.pop();
        resolved
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
