//! Inclusion expansion.
//!
//! Concatenates the initial config references, then repeatedly replaces every
//! `include-config <ref>` line with a marker comment followed by the content of
//! `<ref>`, until no directive remains. Nested includes are therefore fully
//! expanded before line parsing starts.
//!
//! Two guards stop runaway expansion:
//! - a hard cap of [`MAX_EXPANSION_PASSES`] passes, which also fires on
//!   legitimately deep (but finite) chains;
//! - a repetition check: each pass's ordered list of expanded references is
//!   remembered, and a pass that exactly repeats an earlier one can never
//!   terminate, so it fails immediately.

use super::resolver::ContentResolver;
use crate::error::{OpchainError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Upper bound on replacement passes.
pub const MAX_EXPANSION_PASSES: usize = 1000;

static INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^[ \t]*include-config[ \t]+(\S+)[ \t]*$").expect("include pattern")
});

/// Resolve and concatenate `references` in order, then expand all includes.
pub fn expand_configs<R: ContentResolver + ?Sized>(
    references: &[String],
    resolver: &R,
) -> Result<String> {
    let mut accumulated = String::new();
    for reference in references {
        let content = resolver.fetch(reference)?;
        tracing::debug!("loaded {} ({} bytes)", reference, content.len());
        accumulated.push_str(&content);
        if !accumulated.is_empty() && !accumulated.ends_with('\n') {
            accumulated.push('\n');
        }
    }
    expand_text(accumulated, resolver)
}

/// Expand every include directive in `text`. Text without directives is
/// returned unchanged.
pub fn expand_text<R: ContentResolver + ?Sized>(text: String, resolver: &R) -> Result<String> {
    let mut text = text;
    let mut seen_passes: Vec<Vec<String>> = Vec::new();
    let mut passes = 0usize;

    loop {
        let directives = find_includes(&text);
        if directives.is_empty() {
            return Ok(text);
        }

        passes += 1;
        if passes > MAX_EXPANSION_PASSES {
            return Err(OpchainError::Include(format!(
                "exceeded {} expansion passes, probably circular or excessively deep inclusion",
                MAX_EXPANSION_PASSES
            )));
        }

        let pass_refs: Vec<String> = directives.iter().map(|d| d.reference.clone()).collect();
        if seen_passes.contains(&pass_refs) {
            return Err(OpchainError::Include(format!(
                "circular inclusion: pass {} repeats the expansion of [{}]",
                passes,
                pass_refs.join(", ")
            )));
        }
        tracing::debug!("expansion pass {}: [{}]", passes, pass_refs.join(", "));

        text = replace_includes(&text, &directives, resolver)?;
        seen_passes.push(pass_refs);
    }
}

/// One matched directive: byte span in the text plus its reference.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IncludeDirective {
    start: usize,
    end: usize,
    directive: String,
    reference: String,
}

fn find_includes(text: &str) -> Vec<IncludeDirective> {
    INCLUDE_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let reference = caps.get(1)?;
            Some(IncludeDirective {
                start: whole.start(),
                end: whole.end(),
                directive: whole.as_str().trim().to_string(),
                reference: reference.as_str().to_string(),
            })
        })
        .collect()
}

/// Replace directives left to right with marker + resolved content.
fn replace_includes<R: ContentResolver + ?Sized>(
    text: &str,
    directives: &[IncludeDirective],
    resolver: &R,
) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for d in directives {
        out.push_str(&text[last..d.start]);
        out.push_str(&marker(&d.directive));
        out.push_str(&resolver.fetch(&d.reference)?);
        last = d.end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Comment line naming the expanded directive.
fn marker(directive: &str) -> String {
    format!("\n# Expanded from: {}\n\n", directive)
}
