//! Knowledge Base Loading and Prompt Formatting
//!
//! The knowledge base is a JSON array of scraped pages, loaded once at
//! process startup and immutable afterwards. Formatting turns the entries
//! into a character-budgeted fragment that is appended to the base system
//! instructions before the session descriptor is sent upstream.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Maximum characters of a single entry's content included in the prompt.
pub const PER_ENTRY_CONTENT_LIMIT: usize = 2000;

const HEADER: &str = "=== Verified Knowledge Base ===\n\n";
const FOOTER: &str = "=== End of Knowledge Base ===\n";

/// Base system prompt used when no knowledge-specific override is supplied.
pub const DEFAULT_BASE_INSTRUCTIONS: &str = "\
You are a professional customer service representative.

Your role:
- Provide accurate information about the organization's products and services
- Be courteous, professional, and helpful
- Use the knowledge base below to answer questions
- If you don't know something, admit it and offer to connect the caller with a specialist
- Speak naturally and conversationally
- Keep responses concise but informative";

/// One scraped page of grounding material.
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeEntry {
    pub title: String,
    pub url: String,
    pub content: String,
}

/// Loads the knowledge base from a JSON file on disk.
///
/// Callers are expected to absorb a failure here: a missing or unreadable
/// knowledge base degrades the instructions, it never kills the process.
pub fn load_knowledge(path: &Path) -> Result<Vec<KnowledgeEntry>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read knowledge base at {}", path.display()))?;
    let entries: Vec<KnowledgeEntry> =
        serde_json::from_str(&raw).context("Knowledge base is not a JSON array of entries")?;
    Ok(entries)
}

/// Formats knowledge entries into a prompt fragment of at most `max_chars`
/// characters.
///
/// Entries are emitted in input order as whole sections (title, source URL,
/// content truncated to [`PER_ENTRY_CONTENT_LIMIT`]). A section that would
/// push the running total past the budget is dropped entirely and iteration
/// stops; sections are never split. Empty input yields an empty string.
pub fn format_knowledge(entries: &[KnowledgeEntry], max_chars: usize) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let decoration = HEADER.chars().count() + FOOTER.chars().count();
    if max_chars < decoration {
        return String::new();
    }
    let budget = max_chars - decoration;

    let mut out = String::from(HEADER);
    let mut used = 0;
    for entry in entries {
        let content: String = entry.content.chars().take(PER_ENTRY_CONTENT_LIMIT).collect();
        let section = format!("Source: {}\nURL: {}\n{}\n\n", entry.title, entry.url, content);
        let section_len = section.chars().count();
        if used + section_len > budget {
            break;
        }
        out.push_str(&section);
        used += section_len;
    }
    out.push_str(FOOTER);
    out
}

/// Combines the base instruction text with the formatted knowledge fragment.
pub fn build_instructions(base: &str, fragment: &str) -> String {
    if fragment.is_empty() {
        return base.to_string();
    }
    format!(
        "{base}\n\n{fragment}\nUse the information above to answer questions accurately. \
         Always cite the source when using it."
    )
}
