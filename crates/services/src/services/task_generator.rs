//! Prompt construction and response parsing for daily task generation.
//!
//! The generation endpoint returns free-form text that usually, but not
//! always, contains a JSON array of task objects. Parsing is layered: strip
//! code fences, try a direct parse, fall back to regex recovery of the first
//! bracketed array, then dedup, backfill and truncate down to exactly
//! [`TASKS_PER_DAY`] candidates.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::fallback_tasks::{FALLBACK_TASKS, FallbackTask};

/// Number of tasks published per calendar day.
pub const TASKS_PER_DAY: usize = 3;

/// A task candidate parsed from the generation response. Transient: never
/// persisted directly.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskCandidate {
    pub title: String,
    #[serde(rename = "totalCount", default = "default_total_count")]
    pub total_count: i64,
}

fn default_total_count() -> i64 {
    1
}

impl From<&FallbackTask> for TaskCandidate {
    fn from(task: &FallbackTask) -> Self {
        Self {
            title: task.title.to_string(),
            total_count: task.total_count,
        }
    }
}

/// Build the generation prompt. The template is static; the response contract
/// (3 tasks, distinct categories, unique titles) lives in the prompt text and
/// is enforced after the fact by [`parse_candidates`].
pub fn build_prompt() -> String {
    r#"Generate exactly 3 daily photo challenge tasks for a mobile photo-sharing game.

## Requirements
1. Each task must come from a DIFFERENT category
2. Draw categories from: nature, food, architecture, people, pets, street life, self-portrait, colors, textures, light and shadow
3. Each title is a short actionable instruction (under 10 words)
4. Titles must be unique - no duplicates or near-duplicates
5. "totalCount" is how many photos the task asks for (1-3, usually 1)
6. Write in English

## Output Format
Return ONLY a valid JSON array:
```json
[
  {"title": "Capture a sunset from your street", "totalCount": 1},
  {"title": "Photograph your lunch from above", "totalCount": 1},
  {"title": "Take three photos of doors you pass", "totalCount": 3}
]
```
"#
    .to_string()
}

// First bracketed array of objects anywhere in the text.
static ARRAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[\s*\{.*?\}\s*\]").expect("hardcoded pattern"));

/// Parse the response text into exactly [`TASKS_PER_DAY`] unique candidates.
///
/// Valid parsed candidates are kept in source order; duplicates (exact
/// post-trim match, case-sensitive) and empty titles are dropped; the result
/// is backfilled from the fallback pool and truncated to size. When no JSON
/// array can be recovered at all, the result is the pool's first three
/// entries.
pub fn parse_candidates(text: &str) -> Vec<TaskCandidate> {
    let parsed = extract_array(text).unwrap_or_default();

    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<TaskCandidate> = Vec::with_capacity(TASKS_PER_DAY);

    for mut candidate in parsed {
        if out.len() == TASKS_PER_DAY {
            break;
        }
        candidate.title = candidate.title.trim().to_string();
        if candidate.title.is_empty() || !seen.insert(candidate.title.clone()) {
            continue;
        }
        out.push(candidate);
    }

    for fallback in FALLBACK_TASKS.iter() {
        if out.len() == TASKS_PER_DAY {
            break;
        }
        if seen.contains(fallback.title) {
            continue;
        }
        seen.insert(fallback.title.to_string());
        out.push(fallback.into());
    }

    out
}

/// Direct parse, then regex recovery of the first array-shaped substring.
fn extract_array(text: &str) -> Option<Vec<TaskCandidate>> {
    let text = strip_code_fences(text.trim()).trim();

    if let Ok(candidates) = serde_json::from_str::<Vec<TaskCandidate>>(text) {
        return Some(candidates);
    }

    let recovered = ARRAY_RE.find(text)?;
    serde_json::from_str(recovered.as_str()).ok()
}

/// Strip a surrounding markdown code fence, if any.
fn strip_code_fences(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let content_start = start + 7;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let content_start = start + 3;
        // Skip past any language identifier on the same line
        let content_start = text[content_start..]
            .find('\n')
            .map(|i| content_start + i + 1)
            .unwrap_or(content_start);
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    text
}
