//! Heuristics that derive catalog metadata from a markdown file.
//!
//! All functions are pure and total: they never fail and always return a
//! usable value, falling back to filename-derived or placeholder text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Known consulting firms as (lower-case token, display name), checked in
/// this order. First hit wins.
pub const KNOWN_COMPANIES: &[(&str, &str)] = &[
    ("mckinsey", "Mckinsey"),
    ("bcg", "BCG"),
    ("bain", "Bain"),
    ("deloitte", "Deloitte"),
    ("pwc", "PWC"),
    ("ey", "EY"),
    ("kpmg", "KPMG"),
    ("accenture", "Accenture"),
];

pub const UNKNOWN_COMPANY: &str = "Unknown";
pub const EMPTY_SUMMARY: &str = "요약 없음";

const SUMMARY_TARGET_CHARS: usize = 200;
const SUMMARY_MAX_CHARS: usize = 300;
const SUMMARY_MIN_LINE_CHARS: usize = 20;
const SOURCE_MARKER: &str = "*출처";

static TITLE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#\s+(.+)$").expect("title header pattern is valid"));

/// First level-1 header, or a title-cased rendition of the filename.
pub fn extract_title(content: &str, filename: &str) -> String {
    let header = content.lines().find_map(|line| {
        TITLE_HEADER
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|title| !title.is_empty())
    });

    header.unwrap_or_else(|| title_from_filename(filename))
}

/// Looks for a known firm in the filename first, then in the body.
pub fn extract_company(filename: &str, content: &str) -> String {
    find_company(filename)
        .or_else(|| find_company(content))
        .unwrap_or_else(|| UNKNOWN_COMPANY.to_string())
}

/// Joins the first prose lines until roughly 200 characters are collected.
///
/// Headers, front-matter rules, source attributions and short lines are
/// skipped. The result never exceeds 300 characters.
pub fn extract_summary(content: &str) -> String {
    let mut summary = String::new();

    for line in content.split('\n').map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with("---") || line.starts_with(SOURCE_MARKER) {
            continue;
        }
        if line.chars().count() <= SUMMARY_MIN_LINE_CHARS {
            continue;
        }

        if !summary.is_empty() {
            summary.push(' ');
        }
        summary.push_str(line);

        if summary.chars().count() > SUMMARY_TARGET_CHARS {
            break;
        }
    }

    if summary.is_empty() {
        return EMPTY_SUMMARY.to_string();
    }

    if summary.chars().count() > SUMMARY_MAX_CHARS {
        let mut truncated: String = summary.chars().take(SUMMARY_MAX_CHARS - 3).collect();
        truncated.push_str("...");
        return truncated;
    }

    summary
}

fn find_company(haystack: &str) -> Option<String> {
    let lowered = haystack.to_lowercase();
    KNOWN_COMPANIES
        .iter()
        .find(|(token, _)| lowered.contains(token))
        .map(|(_, display)| display.to_string())
}

fn title_from_filename(filename: &str) -> String {
    let stem = filename.strip_suffix(".md").unwrap_or(filename);
    let spaced = stem.replace('-', " ");

    // every alphabetic run starts upper-case, the rest of the run is lowered
    let mut titled = String::with_capacity(spaced.len());
    let mut at_word_start = true;
    for ch in spaced.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                titled.extend(ch.to_uppercase());
            } else {
                titled.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            titled.push(ch);
            at_word_start = true;
        }
    }
    titled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_uses_first_level_one_header() {
        let content = "intro line\n## Not this\n#   The Real Title  \n# Second";
        assert_eq!(extract_title(content, "ignored.md"), "The Real Title");
    }

    #[test]
    fn title_ignores_deeper_headers_and_bare_hashes() {
        let content = "## Section\n#NoSpace\n###\nplain";
        assert_eq!(
            extract_title(content, "ai-outlook-2024.md"),
            "Ai Outlook 2024"
        );
    }

    #[test]
    fn title_falls_back_to_title_cased_filename() {
        assert_eq!(
            extract_title("", "mckinsey-GENAI-report.md"),
            "Mckinsey Genai Report"
        );
        assert_eq!(extract_title("no header", "q3_review.md"), "Q3_Review");
    }

    #[test]
    fn company_prefers_filename_over_content() {
        let company = extract_company("bain-strategy.md", "a study by mckinsey");
        assert_eq!(company, "Bain");
    }

    #[test]
    fn company_falls_back_to_content_then_unknown() {
        assert_eq!(
            extract_company("strategy.md", "Published by Accenture Research"),
            "Accenture"
        );
        assert_eq!(extract_company("notes.md", "nothing here"), "Unknown");
    }

    #[test]
    fn company_uses_list_order_not_best_match() {
        // "mckinsey" precedes "ey" in the list even though both appear
        assert_eq!(extract_company("mckinsey-ey.md", ""), "Mckinsey");
        // "ey" is found inside "survey" before "kpmg" is considered
        assert_eq!(extract_company("survey-kpmg.md", ""), "EY");
    }

    #[test]
    fn summary_skips_headers_metadata_and_short_lines() {
        let content = "# Title\n---\n*출처: McKinsey\nshort line\n\
                       This is the first meaningful paragraph line.\n\
                       And this is a second meaningful line of prose.";
        assert_eq!(
            extract_summary(content),
            "This is the first meaningful paragraph line. \
             And this is a second meaningful line of prose."
        );
    }

    #[test]
    fn summary_stops_after_target_length() {
        let line = "x".repeat(150);
        let content = format!("{line}\n{line}\n{line}");
        let summary = extract_summary(&content);
        // two lines push the joined text past 200 characters, the third is never read
        assert_eq!(summary.chars().count(), 300);
        assert_eq!(summary.find(' '), Some(150));
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn summary_never_exceeds_three_hundred_chars() {
        let long_line = "가".repeat(500);
        let summary = extract_summary(&long_line);
        assert_eq!(summary.chars().count(), 300);
        assert!(summary.ends_with("..."));
        assert!(summary.starts_with("가가가"));
    }

    #[test]
    fn summary_placeholder_when_no_prose() {
        let content = "# Title\n\n## Sub\n---\n*출처: somewhere far away and long\nshort";
        assert_eq!(extract_summary(content), EMPTY_SUMMARY);
        assert_eq!(extract_summary(""), EMPTY_SUMMARY);
    }

    #[test]
    fn summary_trims_carriage_returns() {
        let content = "  A line that is long enough to qualify here.  \r\n";
        assert_eq!(
            extract_summary(content),
            "A line that is long enough to qualify here."
        );
    }
}
