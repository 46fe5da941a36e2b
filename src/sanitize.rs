//! Extraction of a diagram payload from free-form model output.
//!
//! The backend hands back whatever its language model produced. That text
//! may be wrapped in one or more markdown fences, preceded by prose such as
//! "Here is your diagram:", or simply not a diagram at all. [`sanitize`]
//! strips the fences and drops any preamble before the first recognized
//! diagram declaration. It never decides whether the result is valid; the
//! rendering engine is the only judge of that.

/// Opening marker of a fenced mermaid block.
pub const FENCE_OPEN: &str = "```mermaid";

/// Closing marker of any fenced block.
pub const FENCE_CLOSE: &str = "```";

/// Diagram declarations that mark the start of a diagram body.
///
/// Order does not decide which keyword wins; the earliest position in the
/// text does.
pub const DIAGRAM_KEYWORDS: [&str; 5] = [
    "sequenceDiagram",
    "classDiagram",
    "graph",
    "flowchart",
    "stateDiagram",
];

/// Clean raw model output into a best-effort diagram payload.
///
/// Empty or whitespace-only input yields an empty string. When no keyword
/// is found the trimmed, fence-free text is returned unchanged.
pub fn sanitize(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    // The language-tagged opener goes first so its tag never survives.
    let unfenced = raw.replace(FENCE_OPEN, "").replace(FENCE_CLOSE, "");

    let body = match find_diagram_start(&unfenced) {
        Some((start, _)) => &unfenced[start..],
        None => unfenced.as_str(),
    };

    body.trim().to_string()
}

/// Locate the earliest recognized diagram keyword.
///
/// Returns the byte offset and the keyword found there.
pub fn find_diagram_start(text: &str) -> Option<(usize, &'static str)> {
    DIAGRAM_KEYWORDS
        .iter()
        .filter_map(|keyword| text.find(keyword).map(|idx| (idx, *keyword)))
        .min_by_key(|(idx, _)| *idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sanitize_strips_preamble_and_fences() {
        let raw = "Here is your diagram:\n```mermaid\nsequenceDiagram\nA->>B: Hi\n```";
        assert_eq!(sanitize(raw), "sequenceDiagram\nA->>B: Hi");
    }

    #[test]
    fn test_sanitize_leaves_clean_diagram_unchanged() {
        assert_eq!(sanitize("graph TD\nA-->B"), "graph TD\nA-->B");
    }

    #[test]
    fn test_sanitize_empty_input_is_empty() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("   \n\t  "), "");
    }

    #[test]
    fn test_sanitize_without_keyword_returns_trimmed_input() {
        assert_eq!(
            sanitize("  I could not produce a diagram.  \n"),
            "I could not produce a diagram."
        );
    }

    #[test]
    fn test_sanitize_earliest_keyword_wins_over_declared_order() {
        // `flowchart` is declared after `graph` but appears first here.
        let raw = "Sure!\nflowchart LR\n  A[graph builder] --> B";
        assert_eq!(sanitize(raw), "flowchart LR\n  A[graph builder] --> B");
    }

    #[test]
    fn test_sanitize_handles_multiple_and_unbalanced_fences() {
        let raw = "```mermaid\n```mermaid\nclassDiagram\nclass A\n```\n```\n```";
        assert_eq!(sanitize(raw), "classDiagram\nclass A");
    }

    #[test]
    fn test_sanitize_keeps_trailing_content_after_diagram() {
        let raw = "stateDiagram-v2\n[*] --> Idle\n```\nLet me know if you need more.";
        assert_eq!(
            sanitize(raw),
            "stateDiagram-v2\n[*] --> Idle\n\nLet me know if you need more."
        );
    }

    #[test]
    fn test_sanitize_keyword_in_prose_truncates_early() {
        // Known heuristic limitation: "graph" inside prose triggers the cut.
        let raw = "This graph shows auth.\nsequenceDiagram\nA->>B: x";
        assert_eq!(sanitize(raw), "graph shows auth.\nsequenceDiagram\nA->>B: x");
    }

    #[test]
    fn test_find_diagram_start_reports_keyword_and_offset() {
        assert_eq!(
            find_diagram_start("intro classDiagram then graph"),
            Some((6, "classDiagram"))
        );
        assert_eq!(find_diagram_start("nothing here"), None);
    }

    fn keyword() -> impl Strategy<Value = &'static str> {
        prop::sample::select(DIAGRAM_KEYWORDS.to_vec())
    }

    fn keyword_free_text() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 \\n\\t:>-]{0,64}"
            .prop_filter("must not contain a keyword", |s| {
                DIAGRAM_KEYWORDS.iter().all(|k| !s.contains(k)) && !s.contains('`')
            })
    }

    proptest! {
        #[test]
        fn prop_keyword_free_text_is_only_trimmed(s in keyword_free_text()) {
            prop_assert_eq!(sanitize(&s), s.trim());
        }

        #[test]
        fn prop_output_never_contains_fence_markers(
            before in keyword_free_text(),
            body in keyword_free_text(),
            fences in 1usize..4,
        ) {
            let mut raw = before;
            for _ in 0..fences {
                raw.push_str("```mermaid\n");
            }
            raw.push_str(&body);
            for _ in 0..fences {
                raw.push_str("\n```");
            }
            prop_assert!(!sanitize(&raw).contains(FENCE_CLOSE));
        }

        #[test]
        fn prop_result_starts_at_earliest_keyword(
            prose in keyword_free_text(),
            first in keyword(),
            gap in keyword_free_text(),
            second in keyword(),
        ) {
            let raw = format!("{prose}\n{first} {gap} {second}");
            let cleaned = sanitize(&raw);
            prop_assert!(cleaned.starts_with(first));
        }
    }
}
