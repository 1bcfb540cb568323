use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

/// Footer the generator is asked to end gallery replies with.
pub const RELEVANT_IMAGES_MARKER: &str = "Relevant images:";

const INLINE_IMAGE_TAG: &str = "[image:";

fn inline_image_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // An unterminated tag runs to end of text.
    PATTERN.get_or_init(|| Regex::new(r"(?s)\[image:.*?(?:\]|$)").expect("static regex"))
}

/// Recovers the candidate paths a reply actually referenced.
///
/// Reads the comma-separated list after the last marker. Pieces that are not
/// exactly one of `candidate_paths` are dropped, duplicates keep their first
/// position, and output order follows the reply.
pub fn extract_referenced_paths(reply: &str, candidate_paths: &[String]) -> Vec<String> {
    let Some(idx) = reply.rfind(RELEVANT_IMAGES_MARKER) else {
        return Vec::new();
    };
    let tail = &reply[idx + RELEVANT_IMAGES_MARKER.len()..];
    let allowed: HashSet<&str> = candidate_paths.iter().map(String::as_str).collect();

    let mut out: Vec<String> = Vec::new();
    for piece in tail.split(',').map(str::trim) {
        if piece.is_empty() || !allowed.contains(piece) {
            continue;
        }
        if out.iter().any(|existing| existing == piece) {
            continue;
        }
        out.push(piece.to_string());
    }
    out
}

/// Text safe to show the user: no inline `[image: ...]` tags, nothing from the
/// first marker onward, surrounding whitespace trimmed.
pub fn clean_display_text(reply: &str) -> String {
    let pattern = inline_image_tag_pattern();
    let mut text = reply.to_string();
    // Removing one tag can splice a new one together from its neighbours.
    while text.contains(INLINE_IMAGE_TAG) {
        let next = pattern.replace_all(&text, "").into_owned();
        if next == text {
            break;
        }
        text = next;
    }
    if let Some(idx) = text.find(RELEVANT_IMAGES_MARKER) {
        text.truncate(idx);
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::{clean_display_text, extract_referenced_paths, RELEVANT_IMAGES_MARKER};

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn hallucinated_paths_are_dropped_and_reply_order_kept() {
        let reply = "Here they are. Relevant images: a.jpg, b.jpg, c.jpg";
        let found = extract_referenced_paths(reply, &paths(&["a.jpg", "b.jpg"]));
        assert_eq!(found, paths(&["a.jpg", "b.jpg"]));

        let reversed = "Relevant images: b.jpg,a.jpg";
        let found = extract_referenced_paths(reversed, &paths(&["a.jpg", "b.jpg"]));
        assert_eq!(found, paths(&["b.jpg", "a.jpg"]));
    }

    #[test]
    fn missing_marker_yields_nothing() {
        let found = extract_referenced_paths("No matches, sorry.", &paths(&["a.jpg"]));
        assert!(found.is_empty());
    }

    #[test]
    fn only_the_last_marker_counts() {
        let reply = "Relevant images: a.jpg\nActually, Relevant images: b.jpg";
        let found = extract_referenced_paths(reply, &paths(&["a.jpg", "b.jpg"]));
        assert_eq!(found, paths(&["b.jpg"]));
    }

    #[test]
    fn duplicates_and_blank_pieces_are_ignored() {
        let reply = "Relevant images: a.jpg, , a.jpg ,b.jpg,";
        let found = extract_referenced_paths(reply, &paths(&["a.jpg", "b.jpg"]));
        assert_eq!(found, paths(&["a.jpg", "b.jpg"]));
    }

    #[test]
    fn result_is_always_a_subset_of_candidates() {
        let candidates = paths(&["app/static/x.jpg", "app/static/y.png"]);
        let replies = [
            "Relevant images: app/static/x.jpg, /etc/passwd, app/static/y.png.",
            "Relevant images:",
            "Relevant images: Relevant images: app/static/x.jpg",
            "relevant images: app/static/x.jpg",
            "[image: app/static/x.jpg] Relevant images: ,,,",
        ];
        for reply in replies {
            for found in extract_referenced_paths(reply, &candidates) {
                assert!(candidates.contains(&found), "{found} leaked from {reply:?}");
            }
        }
    }

    #[test]
    fn clean_removes_tags_and_footer() {
        let reply = "Two giraffes [image: a.jpg] at dusk [image: b.jpg].\n\nRelevant images: a.jpg, b.jpg";
        assert_eq!(clean_display_text(reply), "Two giraffes  at dusk .");
    }

    #[test]
    fn clean_cuts_at_first_marker() {
        let reply = "Intro Relevant images: a.jpg Relevant images: b.jpg";
        assert_eq!(clean_display_text(reply), "Intro");
    }

    #[test]
    fn clean_never_leaks_tags_or_marker() {
        let replies = [
            "dangling [image: a.jpg",
            "[ima[image: x]ge: y] nested",
            "Relevant[image: z] images: a.jpg",
            "multi\nline [image: a\nb] end",
            "[image:no-space]",
        ];
        for reply in replies {
            let cleaned = clean_display_text(reply);
            assert!(!cleaned.contains("[image:"), "{cleaned:?}");
            assert!(!cleaned.contains(RELEVANT_IMAGES_MARKER), "{cleaned:?}");
        }
    }

    #[test]
    fn clean_leaves_plain_text_alone() {
        assert_eq!(clean_display_text("  Just a giraffe.  "), "Just a giraffe.");
    }
}
