//! Sentence segmentation with UTF-16 code-unit offsets.
//!
//! Splits prose on sentence-terminal punctuation, keeping the terminator
//! with the preceding span. Offsets are UTF-16 code units because the
//! rendering surface indexes text that way; code-point offsets would shift
//! every citation marker after the first supplementary-plane character.

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::Segment;

lazy_static! {
    /// A sentence: one or more non-terminators followed by any run of
    /// terminators. The trailing run keeps `.` `!` `?` with their sentence.
    static ref SENTENCE_PATTERN: Regex = Regex::new(r"[^.!?]+[.!?]*").unwrap();
}

/// Length of a string in UTF-16 code units.
pub fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Slice a string by UTF-16 code-unit offsets.
///
/// The end offset is clamped to the string's UTF-16 length. Offsets landing
/// inside a surrogate pair snap forward to the next character boundary.
pub fn slice_utf16(text: &str, start: usize, end: usize) -> &str {
    let mut byte_start = None;
    let mut byte_end = None;
    let mut units = 0usize;

    for (byte_idx, ch) in text.char_indices() {
        if byte_start.is_none() && units >= start {
            byte_start = Some(byte_idx);
        }
        if byte_end.is_none() && units >= end {
            byte_end = Some(byte_idx);
        }
        units += ch.len_utf16();
    }

    let byte_start = byte_start.unwrap_or(text.len());
    let byte_end = byte_end.unwrap_or(text.len());
    if byte_start >= byte_end {
        return "";
    }
    &text[byte_start..byte_end]
}

/// Split prose into ordered, non-overlapping segments.
///
/// Blank-after-trim spans are dropped. A trailing span without a terminator
/// is still emitted. Input with no terminator anywhere yields one segment
/// covering the whole text; empty input yields none.
pub fn segment_text(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut matched_any = false;
    let mut cursor_byte = 0usize;
    let mut cursor_utf16 = 0usize;

    for m in SENTENCE_PATTERN.find_iter(text) {
        matched_any = true;

        // Advance over any gap (leading terminators) before this span.
        cursor_utf16 += utf16_len(&text[cursor_byte..m.start()]);

        let span = m.as_str();
        let span_units = utf16_len(span);
        if !span.trim().is_empty() {
            segments.push(Segment {
                text: span.to_string(),
                start_index: cursor_utf16,
                end_index: cursor_utf16 + span_units,
            });
        }

        cursor_utf16 += span_units;
        cursor_byte = m.end();
    }

    // No sentence structure at all: the whole input is one segment.
    if !matched_any && !text.trim().is_empty() {
        segments.push(Segment {
            text: text.to_string(),
            start_index: 0,
            end_index: utf16_len(text),
        });
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_two_sentences() {
        let segments = segment_text("The sky is blue. Mars is red.");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "The sky is blue.");
        assert_eq!(segments[0].start_index, 0);
        assert_eq!(segments[0].end_index, 16);
        assert_eq!(segments[1].text, " Mars is red.");
        assert_eq!(segments[1].start_index, 16);
        assert_eq!(segments[1].end_index, 29);
    }

    #[test]
    fn test_utf16_offsets_for_supplementary_plane() {
        // The emoji is 2 UTF-16 code units:
        // Hello (5) + space (1) + emoji (2) + space (1) + World (5) + . (1)
        let segments = segment_text("Hello \u{1F44D} World.");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_index, 0);
        assert_eq!(segments[0].end_index, 15);
    }

    #[test]
    fn test_empty_input_yields_no_segments() {
        assert!(segment_text("").is_empty());
        assert!(segment_text("   ").is_empty());
    }

    #[test]
    fn test_no_terminator_yields_whole_input() {
        let segments = segment_text("a claim without punctuation");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "a claim without punctuation");
        assert_eq!(segments[0].end_index, 27);
    }

    #[test]
    fn test_only_terminators_yields_whole_input() {
        let segments = segment_text("...");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].end_index, 3);
    }

    #[test]
    fn test_trailing_unterminated_span_emitted() {
        let segments = segment_text("First claim. second half");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].text, " second half");
    }

    #[test]
    fn test_blank_trailing_span_dropped() {
        let segments = segment_text("Done.   ");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "Done.");
    }

    #[test]
    fn test_terminator_kept_with_preceding_span() {
        let segments = segment_text("Really?! Yes.");
        assert_eq!(segments[0].text, "Really?!");
    }

    #[test]
    fn test_slice_utf16_clamps_end() {
        assert_eq!(slice_utf16("abc", 1, 100), "bc");
        assert_eq!(slice_utf16("abc", 5, 100), "");
    }

    #[test]
    fn test_slice_utf16_with_surrogate_pairs() {
        let text = "\u{1F44D} ok";
        // The emoji occupies units 0..2.
        assert_eq!(slice_utf16(text, 0, 2), "\u{1F44D}");
        assert_eq!(slice_utf16(text, 2, 5), " ok");
        // An offset inside the pair snaps forward.
        assert_eq!(slice_utf16(text, 1, 5), " ok");
    }

    proptest! {
        #[test]
        fn prop_segment_count_bounded_by_terminators(text in ".{0,200}") {
            let terminators = text.chars().filter(|c| matches!(c, '.' | '!' | '?')).count();
            let segments = segment_text(&text);
            prop_assert!(segments.len() <= terminators + 1);
        }

        #[test]
        fn prop_segments_ordered_and_non_overlapping(text in ".{0,200}") {
            let segments = segment_text(&text);
            for pair in segments.windows(2) {
                prop_assert!(pair[0].end_index <= pair[1].start_index);
            }
            for segment in &segments {
                prop_assert!(segment.start_index <= segment.end_index);
            }
        }

        #[test]
        fn prop_non_bmp_char_counts_two_units(c in prop::char::range('\u{10000}', '\u{10FFFF}')) {
            prop_assert_eq!(utf16_len(&c.to_string()), 2);
            prop_assert_eq!(utf16_len(&format!("a{}", c)), 3);
        }
    }
}
