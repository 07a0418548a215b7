//! Break point detection for chunking

use unicode_segmentation::UnicodeSegmentation;

/// Priority levels for break points
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BreakPriority {
    /// Word boundary (lowest)
    Word = 1,
    /// Sentence boundary
    Sentence = 2,
    /// Paragraph boundary (highest)
    Paragraph = 3,
}

/// A potential break point in text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakPoint {
    /// Byte position; the next chunk may start here
    pub position: usize,
    /// Priority of this break point
    pub priority: BreakPriority,
}

impl BreakPoint {
    pub fn new(position: usize, priority: BreakPriority) -> Self {
        Self { position, priority }
    }

    /// Whether ending a chunk here leaves a sentence intact
    pub fn ends_sentence(&self) -> bool {
        self.priority >= BreakPriority::Sentence
    }
}

/// Find every break point in `text`, sorted by position.
///
/// Positions are unique; where several kinds coincide the highest
/// priority wins.
pub fn find_break_points(text: &str) -> Vec<BreakPoint> {
    let mut points = Vec::new();

    for (i, _) in text.match_indices("\n\n") {
        points.push(BreakPoint::new(i + 2, BreakPriority::Paragraph));
    }

    for (i, _) in text.split_sentence_bound_indices() {
        if i > 0 {
            points.push(BreakPoint::new(i, BreakPriority::Sentence));
        }
    }

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            points.push(BreakPoint::new(i + c.len_utf8(), BreakPriority::Word));
        }
    }

    points.retain(|p| p.position < text.len());
    points.sort_by(|a, b| a.position.cmp(&b.position).then(b.priority.cmp(&a.priority)));
    points.dedup_by_key(|p| p.position);

    points
}

/// Pick the best break point with `min_exclusive < position <= max_inclusive`.
///
/// `points` must be sorted by position, as [`find_break_points`] returns
/// them. Highest priority wins, then the furthest position.
pub fn best_break_in(
    points: &[BreakPoint],
    min_exclusive: usize,
    max_inclusive: usize,
) -> Option<BreakPoint> {
    let lo = points.partition_point(|p| p.position <= min_exclusive);
    let hi = points.partition_point(|p| p.position <= max_inclusive);
    if lo >= hi {
        return None;
    }
    points[lo..hi]
        .iter()
        .max_by_key(|p| (p.priority, p.position))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_break_priority_ordering() {
        assert!(BreakPriority::Paragraph > BreakPriority::Sentence);
        assert!(BreakPriority::Sentence > BreakPriority::Word);
    }

    #[test]
    fn test_sentence_break_wins_over_word() {
        let text = "Paris is the capital of France. The Eiffel Tower is in Paris.";
        let points = find_break_points(text);

        let at_32: Vec<_> = points.iter().filter(|p| p.position == 32).collect();
        assert_eq!(at_32.len(), 1);
        assert_eq!(at_32[0].priority, BreakPriority::Sentence);
    }

    #[test]
    fn test_paragraph_breaks() {
        let text = "First paragraph.\n\nSecond paragraph.";
        let points = find_break_points(text);

        let para = points
            .iter()
            .find(|p| p.priority == BreakPriority::Paragraph)
            .unwrap();
        assert_eq!(para.position, 18);
        assert_eq!(&text[para.position..], "Second paragraph.");
    }

    #[test]
    fn test_best_break_in_window() {
        let points = vec![
            BreakPoint::new(5, BreakPriority::Sentence),
            BreakPoint::new(10, BreakPriority::Word),
            BreakPoint::new(14, BreakPriority::Word),
            BreakPoint::new(30, BreakPriority::Paragraph),
        ];

        assert_eq!(best_break_in(&points, 0, 20).unwrap().position, 5);
        assert_eq!(best_break_in(&points, 5, 20).unwrap().position, 14);
        assert!(best_break_in(&points, 14, 29).is_none());
        assert_eq!(best_break_in(&points, 0, 30).unwrap().position, 30);
    }

    #[test]
    fn test_best_break_matches_full_scan() {
        let text = "One two three. Four five six.\n\nSeven eight nine ten. Eleven twelve.";
        let points = find_break_points(text);

        for min in 0..text.len() {
            for max in min..=text.len() {
                let expected = points
                    .iter()
                    .filter(|p| p.position > min && p.position <= max)
                    .max_by_key(|p| (p.priority, p.position))
                    .copied();
                assert_eq!(best_break_in(&points, min, max), expected, "window ({min}, {max}]");
            }
        }
    }

    #[test]
    fn test_multibyte_positions_are_char_boundaries() {
        let text = "Größe ändert sich. Ça va très bien. 東京は大きい。";
        for point in find_break_points(text) {
            assert!(text.is_char_boundary(point.position));
        }
    }
}
