/// A directory whose name encodes an alphabetical span, such as `a-f` or `ma-mz`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeFolder {
    start: String,
    end: String,
    len: usize,
}

impl RangeFolder {
    /// Parses a lowercased folder name. Names holding the literal `" - "`
    /// (as in `Title - Subtitle`) are not ranges.
    pub fn parse(name: &str) -> Option<Self> {
        if !name.contains('-') || name.contains(" - ") {
            return None;
        }
        let (start, end) = name.split_once('-')?;
        let len = start.chars().count().max(end.chars().count());

        let (start, end) = if len > 1 {
            (pad(start, len, 'a'), pad(end, len, 'z'))
        } else {
            (start.to_string(), end.to_string())
        };

        Some(Self { start, end, len })
    }

    pub fn compare_length(&self) -> usize {
        self.len
    }

    /// Compares only the first `compare_length` characters of `title`.
    pub fn contains(&self, title: &str) -> bool {
        let head: String = title.chars().take(self.len).collect();
        self.start.as_str() <= head.as_str() && head.as_str() <= self.end.as_str()
    }
}

fn pad(bound: &str, len: usize, fill: char) -> String {
    let mut padded = bound.to_string();
    for _ in bound.chars().count()..len {
        padded.push(fill);
    }
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_letter_range() {
        let range = RangeFolder::parse("m-p").unwrap();
        assert!(range.contains("matrix"));
        assert!(range.contains("pulp fiction"));
        assert!(!range.contains("alien"));
        assert!(!range.contains("zebra"));
    }

    #[test]
    fn test_uneven_bounds_are_padded() {
        let range = RangeFolder::parse("a-lz").unwrap();
        assert_eq!(range.compare_length(), 2);
        assert_eq!(range, RangeFolder::parse("aa-lz").unwrap());
        assert!(range.contains("grand bleu"));
        assert!(range.contains("lzz"));
        assert!(!range.contains("matrix"));
    }

    #[test]
    fn test_title_shorter_than_bounds() {
        let range = RangeFolder::parse("ma-mz").unwrap();
        assert!(!range.contains("m"));
        assert!(range.contains("ma"));
    }

    #[test]
    fn test_non_ranges() {
        assert!(RangeFolder::parse("star wars").is_none());
        assert!(RangeFolder::parse("alien - le huitieme passager").is_none());
    }
}
