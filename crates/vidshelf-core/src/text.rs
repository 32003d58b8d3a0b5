//! Title normalization shared by naming and bucket matching.

use crate::model::VideoRecord;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Leading articles stripped before alphabetical bucketing. Order matters:
/// longer forms sharing a prefix come first.
pub const ARTICLES: &[&str] = &[
    "L'", "Les ", "Le ", "La ", "Une ", "Un ", "Des ", "De l'", "De la ", "De ", "Du ", "D'un ",
    "D'une ", "A la ", "A l'", "À la ", "À l'", "Au ", "Aux ", "The ", "A ", "L ", "An ",
];

const ARTICLE_WINDOW: usize = 6;

/// Makes a title safe for use as a file name.
pub fn normalize(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let mut result: String = input
        .chars()
        .map(|c| match c {
            'œ' => 'o',
            'æ' => 'a',
            other => other,
        })
        .collect();

    result = result
        .replace(" .", ".")
        .replace(':', ", ")
        .replace('?', "...")
        .replace('/', " - ")
        .replace(" , ", ", ")
        .replace("  ", " ");

    result.trim().to_string()
}

/// Expands the œ/æ ligatures, then strips every combining mark left after
/// canonical decomposition.
pub fn fold_accents(input: &str) -> String {
    let mut expanded = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            'œ' => expanded.push_str("oe"),
            'Œ' => expanded.push_str("OE"),
            'æ' => expanded.push_str("ae"),
            'Æ' => expanded.push_str("AE"),
            other => expanded.push(other),
        }
    }
    expanded.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Drops a leading article, only looked for within the first few characters,
/// then folds accents and normalizes.
pub fn remove_article(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        return String::new();
    }

    let window: String = title.chars().take(ARTICLE_WINDOW).collect();
    let stripped = ARTICLES
        .iter()
        .find(|article| window.contains(*article) && title.starts_with(*article))
        .map(|article| &title[article.len()..])
        .unwrap_or(title);

    normalize(&fold_accents(stripped))
}

pub fn sort_key(title: &str) -> String {
    remove_article(title).to_lowercase()
}

/// Builds the final file name: `Title (Year) [SxxEyy] spec.ext`.
///
/// Falls back to the original file name when the record has no title.
pub fn format_filename(record: &VideoRecord) -> String {
    if record.title_fr.trim().is_empty() {
        return record.file_name();
    }

    let stem = if record.category.is_series() {
        format!(
            "{} ({}) {} {}",
            record.title_fr,
            record.year,
            record.sequence(),
            record.spec
        )
    } else {
        format!("{} ({}) {}", record.title_fr, record.year, record.spec)
    };

    let mut ext = record.extension();
    if ext.eq_ignore_ascii_case(".ts") {
        ext = ".mp4".to_string();
    }

    format!("{}{}", normalize(&stem), ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    #[test]
    fn test_normalize_replaces_unsafe_characters() {
        assert_eq!(normalize("Title: Subtitle"), "Title, Subtitle");
        assert_eq!(normalize("What?"), "What...");
        assert_eq!(normalize("AC/DC Live"), "AC - DC Live");
        assert_eq!(normalize("  end .  "), "end.");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_remove_article() {
        assert_eq!(remove_article("The Matrix"), "Matrix");
        assert_eq!(remove_article("Les Misérables"), "Miserables");
        assert_eq!(remove_article("L'Homme"), "Homme");
        assert_eq!(remove_article("Lesotho"), "Lesotho");
        assert_eq!(remove_article("Amélie"), "Amelie");
    }

    #[test]
    fn test_fold_accents_strips_any_diacritic() {
        assert_eq!(fold_accents("Ōkami"), "Okami");
        assert_eq!(fold_accents("Šógun"), "Sogun");
        assert_eq!(fold_accents("Œuvre et Cæsar"), "OEuvre et Caesar");
        assert_eq!(fold_accents("Ça ira"), "Ca ira");
        assert_eq!(sort_key("Ōkami"), "okami");
    }

    #[test]
    fn test_sort_key_lowercases() {
        assert_eq!(sort_key("Le Grand Bleu"), "grand bleu");
        assert_eq!(sort_key("Été meurtrier"), "ete meurtrier");
        assert_eq!(sort_key(""), "");
    }

    #[test]
    fn test_format_filename_for_series() {
        let mut record = VideoRecord::new("/dl/Séries/show.s01e05.ts", Category::Series);
        record.title_fr = "Kaamelott".to_string();
        record.year = 2005;
        record.season = 1;
        record.episode = 5;
        record.spec = "FR 720p".to_string();
        assert_eq!(format_filename(&record), "Kaamelott (2005) S01E05 FR 720p.mp4");
    }

    #[test]
    fn test_format_filename_without_title_keeps_name() {
        let record = VideoRecord::new("/dl/Films/raw.name.mkv", Category::Films);
        assert_eq!(format_filename(&record), "raw.name.mkv");
    }
}
