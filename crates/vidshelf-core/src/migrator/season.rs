use regex::Regex;
use std::path::{Path, PathBuf};

lazy_static::lazy_static! {
    static ref SHOW_DIR: Regex = Regex::new(r"\(\d{4}\)$").unwrap();
    static ref SEASON_DIR: Regex = Regex::new(r"^Saison \d{2}$").unwrap();
}

/// `Saison 01`, or `None` for season 0.
pub fn season_folder(season: u32) -> Option<String> {
    if season == 0 {
        return None;
    }
    Some(format!("Saison {:02}", season))
}

pub fn is_season_dir(name: &str) -> bool {
    SEASON_DIR.is_match(name)
}

/// Nearest ancestor of `file` named like `Title (2005)`, or its parent.
pub fn series_folder(file: &Path) -> PathBuf {
    let parent = file.parent().unwrap_or(file);
    parent
        .ancestors()
        .find(|dir| {
            dir.file_name()
                .and_then(|n| n.to_str())
                .map(|n| SHOW_DIR.is_match(n))
                .unwrap_or(false)
        })
        .unwrap_or(parent)
        .to_path_buf()
}

/// Where an episode at `current` belongs: `Saison NN/<file_name>` beneath
/// its show folder, or renamed in place when it already sits in that
/// season. Season 0 leaves the path unchanged.
pub fn season_target(current: &Path, file_name: &str, season: u32) -> PathBuf {
    let folder = match season_folder(season) {
        Some(folder) => folder,
        None => return current.to_path_buf(),
    };
    let parent = current.parent().unwrap_or(current);
    if parent.to_string_lossy().contains(&folder) {
        return parent.join(file_name);
    }
    series_folder(current).join(folder).join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_folder_names() {
        assert_eq!(season_folder(0), None);
        assert_eq!(season_folder(3).as_deref(), Some("Saison 03"));
        assert_eq!(season_folder(12).as_deref(), Some("Saison 12"));
        assert!(is_season_dir("Saison 01"));
        assert!(!is_season_dir("Saison 1"));
    }

    #[test]
    fn test_series_folder_walks_up_to_show() {
        let path = Path::new("/work/Séries/k-l/Kaamelott (2005)/extras/ep.mkv");
        assert_eq!(
            series_folder(path),
            PathBuf::from("/work/Séries/k-l/Kaamelott (2005)")
        );
        assert_eq!(
            series_folder(Path::new("/work/misc/ep.mkv")),
            PathBuf::from("/work/misc")
        );
    }

    #[test]
    fn test_season_target_under_show() {
        let raw = Path::new("/work/k-l/Kaamelott (2005)/ep.mkv");
        assert_eq!(
            season_target(raw, "ep.mkv", 2),
            PathBuf::from("/work/k-l/Kaamelott (2005)/Saison 02/ep.mkv")
        );
    }

    #[test]
    fn test_season_target_keeps_existing_season() {
        let raw = Path::new("/work/Kaamelott (2005)/Saison 01/raw.mkv");
        assert_eq!(
            season_target(raw, "final.mkv", 1),
            PathBuf::from("/work/Kaamelott (2005)/Saison 01/final.mkv")
        );
        assert_eq!(season_target(raw, "final.mkv", 0), raw);
    }
}
