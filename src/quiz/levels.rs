use crate::quiz::vocabulary::VocabularyRecord;

pub const LEVELS: std::ops::RangeInclusive<u8> = 1..=6;

#[derive(Debug)]
pub enum LevelError {
    // The selection may never become empty, somebody has to play something
    LastSelectedLevel,
    UnknownLevel(u8),
}

// Which HSK levels feed the vocabulary pool. Starts with level 1 only.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LevelSelection {
    selected: [bool; 6],
}

impl Default for LevelSelection {
    fn default() -> Self {
        let mut selected = [false; 6];
        selected[0] = true;
        Self { selected }
    }
}

impl LevelSelection {
    pub fn empty() -> Self {
        Self { selected: [false; 6] }
    }

    pub fn is_selected(&self, level: u8) -> bool {
        LEVELS.contains(&level) && self.selected[(level - 1) as usize]
    }

    pub fn is_empty(&self) -> bool {
        !self.selected.iter().any(|s| *s)
    }

    // Flips one level on or off. Turning off the last remaining level is
    // refused and leaves the selection untouched.
    pub fn toggle(&mut self, level: u8) -> Result<(), LevelError> {
        if !LEVELS.contains(&level) {
            return Err(LevelError::UnknownLevel(level));
        }
        let index = (level - 1) as usize;
        if self.selected[index] && self.selected.iter().filter(|s| **s).count() == 1 {
            return Err(LevelError::LastSelectedLevel);
        }
        self.selected[index] = !self.selected[index];
        Ok(())
    }
}

// Keeps only the words whose level is selected, in corpus order
pub fn filter_by_levels(
    corpus: &[VocabularyRecord],
    selection: &LevelSelection,
) -> Vec<VocabularyRecord> {
    corpus
        .iter()
        .filter(|w| selection.is_selected(w.level))
        .cloned()
        .collect()
}

// Word counts per level, for the level picker. Index 0 is level 1.
pub fn count_by_level(corpus: &[VocabularyRecord]) -> [usize; 6] {
    let mut counts = [0; 6];
    for word in corpus {
        if LEVELS.contains(&word.level) {
            counts[(word.level - 1) as usize] += 1;
        }
    }
    counts
}

pub fn total_selected(corpus: &[VocabularyRecord], selection: &LevelSelection) -> usize {
    corpus
        .iter()
        .filter(|w| selection.is_selected(w.level))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(id: u32, level: u8) -> VocabularyRecord {
        VocabularyRecord {
            id,
            level,
            hanzi: "字".to_string(),
            pinyin: "zi4".to_string(),
            translations: vec!["знак".to_string()],
        }
    }

    #[test]
    fn default_selection_is_level_one() {
        let selection = LevelSelection::default();
        assert!(selection.is_selected(1));
        for level in 2..=6 {
            assert!(!selection.is_selected(level));
        }
    }

    #[test]
    fn deselecting_the_last_level_is_refused() {
        let mut selection = LevelSelection::default();
        assert!(selection.toggle(1).is_err());
        assert!(selection.is_selected(1));

        selection.toggle(3).unwrap();
        selection.toggle(1).unwrap();
        assert!(!selection.is_selected(1));
        assert!(selection.is_selected(3));
    }

    #[test]
    fn unknown_levels_are_rejected() {
        let mut selection = LevelSelection::default();
        assert!(selection.toggle(0).is_err());
        assert!(selection.toggle(7).is_err());
        assert_eq!(selection, LevelSelection::default());
    }

    #[test]
    fn filter_preserves_corpus_order() {
        let corpus = vec![word(1, 1), word(2, 2), word(3, 1), word(4, 3), word(5, 1)];
        let mut selection = LevelSelection::default();
        selection.toggle(3).unwrap();

        let filtered = filter_by_levels(&corpus, &selection);
        let ids: Vec<u32> = filtered.iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![1, 3, 4, 5]);
    }

    #[test]
    fn counts_cover_all_levels() {
        let corpus = vec![word(1, 1), word(2, 1), word(3, 2), word(4, 6)];
        assert_eq!(count_by_level(&corpus), [2, 1, 0, 0, 0, 1]);
        assert_eq!(count_by_level(&[]), [0; 6]);
    }

    #[test]
    fn total_follows_the_selection() {
        let corpus = vec![word(1, 1), word(2, 2), word(3, 2)];
        let mut selection = LevelSelection::default();
        assert_eq!(total_selected(&corpus, &selection), 1);
        selection.toggle(2).unwrap();
        assert_eq!(total_selected(&corpus, &selection), 3);
        assert_eq!(total_selected(&corpus, &LevelSelection::empty()), 0);
    }
}
