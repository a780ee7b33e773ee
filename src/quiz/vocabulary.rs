use rand::seq::SliceRandom;
use rand::thread_rng;
use rand::Rng;
use std::fs::File;

use crate::quiz::format::{self, DisplayFormat};
use crate::quiz::{ChoiceItem, QuestionSet, QuizRecord};

// Vocabulary audio lives next to the syllable sounds, one file per word id
const AUDIO_SUBDIR: &str = "hsk2";

// Uniform random bonus added on top of the similarity score so that
// repeated questions about the same word do not always surface the same
// distractors. Tests assert ordering on the noise-free score only.
pub const EXPLORATION_NOISE: f64 = 2.0;

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct VocabularyRecord {
    pub id: u32,
    pub level: u8,
    pub hanzi: String,
    pub pinyin: String,
    #[serde(rename = "rus")]
    pub translations: Vec<String>,
}

// Shape of one entry in the vocabulary table file
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct RawWord {
    id: u32,
    level: i64,
    hanzi: String,
    pinyin: String,
    #[serde(default)]
    rus: Vec<String>,
}

impl RawWord {
    fn into_record(self) -> Option<VocabularyRecord> {
        if !(1..=6).contains(&self.level) {
            log::warn!(
                "Skipping word {} ({}): level {} is out of range",
                self.id,
                self.hanzi,
                self.level
            );
            return None;
        }
        if self.hanzi.is_empty() || self.pinyin.is_empty() {
            log::warn!("Skipping word {}: empty hanzi or pinyin", self.id);
            return None;
        }
        Some(VocabularyRecord {
            id: self.id,
            level: self.level as u8,
            hanzi: self.hanzi,
            pinyin: self.pinyin,
            translations: self.rus,
        })
    }
}

pub struct Vocabulary {
    pub words: Vec<VocabularyRecord>,
}

impl Vocabulary {
    pub fn new(file: File) -> Self {
        // Same degradation as the syllable table: a broken file means an
        // empty pool and zero counts everywhere, never a crash
        let data: Vec<RawWord> = match serde_json::from_reader(file) {
            Ok(data) => data,
            Err(error) => {
                log::warn!("Vocabulary table is not a valid JSON array: {}", error);
                Vec::new()
            }
        };
        let words: Vec<VocabularyRecord> =
            data.into_iter().filter_map(|raw| raw.into_record()).collect();

        Self { words }
    }
}

pub fn audio_filename(id: u32) -> String {
    format!("{}/{:04}.mp3", AUDIO_SUBDIR, id)
}

// How alike two words look and sound, before any randomness. Words of the
// same HSK level, of similar pinyin length, starting with the same letter,
// carrying the same tone digit or written with the same number of
// characters make better distractors.
pub fn similarity_score(target: &VocabularyRecord, candidate: &VocabularyRecord) -> u32 {
    let mut score = 0;

    if candidate.level == target.level {
        score += 3;
    }

    let target_len = target.pinyin.chars().count() as i64;
    let candidate_len = candidate.pinyin.chars().count() as i64;
    if (target_len - candidate_len).abs() <= 1 {
        score += 2;
    }

    if target.pinyin.chars().next() == candidate.pinyin.chars().next() {
        score += 2;
    }

    // Numeric-tone pinyin keeps the tone as the last character
    let target_tone = target.pinyin.chars().last();
    if target_tone == candidate.pinyin.chars().last()
        && target_tone.map_or(false, |c| ('1'..='4').contains(&c))
    {
        score += 1;
    }

    if target.hanzi.chars().count() == candidate.hanzi.chars().count() {
        score += 1;
    }

    score
}

// Picks a random target word from the pool and surrounds it with
// `answer_count - 1` distractors sampled from the most similar candidates.
//
// The sampling is done in two steps:
// 1. Rank every other word by similarity (plus exploration noise).
// 2. Keep a top tier of the best-ranked candidates and draw from it
//    without replacement, so the result is plausible but not identical
//    from one question to the next.
pub fn generate_answers(
    pool: &[VocabularyRecord],
    answer_count: usize,
    question_format: DisplayFormat,
    answer_format: DisplayFormat,
) -> Option<QuestionSet> {
    let target = pool.choose(&mut thread_rng())?;

    let mut scored: Vec<(&VocabularyRecord, f64)> = pool
        .iter()
        .filter(|w| w.id != target.id)
        .map(|w| {
            let noise = thread_rng().gen_range(0.0..EXPLORATION_NOISE);
            (w, similarity_score(target, w) as f64 + noise)
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let tier_size = (answer_count + 2)
        .max(4)
        .max((scored.len() as f64 * 0.2) as usize)
        .min(scored.len());
    let mut tier: Vec<&VocabularyRecord> = scored[..tier_size].iter().map(|(w, _)| *w).collect();

    let needed = answer_count.saturating_sub(1).min(pool.len() - 1);
    let mut picked: Vec<&VocabularyRecord> = vec![target];
    while picked.len() < needed + 1 && !tier.is_empty() {
        let index = thread_rng().gen_range(0..tier.len());
        picked.push(tier.remove(index));
    }
    picked.shuffle(&mut thread_rng());

    let choices: Vec<ChoiceItem> = picked
        .into_iter()
        .map(|w| ChoiceItem {
            id: w.id,
            display_text: format::format_display_text(w, answer_format),
            record: QuizRecord::Vocabulary(w.clone()),
        })
        .collect();

    Some(QuestionSet {
        target: QuizRecord::Vocabulary(target.clone()),
        display_target: format::format_display_text(target, question_format),
        audio_file: Some(audio_filename(target.id)),
        choices,
    })
}
