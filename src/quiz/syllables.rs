use rand::seq::SliceRandom;
use rand::thread_rng;
use std::fs::File;

use crate::quiz::{ChoiceItem, QuestionSet, QuizRecord};

// Tone marks for the answer buttons in the tones game, indexed by tone - 1
pub const TONE_SYMBOLS: [&str; 4] = ["ˉ", "ˊ", "ˇ", "ˋ"];

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SyllableRecord {
    pub id: u32,
    pub pinyin: String,
    pub initial: String,
    #[serde(rename = "final")]
    pub final_: String,
    pub tone: u8,
    pub audio_file: String,
}

// Shape of one entry in the syllable table file. Ids are not part of the
// file, they are assigned from the entry's position while loading.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct RawSyllable {
    pinyin: String,
    #[serde(default)]
    initial: String,
    #[serde(default, rename = "final")]
    final_: String,
    tone: i64,
    #[serde(default)]
    filename: String,
}

impl RawSyllable {
    fn into_record(self, id: u32) -> Option<SyllableRecord> {
        if self.pinyin.is_empty() {
            log::warn!("Skipping syllable entry {}: empty pinyin", id);
            return None;
        }
        if !(1..=4).contains(&self.tone) {
            log::warn!(
                "Skipping syllable entry {} ({}): tone {} is out of range",
                id,
                self.pinyin,
                self.tone
            );
            return None;
        }
        Some(SyllableRecord {
            id,
            pinyin: self.pinyin,
            initial: self.initial,
            final_: self.final_,
            tone: self.tone as u8,
            audio_file: self.filename,
        })
    }
}

pub struct Syllables {
    pub syllables: Vec<SyllableRecord>,
}

impl Syllables {
    pub fn new(file: File) -> Self {
        // A table that is not a JSON array degrades to an empty corpus,
        // which the session reports as "not enough data" later on
        let data: Vec<RawSyllable> = match serde_json::from_reader(file) {
            Ok(data) => data,
            Err(error) => {
                log::warn!("Syllable table is not a valid JSON array: {}", error);
                Vec::new()
            }
        };
        let syllables: Vec<SyllableRecord> = data
            .into_iter()
            .enumerate()
            .filter_map(|(i, raw)| raw.into_record(i as u32))
            .collect();

        Self { syllables }
    }
}

// Picks a random target syllable and builds a shuffled choice set around it.
// Distractors are syllables that sound alike: same initial, same final or
// same tone as the target. When fewer similar syllables exist than asked
// for, the set simply comes out smaller.
pub fn generate_answers(
    corpus: &[SyllableRecord],
    distractor_count: usize,
) -> Option<QuestionSet> {
    let target = corpus.choose(&mut thread_rng())?;

    let mut similar: Vec<&SyllableRecord> = corpus
        .iter()
        .filter(|s| {
            s.initial == target.initial || s.final_ == target.final_ || s.tone == target.tone
        })
        .filter(|s| s.id != target.id)
        .collect();

    similar.shuffle(&mut thread_rng());
    similar.truncate(distractor_count);

    let mut choices: Vec<ChoiceItem> = Vec::with_capacity(similar.len() + 1);
    choices.push(choice_item(target));
    for s in similar {
        choices.push(choice_item(s));
    }
    choices.shuffle(&mut thread_rng());

    Some(QuestionSet {
        target: QuizRecord::Syllable(target.clone()),
        display_target: target.pinyin.clone(),
        audio_file: Some(target.audio_file.clone()),
        choices,
    })
}

fn choice_item(s: &SyllableRecord) -> ChoiceItem {
    ChoiceItem {
        id: s.id,
        display_text: s.pinyin.clone(),
        record: QuizRecord::Syllable(s.clone()),
    }
}
