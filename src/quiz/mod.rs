pub mod format;
pub mod levels;
pub mod session;
pub mod syllables;
pub mod vocabulary;

use syllables::SyllableRecord;
use vocabulary::VocabularyRecord;

// Both generators produce the same shape of question, they only differ in
// where the record came from.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum QuizRecord {
    Syllable(SyllableRecord),
    Vocabulary(VocabularyRecord),
}

impl QuizRecord {
    pub fn id(&self) -> u32 {
        match self {
            QuizRecord::Syllable(s) => s.id,
            QuizRecord::Vocabulary(w) => w.id,
        }
    }

    pub fn audio_file(&self) -> Option<String> {
        match self {
            QuizRecord::Syllable(s) => Some(s.audio_file.clone()),
            QuizRecord::Vocabulary(w) => Some(vocabulary::audio_filename(w.id)),
        }
    }

    // The spoken tone, only meaningful for syllable records
    pub fn tone(&self) -> Option<u8> {
        match self {
            QuizRecord::Syllable(s) => Some(s.tone),
            QuizRecord::Vocabulary(_) => None,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChoiceItem {
    pub id: u32,
    pub display_text: String,
    pub record: QuizRecord,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QuestionSet {
    pub target: QuizRecord,
    pub display_target: String,
    pub audio_file: Option<String>,
    pub choices: Vec<ChoiceItem>,
}

impl QuestionSet {
    pub fn is_correct_choice(&self, choice_id: u32) -> bool {
        self.target.id() == choice_id
    }
}

// Read-only tables loaded once at startup and shared between chats.
pub struct QuizCorpus {
    pub syllables: Vec<SyllableRecord>,
    pub words: Vec<VocabularyRecord>,
}
