use std::sync::Arc;

use crate::platform::{HapticKind, HostPlatform};
use crate::quiz::format::{self, DisplayFormat};
use crate::quiz::levels::{self, LevelSelection};
use crate::quiz::{syllables, vocabulary, QuestionSet, QuizCorpus};

// The syllable games always ask for this many wrong answers
pub const SYLLABLE_DISTRACTORS: usize = 7;

// How long a correctly answered question stays on screen before the next
// one comes up. The host owns the timer, the session only checks tokens.
pub const AUTO_ADVANCE_DELAY_MS: u64 = 800;

pub const DEFAULT_ANSWER_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum QuizMode {
    Syllables,
    Tones,
    Vocabulary,
    VocabularyTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    // Menu, nothing running
    Idle,
    // A question is on screen, no answer picked yet
    Active,
    // An answer is picked, feedback is on screen
    Answered,
    // The word-list view, no questions at all
    Browsing,
}

// What the user tapped: a regular choice card, or one of the four bare
// tone buttons in the tones game.
#[derive(Debug, Clone)]
pub enum AnswerSelection {
    Choice(u32),
    Tone(u8),
}

// Issued when a correct answer schedules an auto advance. Ties the pending
// advance to the question it was answered on, so a timer that fires late
// cannot touch a session that has already moved elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceToken {
    seq: u64,
}

#[derive(Debug, PartialEq)]
pub enum SelectOutcome {
    Correct { advance: AdvanceToken },
    Incorrect,
    // Wrong phase or a second answer to the same question
    Ignored,
}

#[derive(Debug, PartialEq)]
pub enum SessionError {
    NoLevelSelected,
    InsufficientData,
    ConflictingFormat,
}

#[derive(Clone)]
pub struct QuizSession {
    pub mode: QuizMode,
    pub phase: Phase,
    pub current_question: Option<QuestionSet>,
    pub selected_answer: Option<AnswerSelection>,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub level_selection: LevelSelection,
    pub answer_cardinality: usize,
    pub question_format: DisplayFormat,
    pub answer_format: DisplayFormat,
    question_seq: u64,
    platform: Arc<dyn HostPlatform>,
}

impl QuizSession {
    pub fn new(platform: Arc<dyn HostPlatform>) -> Self {
        Self {
            mode: QuizMode::Syllables,
            phase: Phase::Idle,
            current_question: None,
            selected_answer: None,
            correct_count: 0,
            incorrect_count: 0,
            level_selection: LevelSelection::default(),
            answer_cardinality: DEFAULT_ANSWER_COUNT,
            question_format: DisplayFormat::PinyinRus,
            answer_format: DisplayFormat::Hanzi,
            question_seq: 0,
            platform,
        }
    }

    // Leaves the menu and shows the first question (or the word list).
    // Scores start over on every start.
    pub fn start(&mut self, mode: QuizMode, corpus: &QuizCorpus) -> Result<(), SessionError> {
        if matches!(mode, QuizMode::Vocabulary | QuizMode::VocabularyTable)
            && levels::total_selected(&corpus.words, &self.level_selection) == 0
        {
            return Err(SessionError::NoLevelSelected);
        }

        self.mode = mode;
        self.correct_count = 0;
        self.incorrect_count = 0;
        self.selected_answer = None;

        if mode == QuizMode::VocabularyTable {
            self.current_question = None;
            self.phase = Phase::Browsing;
        } else {
            match self.generate(corpus) {
                Some(question) => {
                    self.question_seq += 1;
                    self.current_question = Some(question);
                    self.phase = Phase::Active;
                }
                None => {
                    self.go_idle();
                    return Err(SessionError::InsufficientData);
                }
            }
        }

        self.platform.show_back_button();
        log::debug!("Session started in mode {:?}", mode);
        Ok(())
    }

    // At most one answer per question: anything after the first one (or
    // outside a running question) is ignored.
    pub fn select_answer(&mut self, answer: AnswerSelection) -> SelectOutcome {
        if self.phase != Phase::Active {
            return SelectOutcome::Ignored;
        }
        let question = match &self.current_question {
            Some(question) => question,
            None => return SelectOutcome::Ignored,
        };

        let correct = match (self.mode, &answer) {
            (QuizMode::Tones, AnswerSelection::Tone(tone)) => {
                question.target.tone() == Some(*tone)
            }
            (QuizMode::Syllables, AnswerSelection::Choice(id))
            | (QuizMode::Vocabulary, AnswerSelection::Choice(id)) => {
                question.is_correct_choice(*id)
            }
            // A tone tap in a card game or vice versa
            _ => return SelectOutcome::Ignored,
        };

        self.selected_answer = Some(answer);
        self.phase = Phase::Answered;

        if correct {
            self.correct_count += 1;
            self.platform.haptic_feedback(HapticKind::Success);
            SelectOutcome::Correct {
                advance: AdvanceToken {
                    seq: self.question_seq,
                },
            }
        } else {
            self.incorrect_count += 1;
            self.platform.haptic_feedback(HapticKind::Error);
            SelectOutcome::Incorrect
        }
    }

    pub fn next_question(&mut self, corpus: &QuizCorpus) -> Result<(), SessionError> {
        match self.phase {
            Phase::Active | Phase::Answered => {}
            // Nothing to advance from the menu or the word list
            _ => return Ok(()),
        }

        self.selected_answer = None;
        match self.generate(corpus) {
            Some(question) => {
                self.question_seq += 1;
                self.current_question = Some(question);
                self.phase = Phase::Active;
                Ok(())
            }
            None => {
                self.go_idle();
                Err(SessionError::InsufficientData)
            }
        }
    }

    // Called by the host timer once the auto-advance delay has passed.
    // Ok(true) means the session moved on to a new question, Ok(false)
    // that the token went stale (the user already navigated away).
    pub fn auto_advance(
        &mut self,
        token: AdvanceToken,
        corpus: &QuizCorpus,
    ) -> Result<bool, SessionError> {
        if self.phase != Phase::Answered || token.seq != self.question_seq {
            log::debug!("Dropping stale auto-advance for question {}", token.seq);
            return Ok(false);
        }
        self.next_question(corpus)?;
        Ok(true)
    }

    // Back to the menu. Scores stay visible until the next start.
    pub fn go_home(&mut self) {
        self.go_idle();
    }

    pub fn toggle_level(&mut self, level: u8) -> Result<(), levels::LevelError> {
        self.level_selection.toggle(level)
    }

    // Changing the question format may invalidate the answer format, in
    // which case the first still-allowed one is picked.
    pub fn set_question_format(&mut self, format: DisplayFormat) {
        self.question_format = format;
        let available = format::available_answer_formats(format);
        if !available.contains(&self.answer_format) {
            if let Some(first) = available.first() {
                self.answer_format = *first;
            }
        }
    }

    pub fn set_answer_format(&mut self, format: DisplayFormat) -> Result<(), SessionError> {
        if format.shares_component(self.question_format) {
            return Err(SessionError::ConflictingFormat);
        }
        self.answer_format = format;
        Ok(())
    }

    fn go_idle(&mut self) {
        self.phase = Phase::Idle;
        self.current_question = None;
        self.selected_answer = None;
        self.platform.hide_back_button();
    }

    fn generate(&self, corpus: &QuizCorpus) -> Option<QuestionSet> {
        match self.mode {
            QuizMode::Syllables | QuizMode::Tones => {
                syllables::generate_answers(&corpus.syllables, SYLLABLE_DISTRACTORS)
            }
            QuizMode::Vocabulary => {
                let pool = levels::filter_by_levels(&corpus.words, &self.level_selection);
                vocabulary::generate_answers(
                    &pool,
                    self.answer_cardinality,
                    self.question_format,
                    self.answer_format,
                )
            }
            QuizMode::VocabularyTable => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::NoopPlatform;
    use crate::quiz::syllables::SyllableRecord;
    use crate::quiz::vocabulary::VocabularyRecord;
    use std::sync::Mutex;

    fn syllable(id: u32, pinyin: &str, tone: u8) -> SyllableRecord {
        SyllableRecord {
            id,
            pinyin: pinyin.to_string(),
            initial: pinyin[..1].to_string(),
            final_: pinyin[1..2].to_string(),
            tone,
            audio_file: format!("{}.mp3", pinyin),
        }
    }

    fn word(id: u32, level: u8, hanzi: &str) -> VocabularyRecord {
        VocabularyRecord {
            id,
            level,
            hanzi: hanzi.to_string(),
            pinyin: format!("ci{}", id),
            translations: vec!["слово".to_string()],
        }
    }

    // Every syllable carries tone 3, so the tones game always expects 3
    fn tone_three_corpus() -> QuizCorpus {
        QuizCorpus {
            syllables: vec![
                syllable(1, "ba3", 3),
                syllable(2, "bo3", 3),
                syllable(3, "ma3", 3),
            ],
            words: vec![
                word(1, 1, "一"),
                word(2, 1, "二"),
                word(3, 1, "三"),
                word(4, 2, "四"),
            ],
        }
    }

    fn session() -> QuizSession {
        QuizSession::new(Arc::new(NoopPlatform))
    }

    #[test]
    fn correct_tone_scores_and_schedules_an_advance() {
        let corpus = tone_three_corpus();
        let mut session = session();
        session.start(QuizMode::Tones, &corpus).unwrap();

        let outcome = session.select_answer(AnswerSelection::Tone(3));
        let token = match outcome {
            SelectOutcome::Correct { advance } => advance,
            other => panic!("expected a correct outcome, got {:?}", other),
        };
        assert_eq!(session.correct_count, 1);
        assert_eq!(session.phase, Phase::Answered);

        assert_eq!(session.auto_advance(token, &corpus), Ok(true));
        assert_eq!(session.phase, Phase::Active);
        assert!(session.selected_answer.is_none());
    }

    #[test]
    fn wrong_tone_counts_and_waits() {
        let corpus = tone_three_corpus();
        let mut session = session();
        session.start(QuizMode::Tones, &corpus).unwrap();

        assert_eq!(
            session.select_answer(AnswerSelection::Tone(1)),
            SelectOutcome::Incorrect
        );
        assert_eq!(session.incorrect_count, 1);
        // Stays on the feedback screen until the user asks for the next one
        assert_eq!(session.phase, Phase::Answered);
    }

    #[test]
    fn only_the_first_answer_counts() {
        let corpus = tone_three_corpus();
        let mut session = session();
        session.start(QuizMode::Tones, &corpus).unwrap();

        session.select_answer(AnswerSelection::Tone(1));
        assert_eq!(
            session.select_answer(AnswerSelection::Tone(3)),
            SelectOutcome::Ignored
        );
        assert_eq!(session.correct_count, 0);
        assert_eq!(session.incorrect_count, 1);
    }

    #[test]
    fn vocabulary_needs_a_level_with_words() {
        let corpus = tone_three_corpus();
        let mut session = session();
        session.level_selection = LevelSelection::empty();

        assert_eq!(
            session.start(QuizMode::Vocabulary, &corpus),
            Err(SessionError::NoLevelSelected)
        );
        assert_eq!(session.phase, Phase::Idle);

        // A selected level that holds no words is just as useless
        let mut session = self::session();
        session.level_selection.toggle(6).unwrap();
        session.level_selection.toggle(1).unwrap();
        assert_eq!(
            session.start(QuizMode::Vocabulary, &corpus),
            Err(SessionError::NoLevelSelected)
        );
    }

    #[test]
    fn vocabulary_answers_by_choice_id() {
        let corpus = tone_three_corpus();
        let mut session = session();
        session.answer_cardinality = 3;
        session.start(QuizMode::Vocabulary, &corpus).unwrap();

        let target_id = session.current_question.as_ref().unwrap().target.id();
        match session.select_answer(AnswerSelection::Choice(target_id)) {
            SelectOutcome::Correct { .. } => {}
            other => panic!("expected a correct outcome, got {:?}", other),
        }
        assert_eq!(session.correct_count, 1);
    }

    #[test]
    fn stale_tokens_do_nothing() {
        let corpus = tone_three_corpus();
        let mut session = session();
        session.start(QuizMode::Tones, &corpus).unwrap();

        let token = match session.select_answer(AnswerSelection::Tone(3)) {
            SelectOutcome::Correct { advance } => advance,
            other => panic!("expected a correct outcome, got {:?}", other),
        };

        // The user went home before the timer fired
        session.go_home();
        assert_eq!(session.auto_advance(token, &corpus), Ok(false));
        assert_eq!(session.phase, Phase::Idle);
        assert!(session.current_question.is_none());

        // Or asked for the next question manually first
        let mut session = self::session();
        session.start(QuizMode::Tones, &corpus).unwrap();
        let token = match session.select_answer(AnswerSelection::Tone(3)) {
            SelectOutcome::Correct { advance } => advance,
            other => panic!("expected a correct outcome, got {:?}", other),
        };
        session.next_question(&corpus).unwrap();
        session.select_answer(AnswerSelection::Tone(1));
        assert_eq!(session.auto_advance(token, &corpus), Ok(false));
        assert_eq!(session.incorrect_count, 1);
    }

    #[test]
    fn scores_survive_going_home_and_reset_on_start() {
        let corpus = tone_three_corpus();
        let mut session = session();
        session.start(QuizMode::Tones, &corpus).unwrap();
        session.select_answer(AnswerSelection::Tone(3));

        session.go_home();
        assert_eq!(session.correct_count, 1);

        session.start(QuizMode::Tones, &corpus).unwrap();
        assert_eq!(session.correct_count, 0);
        assert_eq!(session.incorrect_count, 0);
    }

    #[test]
    fn depleted_pool_sends_the_session_home() {
        let corpus = tone_three_corpus();
        let empty = QuizCorpus {
            syllables: Vec::new(),
            words: Vec::new(),
        };
        let mut session = session();
        session.start(QuizMode::Syllables, &corpus).unwrap();

        assert_eq!(
            session.next_question(&empty),
            Err(SessionError::InsufficientData)
        );
        assert_eq!(session.phase, Phase::Idle);
        assert!(session.current_question.is_none());
    }

    #[test]
    fn table_mode_browses_without_questions() {
        let corpus = tone_three_corpus();
        let mut session = session();
        session.start(QuizMode::VocabularyTable, &corpus).unwrap();
        assert_eq!(session.phase, Phase::Browsing);
        assert!(session.current_question.is_none());

        // There is no question to answer in the list view
        assert_eq!(
            session.select_answer(AnswerSelection::Choice(1)),
            SelectOutcome::Ignored
        );
    }

    #[test]
    fn question_format_change_fixes_a_conflicting_answer_format() {
        let mut session = session();
        session.question_format = DisplayFormat::Rus;
        session.answer_format = DisplayFormat::Hanzi;

        session.set_question_format(DisplayFormat::HanziPinyin);
        assert_eq!(session.answer_format, DisplayFormat::Rus);

        assert_eq!(
            session.set_answer_format(DisplayFormat::Pinyin),
            Err(SessionError::ConflictingFormat)
        );
        assert_eq!(session.answer_format, DisplayFormat::Rus);
    }

    // Records what the session asked the host to do
    struct RecordingPlatform {
        calls: Mutex<Vec<String>>,
    }

    impl HostPlatform for RecordingPlatform {
        fn haptic_feedback(&self, kind: HapticKind) {
            self.calls.lock().unwrap().push(format!("haptic:{:?}", kind));
        }
        fn show_back_button(&self) {
            self.calls.lock().unwrap().push("back:show".to_string());
        }
        fn hide_back_button(&self) {
            self.calls.lock().unwrap().push("back:hide".to_string());
        }
    }

    #[test]
    fn host_platform_is_notified_of_feedback_and_navigation() {
        let corpus = tone_three_corpus();
        let platform = Arc::new(RecordingPlatform {
            calls: Mutex::new(Vec::new()),
        });
        let mut session = QuizSession::new(platform.clone());

        session.start(QuizMode::Tones, &corpus).unwrap();
        session.select_answer(AnswerSelection::Tone(3));
        session.next_question(&corpus).unwrap();
        session.select_answer(AnswerSelection::Tone(1));
        session.go_home();

        let calls = platform.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                "back:show".to_string(),
                "haptic:Success".to_string(),
                "haptic:Error".to_string(),
                "back:hide".to_string(),
            ]
        );
    }
}
