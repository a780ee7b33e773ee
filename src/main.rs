mod platform;
mod quiz;

use std::{fs::File, path::Path, sync::Arc};

use dotenv::dotenv;
use teloxide::{
    dispatching::dialogue::InMemStorage,
    prelude::*,
    types::{ChatId, InputFile, KeyboardButton, KeyboardMarkup},
};

use platform::NoopPlatform;
use quiz::format::{self, DisplayFormat};
use quiz::levels;
use quiz::session::{
    AnswerSelection, Phase, QuizMode, QuizSession, SelectOutcome, SessionError,
    AUTO_ADVANCE_DELAY_MS,
};
use quiz::syllables::{Syllables, TONE_SYMBOLS};
use quiz::vocabulary::Vocabulary;
use quiz::{QuestionSet, QuizCorpus};

type QuizDialogue = Dialogue<State, InMemStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Clone, Default)]
pub enum State {
    #[default]
    Start,
    Menu {
        session: QuizSession,
    },
    ChooseLevels {
        session: QuizSession,
    },
    ChooseCardinality {
        session: QuizSession,
    },
    ChooseQuestionFormat {
        session: QuizSession,
    },
    ChooseAnswerFormat {
        session: QuizSession,
    },
    InQuiz {
        session: QuizSession,
    },
}

// Where the audio files live, relative to the working directory
const SOUNDS_DIR: &str = "sounds";

// How many words go into one message of the word-list view
const TABLE_CHUNK: usize = 30;

const CHOICE_OPTIONS: [usize; 5] = [4, 6, 8, 10, 12];

const GREETING_TEXT: &str =
    "Привет! Я помогу тебе выучить пиньинь, тоны и слова HSK. Выбери режим:";
const BTN_SYLLABLES: &str = "Слоги";
const BTN_TONES: &str = "Тоны";
const BTN_HSK_PLAY: &str = "Играть (HSK)";
const BTN_HSK_TABLE: &str = "Список слов HSK";
const BTN_LEVELS: &str = "Уровни HSK";
const BTN_COUNT: &str = "Количество вариантов";
const BTN_QUESTION_FORMAT: &str = "Формат вопроса";
const BTN_ANSWER_FORMAT: &str = "Формат ответа";
const BTN_NEXT: &str = "Следующий вопрос";
const BTN_HOME: &str = "🏠 Домой";
const BTN_BACK: &str = "Назад";

const NO_LEVEL_TEXT: &str = "Пожалуйста, выберите хотя бы один уровень HSK";
const LAST_LEVEL_TEXT: &str = "Должен быть выбран хотя бы один уровень";
const NO_WORDS_TEXT: &str = "Недостаточно слов в выбранных уровнях для продолжения игры.";

#[tokio::main]
async fn main() {
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting pinyin trainer bot...");

    let bot = Bot::from_env();

    let syllables_path =
        std::env::var("SYLLABLES_FILE").unwrap_or_else(|_| "pinyin_syllables.json".to_string());
    let words_path = std::env::var("HSK_FILE").unwrap_or_else(|_| "hsk_words.json".to_string());

    println!("Loading the syllable table from {}", syllables_path);
    let syllables = Syllables::new(
        File::open(&syllables_path).expect("Failed to open the syllable table file"),
    );
    println!("Loading the vocabulary table from {}", words_path);
    let vocabulary =
        Vocabulary::new(File::open(&words_path).expect("Failed to open the vocabulary table file"));

    log::info!(
        "Loaded {} syllables and {} words",
        syllables.syllables.len(),
        vocabulary.words.len()
    );

    let corpus = Arc::new(QuizCorpus {
        syllables: syllables.syllables,
        words: vocabulary.words,
    });

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, InMemStorage<State>, State>()
            .branch(dptree::case![State::Start].endpoint(start))
            .branch(dptree::case![State::Menu { session }].endpoint(menu))
            .branch(dptree::case![State::ChooseLevels { session }].endpoint(choose_levels))
            .branch(
                dptree::case![State::ChooseCardinality { session }].endpoint(choose_cardinality),
            )
            .branch(
                dptree::case![State::ChooseQuestionFormat { session }]
                    .endpoint(choose_question_format),
            )
            .branch(
                dptree::case![State::ChooseAnswerFormat { session }]
                    .endpoint(choose_answer_format),
            )
            .branch(dptree::case![State::InQuiz { session }].endpoint(in_quiz)),
    )
    .dependencies(dptree::deps![InMemStorage::<State>::new(), corpus])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;
}

async fn start(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, GREETING_TEXT)
        .reply_markup(menu_keyboard())
        .await?;

    let session = QuizSession::new(Arc::new(NoopPlatform));
    dialogue.update(State::Menu { session }).await?;
    Ok(())
}

async fn menu(
    bot: Bot,
    dialogue: QuizDialogue,
    session: QuizSession,
    corpus: Arc<QuizCorpus>,
    msg: Message,
) -> HandlerResult {
    let text = match msg.text() {
        Some(text) => text,
        None => {
            show_menu(&bot, msg.chat.id).await?;
            return Ok(());
        }
    };

    match text {
        BTN_SYLLABLES => launch(QuizMode::Syllables, bot, dialogue, session, corpus, msg).await,
        BTN_TONES => launch(QuizMode::Tones, bot, dialogue, session, corpus, msg).await,
        BTN_HSK_PLAY => launch(QuizMode::Vocabulary, bot, dialogue, session, corpus, msg).await,
        BTN_HSK_TABLE => {
            launch(QuizMode::VocabularyTable, bot, dialogue, session, corpus, msg).await
        }
        BTN_LEVELS => {
            send_levels_view(&bot, msg.chat.id, &session, &corpus).await?;
            dialogue.update(State::ChooseLevels { session }).await?;
            Ok(())
        }
        BTN_COUNT => {
            let buttons = CHOICE_OPTIONS
                .iter()
                .map(|n| vec![KeyboardButton::new(n.to_string())])
                .collect::<Vec<_>>();
            bot.send_message(msg.chat.id, "Сколько вариантов ответа показывать?")
                .reply_markup(KeyboardMarkup::new(buttons))
                .await?;
            dialogue.update(State::ChooseCardinality { session }).await?;
            Ok(())
        }
        BTN_QUESTION_FORMAT => {
            let buttons = DisplayFormat::ALL
                .iter()
                .map(|f| vec![KeyboardButton::new(f.label())])
                .collect::<Vec<_>>();
            bot.send_message(msg.chat.id, "Что показывать в вопросе?")
                .reply_markup(KeyboardMarkup::new(buttons))
                .await?;
            dialogue
                .update(State::ChooseQuestionFormat { session })
                .await?;
            Ok(())
        }
        BTN_ANSWER_FORMAT => {
            // Only the formats that do not give the answer away
            let buttons = format::available_answer_formats(session.question_format)
                .iter()
                .map(|f| vec![KeyboardButton::new(f.label())])
                .collect::<Vec<_>>();
            bot.send_message(msg.chat.id, "Что показывать в вариантах ответа?")
                .reply_markup(KeyboardMarkup::new(buttons))
                .await?;
            dialogue
                .update(State::ChooseAnswerFormat { session })
                .await?;
            Ok(())
        }
        _ => {
            show_menu(&bot, msg.chat.id).await?;
            dialogue.update(State::Menu { session }).await?;
            Ok(())
        }
    }
}

async fn launch(
    mode: QuizMode,
    bot: Bot,
    dialogue: QuizDialogue,
    mut session: QuizSession,
    corpus: Arc<QuizCorpus>,
    msg: Message,
) -> HandlerResult {
    match session.start(mode, &corpus) {
        Ok(()) => {
            if mode == QuizMode::VocabularyTable {
                send_word_list(&bot, msg.chat.id, &session, &corpus).await?;
            } else {
                send_question(&bot, msg.chat.id, &session).await?;
            }
            dialogue.update(State::InQuiz { session }).await?;
        }
        Err(SessionError::NoLevelSelected) => {
            bot.send_message(msg.chat.id, NO_LEVEL_TEXT)
                .reply_markup(menu_keyboard())
                .await?;
            dialogue.update(State::Menu { session }).await?;
        }
        Err(_) => {
            bot.send_message(msg.chat.id, NO_WORDS_TEXT)
                .reply_markup(menu_keyboard())
                .await?;
            dialogue.update(State::Menu { session }).await?;
        }
    }
    Ok(())
}

async fn choose_levels(
    bot: Bot,
    dialogue: QuizDialogue,
    mut session: QuizSession,
    corpus: Arc<QuizCorpus>,
    msg: Message,
) -> HandlerResult {
    let text = msg.text().unwrap_or_default();
    if text == BTN_BACK {
        show_menu(&bot, msg.chat.id).await?;
        dialogue.update(State::Menu { session }).await?;
        return Ok(());
    }

    let counts = levels::count_by_level(&corpus.words);
    let pressed = (1u8..=6).find(|level| {
        text == level_button_label(*level, &session, counts[(*level - 1) as usize])
    });

    if let Some(level) = pressed {
        if session.toggle_level(level).is_err() {
            bot.send_message(msg.chat.id, LAST_LEVEL_TEXT).await?;
        }
    }
    send_levels_view(&bot, msg.chat.id, &session, &corpus).await?;
    dialogue.update(State::ChooseLevels { session }).await?;
    Ok(())
}

async fn choose_cardinality(
    bot: Bot,
    dialogue: QuizDialogue,
    mut session: QuizSession,
    msg: Message,
) -> HandlerResult {
    let parsed = msg.text().unwrap_or_default().parse::<usize>();
    match parsed {
        Ok(count) if CHOICE_OPTIONS.contains(&count) => {
            session.answer_cardinality = count;
            bot.send_message(msg.chat.id, format!("Хорошо, вариантов ответа: {}", count))
                .reply_markup(menu_keyboard())
                .await?;
            dialogue.update(State::Menu { session }).await?;
        }
        _ => {
            bot.send_message(msg.chat.id, "Пожалуйста, выберите один из вариантов")
                .await?;
        }
    }
    Ok(())
}

async fn choose_question_format(
    bot: Bot,
    dialogue: QuizDialogue,
    mut session: QuizSession,
    msg: Message,
) -> HandlerResult {
    match DisplayFormat::from_label(msg.text().unwrap_or_default()) {
        Some(format) => {
            session.set_question_format(format);
            let confirmation = format!(
                "Вопрос: {}\nОтвет: {}",
                session.question_format.label(),
                session.answer_format.label()
            );
            bot.send_message(msg.chat.id, confirmation)
                .reply_markup(menu_keyboard())
                .await?;
            dialogue.update(State::Menu { session }).await?;
        }
        None => {
            bot.send_message(msg.chat.id, "Пожалуйста, выберите один из вариантов")
                .await?;
        }
    }
    Ok(())
}

async fn choose_answer_format(
    bot: Bot,
    dialogue: QuizDialogue,
    mut session: QuizSession,
    msg: Message,
) -> HandlerResult {
    match DisplayFormat::from_label(msg.text().unwrap_or_default()) {
        Some(format) => {
            if session.set_answer_format(format).is_err() {
                bot.send_message(msg.chat.id, "Этот формат совпадает с форматом вопроса")
                    .await?;
                return Ok(());
            }
            bot.send_message(
                msg.chat.id,
                format!("Хорошо, ответы показываются как: {}", format.label()),
            )
            .reply_markup(menu_keyboard())
            .await?;
            dialogue.update(State::Menu { session }).await?;
        }
        None => {
            bot.send_message(msg.chat.id, "Пожалуйста, выберите один из вариантов")
                .await?;
        }
    }
    Ok(())
}

async fn in_quiz(
    bot: Bot,
    dialogue: QuizDialogue,
    mut session: QuizSession,
    corpus: Arc<QuizCorpus>,
    msg: Message,
) -> HandlerResult {
    let text = msg.text().unwrap_or_default();

    if text == BTN_HOME {
        session.go_home();
        show_menu(&bot, msg.chat.id).await?;
        dialogue.update(State::Menu { session }).await?;
        return Ok(());
    }

    if session.phase == Phase::Browsing {
        // The word list has no questions, only the home button
        bot.send_message(msg.chat.id, "Нажми 🏠 Домой, чтобы вернуться в меню")
            .await?;
        dialogue.update(State::InQuiz { session }).await?;
        return Ok(());
    }

    if text == BTN_NEXT {
        match session.next_question(&corpus) {
            Ok(()) => {
                if session.phase == Phase::Active {
                    send_question(&bot, msg.chat.id, &session).await?;
                }
                dialogue.update(State::InQuiz { session }).await?;
            }
            Err(_) => {
                bot.send_message(msg.chat.id, NO_WORDS_TEXT)
                    .reply_markup(menu_keyboard())
                    .await?;
                dialogue.update(State::Menu { session }).await?;
            }
        }
        return Ok(());
    }

    let answer = match resolve_answer(&session, text) {
        Some(answer) => answer,
        None => {
            bot.send_message(msg.chat.id, "Пожалуйста, используйте кнопки ответов")
                .await?;
            dialogue.update(State::InQuiz { session }).await?;
            return Ok(());
        }
    };

    match session.select_answer(answer.clone()) {
        SelectOutcome::Correct { advance } => {
            let reveal = session
                .current_question
                .as_ref()
                .map(|q| q.display_target.clone())
                .unwrap_or_default();
            bot.send_message(msg.chat.id, format!("Правильно! ✅\n{}", reveal))
                .await?;

            // Let the feedback sit on screen for a moment, then move on.
            // The token makes sure a late timer cannot advance a session
            // that has already left this question.
            tokio::time::sleep(std::time::Duration::from_millis(AUTO_ADVANCE_DELAY_MS)).await;
            match session.auto_advance(advance, &corpus) {
                Ok(true) => {
                    send_question(&bot, msg.chat.id, &session).await?;
                    dialogue.update(State::InQuiz { session }).await?;
                }
                Ok(false) => {
                    dialogue.update(State::InQuiz { session }).await?;
                }
                Err(_) => {
                    bot.send_message(msg.chat.id, NO_WORDS_TEXT)
                        .reply_markup(menu_keyboard())
                        .await?;
                    dialogue.update(State::Menu { session }).await?;
                }
            }
        }
        SelectOutcome::Incorrect => {
            let correct_text = correct_answer_text(&session);
            bot.send_message(
                msg.chat.id,
                format!("Неправильно. ❌\nПравильный ответ:\n{}", correct_text),
            )
            .await?;

            // In the syllable game the wrongly picked syllable is played
            // back, the same way the original shows it off after a miss
            if session.mode == QuizMode::Syllables {
                if let AnswerSelection::Choice(id) = answer {
                    let audio = session
                        .current_question
                        .as_ref()
                        .and_then(|q| q.choices.iter().find(|c| c.id == id))
                        .and_then(|c| c.record.audio_file());
                    send_audio_file(&bot, msg.chat.id, audio.as_deref()).await;
                }
            }
            dialogue.update(State::InQuiz { session }).await?;
        }
        SelectOutcome::Ignored => {
            let hint = if session.phase == Phase::Answered {
                "Вопрос уже отвечен. Нажми «Следующий вопрос» или 🏠 Домой"
            } else {
                "Пожалуйста, используйте кнопки ответов"
            };
            bot.send_message(msg.chat.id, hint).await?;
            dialogue.update(State::InQuiz { session }).await?;
        }
    }
    Ok(())
}

// Maps a button press back onto the current question
fn resolve_answer(session: &QuizSession, text: &str) -> Option<AnswerSelection> {
    match session.mode {
        QuizMode::Tones => {
            let position = TONE_SYMBOLS.iter().position(|s| *s == text)?;
            Some(AnswerSelection::Tone(position as u8 + 1))
        }
        QuizMode::Syllables | QuizMode::Vocabulary => {
            let question = session.current_question.as_ref()?;
            let choice = question.choices.iter().find(|c| c.display_text == text)?;
            Some(AnswerSelection::Choice(choice.id))
        }
        QuizMode::VocabularyTable => None,
    }
}

fn correct_answer_text(session: &QuizSession) -> String {
    let question = match &session.current_question {
        Some(question) => question,
        None => return String::new(),
    };
    match session.mode {
        // The tone mark plus the revealed syllable
        QuizMode::Tones => match question.target.tone() {
            Some(tone) => format!(
                "{} ({})",
                TONE_SYMBOLS[(tone - 1) as usize],
                question.display_target
            ),
            None => question.display_target.clone(),
        },
        _ => question
            .choices
            .iter()
            .find(|c| c.id == question.target.id())
            .map(|c| c.display_text.clone())
            .unwrap_or_else(|| question.display_target.clone()),
    }
}

async fn show_menu(bot: &Bot, chat_id: ChatId) -> HandlerResult {
    bot.send_message(chat_id, "Что будем учить?")
        .reply_markup(menu_keyboard())
        .await?;
    Ok(())
}

async fn send_question(bot: &Bot, chat_id: ChatId, session: &QuizSession) -> HandlerResult {
    let question = match &session.current_question {
        Some(question) => question,
        None => return Ok(()),
    };

    send_audio_file(bot, chat_id, question.audio_file.as_deref()).await;

    let score = format!("✅ {}  ❌ {}", session.correct_count, session.incorrect_count);
    let (prompt, keyboard) = match session.mode {
        QuizMode::Syllables => ("Какой это слог?", choices_keyboard(question)),
        QuizMode::Tones => ("Какой это тон?", tones_keyboard()),
        _ => ("Выбери правильный вариант:", choices_keyboard(question)),
    };

    let header = if session.mode == QuizMode::Vocabulary {
        format!("{}\n\n{}\n{}", score, question.display_target, prompt)
    } else {
        // The audio is the whole question in the syllable games
        format!("{}\n\n🔊 ???\n{}", score, prompt)
    };

    bot.send_message(chat_id, header)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

async fn send_word_list(
    bot: &Bot,
    chat_id: ChatId,
    session: &QuizSession,
    corpus: &QuizCorpus,
) -> HandlerResult {
    let words = levels::filter_by_levels(&corpus.words, &session.level_selection);
    bot.send_message(chat_id, format!("Показано слов: {}", words.len()))
        .await?;

    for chunk in words.chunks(TABLE_CHUNK) {
        let lines: Vec<String> = chunk
            .iter()
            .map(|w| {
                format!(
                    "HSK{} #{}  {}  {}  {}",
                    w.level,
                    w.id,
                    w.hanzi,
                    w.pinyin,
                    w.translations.join("; ")
                )
            })
            .collect();
        bot.send_message(chat_id, lines.join("\n"))
            .reply_markup(home_keyboard())
            .await?;
    }
    Ok(())
}

async fn send_levels_view(
    bot: &Bot,
    chat_id: ChatId,
    session: &QuizSession,
    corpus: &QuizCorpus,
) -> HandlerResult {
    let total = levels::total_selected(&corpus.words, &session.level_selection);
    bot.send_message(
        chat_id,
        format!("Всего для игры выбрано: {} слов", total),
    )
    .reply_markup(levels_keyboard(session, corpus))
    .await?;
    Ok(())
}

// A missing file or a failed upload never interrupts the quiz
async fn send_audio_file(bot: &Bot, chat_id: ChatId, filename: Option<&str>) {
    let filename = match filename {
        Some(filename) if !filename.is_empty() => filename,
        _ => return,
    };
    let path = Path::new(SOUNDS_DIR).join(filename);
    if let Err(error) = bot.send_audio(chat_id, InputFile::file(path)).await {
        log::debug!("Audio playback failed for {}: {}", filename, error);
    }
}

fn menu_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![
            KeyboardButton::new(BTN_SYLLABLES),
            KeyboardButton::new(BTN_TONES),
        ],
        vec![
            KeyboardButton::new(BTN_HSK_PLAY),
            KeyboardButton::new(BTN_HSK_TABLE),
        ],
        vec![
            KeyboardButton::new(BTN_LEVELS),
            KeyboardButton::new(BTN_COUNT),
        ],
        vec![
            KeyboardButton::new(BTN_QUESTION_FORMAT),
            KeyboardButton::new(BTN_ANSWER_FORMAT),
        ],
    ])
}

fn choices_keyboard(question: &QuestionSet) -> KeyboardMarkup {
    let mut rows: Vec<Vec<KeyboardButton>> = question
        .choices
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|c| KeyboardButton::new(c.display_text.clone()))
                .collect()
        })
        .collect();
    rows.push(control_row());
    KeyboardMarkup::new(rows)
}

fn tones_keyboard() -> KeyboardMarkup {
    let mut rows: Vec<Vec<KeyboardButton>> = TONE_SYMBOLS
        .iter()
        .map(|symbol| vec![KeyboardButton::new(*symbol)])
        .collect();
    rows.push(control_row());
    KeyboardMarkup::new(rows)
}

fn levels_keyboard(session: &QuizSession, corpus: &QuizCorpus) -> KeyboardMarkup {
    let counts = levels::count_by_level(&corpus.words);
    let mut rows: Vec<Vec<KeyboardButton>> = Vec::new();
    for pair in [[1u8, 2], [3, 4], [5, 6]] {
        rows.push(
            pair.iter()
                .map(|level| {
                    KeyboardButton::new(level_button_label(
                        *level,
                        session,
                        counts[(*level - 1) as usize],
                    ))
                })
                .collect(),
        );
    }
    rows.push(vec![KeyboardButton::new(BTN_BACK)]);
    KeyboardMarkup::new(rows)
}

fn level_button_label(level: u8, session: &QuizSession, count: usize) -> String {
    let mark = if session.level_selection.is_selected(level) {
        "✅"
    } else {
        "☐"
    };
    format!("{} Уровень {} ({})", mark, level, count)
}

fn home_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(BTN_HOME)]])
}

fn control_row() -> Vec<KeyboardButton> {
    vec![
        KeyboardButton::new(BTN_NEXT),
        KeyboardButton::new(BTN_HOME),
    ]
}
