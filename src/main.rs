mod config;
mod quiz;

use std::sync::Arc;

use dotenv::dotenv;
use quiz::{
    ai_helper::ChatGptQuestionSource,
    generator::{QuestionGenerator, QuestionOrigin},
    scoring, Question, QuizAttempt, QuizError,
};
use teloxide::{
    dispatching::dialogue::InMemStorage,
    prelude::*,
    types::{ChatAction, KeyboardButton, KeyboardMarkup},
};

type QuizDialogue = Dialogue<State, InMemStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type Generator = Arc<QuestionGenerator<ChatGptQuestionSource>>;

#[derive(Clone, Default)]
pub enum State {
    #[default]
    Start,
    ReceiveQuestionCount,
    Quiz {
        attempt: QuizAttempt,
    },
}

const QUESTION_COUNTS: [usize; 5] = [4, 8, 12, 16, 20];
const RESTART: &str = "🔄 다시 시작";

#[tokio::main]
async fn main() {
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting MBTI quiz bot...");

    let settings = match config::Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            log::error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };
    log::debug!("Loaded {:?}", settings);

    let source = match ChatGptQuestionSource::new(&settings) {
        Ok(source) => source,
        Err(err) => {
            log::error!("Unable to set up the ChatGPT client: {}", err);
            std::process::exit(1);
        }
    };
    let generator: Generator =
        Arc::new(QuestionGenerator::new(source).with_max_attempts(settings.max_attempts));

    let bot = Bot::from_env();

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, InMemStorage<State>, State>()
            .branch(dptree::case![State::Start].endpoint(start))
            .branch(
                dptree::case![State::ReceiveQuestionCount].endpoint(
                    move |bot: Bot, dialogue: QuizDialogue, msg: Message| {
                        receive_question_count(generator.clone(), bot, dialogue, msg)
                    },
                ),
            )
            .branch(dptree::case![State::Quiz { attempt }].endpoint(quiz_step)),
    )
    .dependencies(dptree::deps![InMemStorage::<State>::new()])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;
}

fn count_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![QUESTION_COUNTS
        .iter()
        .map(|count| KeyboardButton::new(count.to_string()))
        .collect::<Vec<_>>()])
}

fn option_label(index: usize, text: &str) -> String {
    let marker = if index == 0 { 'A' } else { 'B' };
    format!("{}. {}", marker, text)
}

fn question_keyboard(question: &Question) -> KeyboardMarkup {
    let mut rows = question
        .options
        .iter()
        .enumerate()
        .map(|(i, choice)| vec![KeyboardButton::new(option_label(i, &choice.text))])
        .collect::<Vec<_>>();
    rows.push(vec![KeyboardButton::new(RESTART)]);
    KeyboardMarkup::new(rows)
}

/// Maps the text of a pressed button back to the option index.
fn chosen_option(question: &Question, text: &str) -> Option<usize> {
    question
        .options
        .iter()
        .enumerate()
        .position(|(i, choice)| option_label(i, &choice.text) == text)
}

const GREETING_TEXT: &str = "🧠 안녕하세요! AI가 만든 질문으로 MBTI 성격 유형을 알아보는 봇입니다.\n\
질문이 많을수록 결과가 더 정확해져요. 질문 개수를 골라 주세요 (4의 배수).";
async fn start(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, GREETING_TEXT)
        .reply_markup(count_keyboard())
        .await?;

    dialogue.update(State::ReceiveQuestionCount).await?;
    Ok(())
}

async fn receive_question_count(
    generator: Generator,
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
) -> HandlerResult {
    let Some(count) = msg.text().and_then(|text| text.trim().parse::<usize>().ok()) else {
        bot.send_message(msg.chat.id, "숫자를 입력해 주세요")
            .reply_markup(count_keyboard())
            .await?;
        return Ok(());
    };

    let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;
    bot.send_message(
        msg.chat.id,
        format!("🤔 AI가 {}개의 맞춤형 질문을 만들고 있어요...", count),
    )
    .await?;

    let generated = match generator.generate_questions(count).await {
        Ok(generated) => generated,
        Err(QuizError::InvalidCount { .. }) => {
            bot.send_message(msg.chat.id, "질문 개수는 4의 배수여야 해요")
                .reply_markup(count_keyboard())
                .await?;
            return Ok(());
        }
        Err(QuizError::Auth(_)) => {
            bot.send_message(
                msg.chat.id,
                "🚫 API 키가 올바르지 않아 테스트를 진행할 수 없습니다. 관리자에게 문의해 주세요.",
            )
            .await?;
            dialogue.exit().await?;
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if generated.origin == QuestionOrigin::Fallback {
        bot.send_message(
            msg.chat.id,
            "⚠️ AI 질문 생성에 실패해서 기본 질문으로 진행합니다.",
        )
        .await?;
    }

    let attempt = QuizAttempt::new(generated.questions);
    send_question(&bot, msg.chat.id, &attempt).await?;

    dialogue.update(State::Quiz { attempt }).await?;
    Ok(())
}

async fn send_question(bot: &Bot, chat_id: ChatId, attempt: &QuizAttempt) -> HandlerResult {
    let Some(question) = attempt.current_question() else {
        return Ok(());
    };
    let (answered, total) = attempt.progress();

    bot.send_message(
        chat_id,
        format!("질문 {}/{}\n\n{}", answered + 1, total, question.text),
    )
    .reply_markup(question_keyboard(question))
    .await?;
    Ok(())
}

fn result_text(attempt: &QuizAttempt) -> Option<String> {
    let classification = attempt.result()?;
    let axes = scoring::breakdown(attempt.answers())
        .iter()
        .map(|axis| format!("{} → {} ({})", axis.dimension, axis.winner(), axis))
        .collect::<Vec<_>>()
        .join("\n");

    Some(format!(
        "🎉 테스트 완료!\n\n당신의 성격 유형은 {} 입니다!\n{}\n\n📝 상세 분석\n{}",
        classification,
        classification.description(),
        axes
    ))
}

async fn quiz_step(
    bot: Bot,
    dialogue: QuizDialogue,
    mut attempt: QuizAttempt,
    msg: Message,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "버튼으로 답을 골라 주세요").await?;
        return Ok(());
    };

    if text == RESTART {
        bot.send_message(msg.chat.id, "테스트를 처음부터 다시 시작합니다. 질문 개수를 골라 주세요.")
            .reply_markup(count_keyboard())
            .await?;
        dialogue.update(State::ReceiveQuestionCount).await?;
        return Ok(());
    }

    let Some(choice) = attempt
        .current_question()
        .and_then(|question| chosen_option(question, text))
    else {
        bot.send_message(msg.chat.id, "두 선택지 중 하나를 골라 주세요").await?;
        send_question(&bot, msg.chat.id, &attempt).await?;
        return Ok(());
    };
    attempt.answer(choice)?;

    if let Some(result) = result_text(&attempt) {
        bot.send_message(msg.chat.id, result).await?;
        bot.send_message(msg.chat.id, "한 번 더 해 볼까요? 질문 개수를 골라 주세요.")
            .reply_markup(count_keyboard())
            .await?;
        dialogue.update(State::ReceiveQuestionCount).await?;
        return Ok(());
    }

    send_question(&bot, msg.chat.id, &attempt).await?;
    dialogue.update(State::Quiz { attempt }).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{bank, Letter};

    #[test]
    fn buttons_map_back_to_their_option() {
        let question = &bank::base_questions()[0];
        let second = option_label(1, &question.options[1].text);
        assert_eq!(chosen_option(question, &second), Some(1));
        assert_eq!(chosen_option(question, "C. 둘 다"), None);
        assert_eq!(chosen_option(question, RESTART), None);
    }

    #[test]
    fn result_is_only_available_once_complete() {
        let mut attempt = QuizAttempt::new(bank::synthesize_questions(4).unwrap());
        for _ in 0..3 {
            attempt.answer(1).unwrap();
        }
        assert!(result_text(&attempt).is_none());

        assert_eq!(attempt.answer(1), Ok(Letter::P));
        let text = result_text(&attempt).unwrap();
        assert!(text.contains("INFP"));
        assert!(text.contains("E/I → I (E:0 I:1)"));
    }
}
