use crate::quiz::{self, Choice, Dimension, Letter, Question, QuizError};

struct BaseQuestion {
    text: &'static str,
    dimension: Dimension,
    options: [(&'static str, Letter); 2],
}

// Entry `i` belongs to `Dimension::ALL[i % 4]`, so cycling the table in
// rounds of four always yields one question per dimension per round.
const BASE_QUESTIONS: [BaseQuestion; 8] = [
    BaseQuestion {
        text: "새로운 사람들과의 모임에서 당신은?",
        dimension: Dimension::EI,
        options: [
            ("먼저 다가가 말을 걸고 대화를 이끈다", Letter::E),
            ("조용히 있다가 누군가 말을 걸어 주기를 기다린다", Letter::I),
        ],
    },
    BaseQuestion {
        text: "새로운 정보를 배울 때 당신은?",
        dimension: Dimension::SN,
        options: [
            ("구체적인 사실과 세부사항부터 차근차근 익힌다", Letter::S),
            ("전체적인 개념과 원리를 먼저 파악한다", Letter::N),
        ],
    },
    BaseQuestion {
        text: "중요한 결정을 내릴 때 당신은?",
        dimension: Dimension::TF,
        options: [
            ("논리적인 분석과 객관적인 기준을 따른다", Letter::T),
            ("관련된 사람들의 감정과 가치를 먼저 생각한다", Letter::F),
        ],
    },
    BaseQuestion {
        text: "여행 계획을 세울 때 당신은?",
        dimension: Dimension::JP,
        options: [
            ("일정을 미리 자세히 짜고 예약까지 마친다", Letter::J),
            ("큰 방향만 정하고 현지에서 즉흥적으로 움직인다", Letter::P),
        ],
    },
    BaseQuestion {
        text: "주말에 에너지를 충전하는 방법은?",
        dimension: Dimension::EI,
        options: [
            ("친구들을 만나 활발하게 이야기하며 보낸다", Letter::E),
            ("혼자만의 조용한 시간을 가지며 쉰다", Letter::I),
        ],
    },
    BaseQuestion {
        text: "문제를 해결할 때 당신은?",
        dimension: Dimension::SN,
        options: [
            ("검증된 방법과 지난 경험을 활용한다", Letter::S),
            ("새로운 아이디어와 창의적인 방법을 시도한다", Letter::N),
        ],
    },
    BaseQuestion {
        text: "팀 안에서 갈등이 생기면 당신은?",
        dimension: Dimension::TF,
        options: [
            ("사실에 근거해 원인을 분석하고 해결책을 찾는다", Letter::T),
            ("구성원들의 마음을 달래고 화합을 이끌어 낸다", Letter::F),
        ],
    },
    BaseQuestion {
        text: "업무나 과제를 처리할 때 당신은?",
        dimension: Dimension::JP,
        options: [
            ("계획을 세워 단계별로 체계적으로 진행한다", Letter::J),
            ("상황에 맞춰 순서를 유연하게 바꿔 가며 진행한다", Letter::P),
        ],
    },
];

impl BaseQuestion {
    fn to_question(&self) -> Question {
        let [(first_text, first_letter), (second_text, second_letter)] = self.options;
        Question::new(
            self.text,
            self.dimension,
            [
                Choice::new(first_text, first_letter),
                Choice::new(second_text, second_letter),
            ],
        )
    }
}

/// The fixed fallback questions in table order.
pub fn base_questions() -> Vec<Question> {
    BASE_QUESTIONS.iter().map(BaseQuestion::to_question).collect()
}

/// Builds `count` questions by cycling the base table in rounds of four.
///
/// The output is deterministic for a given `count` and holds exactly
/// `count / 4` questions per dimension. Once `count` exceeds the table size
/// questions repeat.
pub fn synthesize_questions(count: usize) -> Result<Vec<Question>, QuizError> {
    let rounds = quiz::questions_per_dimension(count)?;
    let bank = base_questions();
    let dimensions = Dimension::ALL.len();

    let mut questions = Vec::with_capacity(count);
    for round in 0..rounds {
        for dimension_index in 0..dimensions {
            let index = (round * dimensions + dimension_index) % bank.len();
            questions.push(bank[index].clone());
        }
    }
    Ok(questions)
}
