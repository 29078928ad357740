use std::fmt;

use crate::quiz::{Dimension, Letter};

/// Per-letter answer counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    counts: [usize; 8],
}

impl Tally {
    pub fn from_answers(answers: &[Letter]) -> Self {
        let mut tally = Self::default();
        for letter in answers {
            tally.counts[letter.index()] += 1;
        }
        tally
    }

    pub fn count(&self, letter: Letter) -> usize {
        self.counts[letter.index()]
    }

    pub fn axis(&self, dimension: Dimension) -> AxisScore {
        let (first, second) = dimension.letters();
        AxisScore {
            dimension,
            first: self.count(first),
            second: self.count(second),
        }
    }
}

/// Both pole counts for one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisScore {
    pub dimension: Dimension,
    pub first: usize,
    pub second: usize,
}

impl AxisScore {
    /// Ties go to the first pole (E, S, T, J).
    pub fn winner(&self) -> Letter {
        let (first, second) = self.dimension.letters();
        if self.first >= self.second {
            first
        } else {
            second
        }
    }
}

impl fmt::Display for AxisScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (first, second) = self.dimension.letters();
        write!(f, "{}:{} {}:{}", first, self.first, second, self.second)
    }
}

/// A four-letter type, one letter per dimension in E/I, S/N, T/F, J/P order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Classification([Letter; 4]);

impl Classification {
    pub fn letters(&self) -> [Letter; 4] {
        self.0
    }

    pub fn code(&self) -> String {
        self.0.iter().map(|l| l.as_char()).collect()
    }

    pub fn description(&self) -> &'static str {
        use crate::quiz::Letter::*;
        match self.0 {
            [E, N, F, J] => "🌟 타고난 리더, 다른 사람을 이끌고 영감을 주는 사람",
            [E, N, F, P] => "🎨 열정적인 자유로운 영혼, 창의적이고 사교적인 사람",
            [E, N, T, J] => "👑 대담한 통솔자, 목표를 향해 밀고 나가는 사람",
            [E, N, T, P] => "💡 호기심 많은 변론가, 새로운 도전을 즐기는 사람",
            [E, S, F, J] => "🤝 사교적인 집정관, 남을 돕는 데서 기쁨을 찾는 사람",
            [E, S, F, P] => "🎭 자유로운 연예인, 즉흥적이고 열정적인 사람",
            [E, S, T, J] => "📋 엄격한 관리자, 질서와 규칙을 중시하는 사람",
            [E, S, T, P] => "⚡ 모험을 즐기는 사업가, 실용적이고 현실적인 사람",
            [I, N, F, J] => "🔮 선의의 옹호자, 이상과 원칙이 뚜렷한 사람",
            [I, N, F, P] => "🌸 열정적인 중재자, 조화롭고 유연한 사람",
            [I, N, T, J] => "🏗️ 용의주도한 전략가, 독립적이고 결단력 있는 사람",
            [I, N, T, P] => "🔬 논리적인 사색가, 끊임없이 지식을 탐구하는 사람",
            [I, S, F, J] => "🛡️ 용감한 수호자, 따뜻하고 헌신적인 사람",
            [I, S, F, P] => "🎨 호기심 많은 예술가, 유연하고 매력적인 사람",
            [I, S, T, J] => "📚 청렴결백한 논리주의자, 믿음직하고 책임감 강한 사람",
            [I, S, T, P] => "🔧 만능 재주꾼, 대담하고 실용적인 사람",
            _ => "",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

/// Reduces answers to a four-letter type. Pure; an empty sequence is `ESTJ`.
pub fn classify(answers: &[Letter]) -> Classification {
    let tally = Tally::from_answers(answers);
    Classification(Dimension::ALL.map(|dimension| tally.axis(dimension).winner()))
}

/// Per-dimension counts behind a classification, in classification order.
pub fn breakdown(answers: &[Letter]) -> [AxisScore; 4] {
    let tally = Tally::from_answers(answers);
    Dimension::ALL.map(|dimension| tally.axis(dimension))
}
