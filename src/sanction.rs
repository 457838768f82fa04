use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{PatdError, PatdResult};

pub const AGGRAVATOR_LETTERS: &str = "abcdefghi";
pub const MITIGATOR_LETTERS: &str = "abcdef";
pub const REINCIDENCE_LETTER: char = 'b';
pub const MULTIPLE_TRANSGRESSIONS_LETTER: char = 'c';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanctionType {
    Reprimand,
    Detention,
    Arrest,
}

impl SanctionType {
    pub fn as_str(self) -> &'static str {
        match self {
            SanctionType::Reprimand => "reprimand",
            SanctionType::Detention => "detention",
            SanctionType::Arrest => "arrest",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SanctionType::Reprimand => "repreensão por escrito",
            SanctionType::Detention => "detenção",
            SanctionType::Arrest => "prisão",
        }
    }
}

impl FromStr for SanctionType {
    type Err = PatdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = fold_accents(value);
        match normalized.as_str() {
            "reprimand" | "repreensao" | "repreensao por escrito" => Ok(SanctionType::Reprimand),
            "detention" | "detencao" => Ok(SanctionType::Detention),
            "arrest" | "prisao" => Ok(SanctionType::Arrest),
            other => Err(PatdError::validation(format!("unknown sanction type {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sanction {
    #[serde(rename = "type")]
    pub kind: SanctionType,
    pub days: u32,
}

impl Sanction {
    pub fn reprimand() -> Self {
        Self {
            kind: SanctionType::Reprimand,
            days: 0,
        }
    }

    /// Validating constructor: reprimands carry no days, the others an even
    /// count of at least two.
    pub fn new(kind: SanctionType, days: u32) -> PatdResult<Self> {
        let sanction = Self { kind, days };
        sanction.validate()?;
        Ok(sanction)
    }

    pub fn validate(&self) -> PatdResult<()> {
        match self.kind {
            SanctionType::Reprimand if self.days != 0 => Err(PatdError::validation(
                "a written reprimand carries no days",
            )),
            SanctionType::Reprimand => Ok(()),
            _ if self.days < 2 => Err(PatdError::validation(format!(
                "{} requires at least 2 days",
                self.kind.label()
            ))),
            _ if self.days % 2 != 0 => Err(PatdError::validation(format!(
                "{} days must be even, got {}",
                self.kind.label(),
                self.days
            ))),
            _ => Ok(()),
        }
    }

    pub fn natureza(&self) -> Natureza {
        Natureza::from_sanction(self.kind)
    }

    pub fn is_restrictive(&self) -> bool {
        self.kind != SanctionType::Reprimand
    }
}

impl fmt::Display for Sanction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SanctionType::Reprimand => f.write_str(self.kind.label()),
            _ => write!(f, "{} dias de {}", self.days, self.kind.label()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Natureza {
    Grave,
    Media,
    Leve,
}

impl Natureza {
    pub fn from_sanction(kind: SanctionType) -> Self {
        match kind {
            SanctionType::Arrest => Natureza::Grave,
            SanctionType::Detention => Natureza::Media,
            SanctionType::Reprimand => Natureza::Leve,
        }
    }

    pub fn default_base(self) -> BasePenalty {
        match self {
            Natureza::Grave => BasePenalty::new(SanctionType::Arrest, 6),
            Natureza::Media => BasePenalty::new(SanctionType::Detention, 4),
            Natureza::Leve => BasePenalty::new(SanctionType::Reprimand, 0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Natureza::Grave => "grave",
            Natureza::Media => "média",
            Natureza::Leve => "leve",
        }
    }
}

impl FromStr for Natureza {
    type Err = PatdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match fold_accents(value).as_str() {
            "grave" => Ok(Natureza::Grave),
            "media" => Ok(Natureza::Media),
            "leve" => Ok(Natureza::Leve),
            other => Err(PatdError::validation(format!("unknown natureza {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasePenalty {
    #[serde(rename = "type")]
    pub kind: SanctionType,
    pub days: u32,
}

impl BasePenalty {
    pub fn new(kind: SanctionType, days: u32) -> Self {
        Self { kind, days }
    }
}

pub fn textbook_base(transgression: &str) -> Option<BasePenalty> {
    let text = fold_accents(transgression);
    let matches_any = |needles: &[&str]| needles.iter().any(|needle| text.contains(needle));

    if matches_any(&["falta ao servico", "faltar ao servico", "faltou ao servico"]) {
        return Some(BasePenalty::new(SanctionType::Arrest, 6));
    }
    if matches_any(&[
        "falta a missao",
        "faltar a missao",
        "faltou a missao",
    ]) {
        return Some(BasePenalty::new(SanctionType::Detention, 6));
    }
    None
}

pub fn aggravator_weight(letter: char) -> Option<i64> {
    match letter {
        'a' | 'd' | 'e' | 'f' => Some(4),
        'b' | 'c' | 'g' | 'h' | 'i' => Some(2),
        _ => None,
    }
}

pub fn mitigator_weight(letter: char) -> Option<i64> {
    match letter {
        'a' | 'b' | 'c' => Some(2),
        'd' | 'e' | 'f' => Some(4),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatorInput {
    pub items: Vec<u32>,
    pub aggravators: Vec<char>,
    pub mitigators: Vec<char>,
    pub reincidence_count: u32,
    pub base: Option<BasePenalty>,
    pub natureza: Option<Natureza>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanctionOutcome {
    pub sanction: Sanction,
    pub aggravators: Vec<char>,
    pub mitigators: Vec<char>,
    /// Mitigators took a positive aggregate down to zero or below.
    pub floored: bool,
    pub rationale: String,
}

impl SanctionOutcome {
    pub fn natureza(&self) -> Natureza {
        self.sanction.natureza()
    }
}

pub fn normalize_letters(letters: &[char], allowed: &str, what: &str) -> PatdResult<BTreeSet<char>> {
    letters
        .iter()
        .map(|letter| letter.to_ascii_lowercase())
        .map(|letter| {
            if allowed.contains(letter) {
                Ok(letter)
            } else {
                Err(PatdError::validation(format!("unknown {what} letter '{letter}'")))
            }
        })
        .collect()
}

pub fn calculate(input: &CalculatorInput) -> PatdResult<SanctionOutcome> {
    let mut aggravators = normalize_letters(&input.aggravators, AGGRAVATOR_LETTERS, "aggravator")?;
    let mitigators = normalize_letters(&input.mitigators, MITIGATOR_LETTERS, "mitigator")?;

    let distinct_items: BTreeSet<u32> = input.items.iter().copied().collect();
    if distinct_items.len() >= 2 {
        aggravators.insert(MULTIPLE_TRANSGRESSIONS_LETTER);
    }
    if input.reincidence_count > 0 {
        aggravators.insert(REINCIDENCE_LETTER);
    } else {
        aggravators.remove(&REINCIDENCE_LETTER);
    }

    let base = input
        .base
        .unwrap_or_else(|| input.natureza.unwrap_or(Natureza::Media).default_base());

    let mut steps = vec![format!(
        "base: {}",
        describe_days(base.kind, i64::from(base.days))
    )];
    let mut total = i64::from(base.days);

    for letter in &aggravators {
        let weight = if *letter == REINCIDENCE_LETTER {
            2 * i64::from(input.reincidence_count)
        } else {
            aggravator_weight(*letter).unwrap_or(0)
        };
        total += weight;
        steps.push(format!("agravante {letter} (+{weight})"));
    }
    let before_mitigators = total;
    for letter in &mitigators {
        let weight = mitigator_weight(*letter).unwrap_or(0);
        total -= weight;
        steps.push(format!("atenuante {letter} (-{weight})"));
    }

    let summed = total;
    if total % 2 != 0 {
        total += 1;
        steps.push(format!("arredondado de {summed} para {total} (paridade)"));
    }

    let floored = total <= 0 && !mitigators.is_empty() && before_mitigators > 0;
    let sanction = if total <= 0 {
        steps.push("resultado não positivo: repreensão por escrito".to_string());
        Sanction::reprimand()
    } else {
        let days = u32::try_from(total).map_err(PatdError::internal)?;
        let kind = if base.kind == SanctionType::Reprimand {
            steps.push("agravantes convertem a repreensão em detenção".to_string());
            SanctionType::Detention
        } else {
            base.kind
        };
        // Positive totals are even here, so the minimum of 2 days holds.
        Sanction::new(kind, days)?
    };

    steps.push(format!("resultado: {sanction}"));

    Ok(SanctionOutcome {
        sanction,
        aggravators: aggravators.into_iter().collect(),
        mitigators: mitigators.into_iter().collect(),
        floored,
        rationale: steps.join("; "),
    })
}

fn describe_days(kind: SanctionType, days: i64) -> String {
    match kind {
        SanctionType::Reprimand => kind.label().to_string(),
        _ => format!("{days} dias de {}", kind.label()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorClass {
    Mau,
    Insuficiente,
    Bom,
    Otimo,
    Excepcional,
}

impl BehaviorClass {
    pub fn label(self) -> &'static str {
        match self {
            BehaviorClass::Mau => "mau",
            BehaviorClass::Insuficiente => "insuficiente",
            BehaviorClass::Bom => "bom",
            BehaviorClass::Otimo => "ótimo",
            BehaviorClass::Excepcional => "excepcional",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanctionRecord {
    pub reprimands: u32,
    pub detentions: u32,
    pub arrests: u32,
}

impl SanctionRecord {
    pub fn from_sanctions<'a>(sanctions: impl IntoIterator<Item = &'a Sanction>) -> Self {
        sanctions
            .into_iter()
            .fold(Self::default(), |record, sanction| record.with(sanction))
    }

    pub fn with(mut self, sanction: &Sanction) -> Self {
        match sanction.kind {
            SanctionType::Reprimand => self.reprimands += 1,
            SanctionType::Detention => self.detentions += 1,
            SanctionType::Arrest => self.arrests += 1,
        }
        self
    }

    pub fn restrictive(&self) -> u32 {
        self.detentions + self.arrests
    }

    fn detention_equivalents(&self) -> u32 {
        self.detentions + 2 * self.arrests
    }

    pub fn behavior(&self) -> BehaviorClass {
        match (self.detention_equivalents(), self.reprimands) {
            (0, 0) => BehaviorClass::Otimo,
            (0, 1..=2) => BehaviorClass::Bom,
            (0, _) => BehaviorClass::Insuficiente,
            (1..=2, _) => BehaviorClass::Insuficiente,
            _ => BehaviorClass::Mau,
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "comportamento {}; punições anteriores: {} repreensão(ões), {} detenção(ões), {} prisão(ões)",
            self.behavior().label(),
            self.reprimands,
            self.detentions,
            self.arrests
        )
    }
}

pub fn behavior_delta(prior: &SanctionRecord, new: &Sanction) -> String {
    let before = prior.behavior();
    let after = prior.with(new).behavior();
    if before == after {
        format!("permanece em {}", before.label())
    } else {
        format!("passa de {} para {}", before.label(), after.label())
    }
}

pub fn fold_accents(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .chars()
        .map(|ch| match ch {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detention(days: u32) -> Option<BasePenalty> {
        Some(BasePenalty::new(SanctionType::Detention, days))
    }

    #[test]
    fn reincidence_and_multiple_items_add_up() {
        let outcome = calculate(&CalculatorInput {
            items: vec![12, 31],
            aggravators: vec!['b', 'c'],
            mitigators: vec!['a'],
            reincidence_count: 2,
            base: detention(6),
            natureza: None,
        })
        .unwrap();
        assert_eq!(outcome.sanction, Sanction::new(SanctionType::Detention, 10).unwrap());
        assert_eq!(outcome.aggravators, vec!['b', 'c']);
        assert!(!outcome.floored);
    }

    #[test]
    fn negative_total_becomes_reprimand() {
        let outcome = calculate(&CalculatorInput {
            mitigators: vec!['d'],
            base: detention(2),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(outcome.sanction, Sanction::reprimand());
        assert!(outcome.floored);
        assert_eq!(outcome.natureza(), Natureza::Leve);
    }

    #[test]
    fn three_items_add_multiple_transgression_letter_once() {
        let outcome = calculate(&CalculatorInput {
            items: vec![1, 2, 3],
            aggravators: vec!['c'],
            base: detention(4),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(outcome.aggravators, vec!['c']);
        assert_eq!(outcome.sanction.days, 6);
    }

    #[test]
    fn odd_totals_round_up_to_even() {
        let outcome = calculate(&CalculatorInput {
            base: Some(BasePenalty::new(SanctionType::Detention, 5)),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(outcome.sanction.days, 6);
    }

    #[test]
    fn reprimand_base_is_promoted_by_aggravators() {
        let outcome = calculate(&CalculatorInput {
            aggravators: vec!['g'],
            natureza: Some(Natureza::Leve),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(outcome.sanction, Sanction::new(SanctionType::Detention, 2).unwrap());
        assert_eq!(outcome.natureza(), Natureza::Media);
    }

    #[test]
    fn plain_leve_stays_reprimand() {
        let outcome = calculate(&CalculatorInput {
            natureza: Some(Natureza::Leve),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(outcome.sanction, Sanction::reprimand());
        assert!(!outcome.floored);
    }

    #[test]
    fn mitigators_on_a_reprimand_base_do_not_floor() {
        let outcome = calculate(&CalculatorInput {
            natureza: Some(Natureza::Leve),
            mitigators: vec!['a'],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(outcome.sanction, Sanction::reprimand());
        assert!(!outcome.floored);
    }

    #[test]
    fn reincidence_letter_without_record_is_dropped() {
        let outcome = calculate(&CalculatorInput {
            aggravators: vec!['b'],
            reincidence_count: 0,
            base: detention(6),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(outcome.sanction, Sanction::new(SanctionType::Detention, 6).unwrap());
        assert!(outcome.aggravators.is_empty());
        assert!(!outcome.rationale.contains("agravante b"));
    }

    #[test]
    fn natureza_defaults_drive_base() {
        let grave = calculate(&CalculatorInput {
            natureza: Some(Natureza::Grave),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(grave.sanction, Sanction::new(SanctionType::Arrest, 6).unwrap());

        let media = calculate(&CalculatorInput::default()).unwrap();
        assert_eq!(media.sanction, Sanction::new(SanctionType::Detention, 4).unwrap());
    }

    #[test]
    fn rejects_unknown_letters() {
        let err = calculate(&CalculatorInput {
            mitigators: vec!['g'],
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn calculation_is_deterministic() {
        let input = CalculatorInput {
            items: vec![4, 9],
            aggravators: vec!['e', 'a'],
            mitigators: vec!['b'],
            reincidence_count: 1,
            base: None,
            natureza: Some(Natureza::Grave),
        };
        assert_eq!(calculate(&input).unwrap(), calculate(&input).unwrap());
    }

    #[test]
    fn textbook_archetypes_are_recognised() {
        assert_eq!(
            textbook_base("O militar FALTOU ao serviço de sentinela"),
            Some(BasePenalty::new(SanctionType::Arrest, 6))
        );
        assert_eq!(
            textbook_base("Falta à missão de apoio aéreo"),
            detention(6)
        );
        assert_eq!(textbook_base("Chegou atrasado à formatura"), None);
    }

    #[test]
    fn sanction_shape_is_validated() {
        assert!(Sanction::new(SanctionType::Detention, 3).is_err());
        assert!(Sanction::new(SanctionType::Arrest, 0).is_err());
        assert!(Sanction::new(SanctionType::Reprimand, 2).is_err());
        assert!(Sanction::new(SanctionType::Arrest, 8).is_ok());
    }

    #[test]
    fn first_detention_moves_bom_to_insuficiente() {
        let prior = SanctionRecord {
            reprimands: 1,
            ..Default::default()
        };
        assert_eq!(prior.behavior(), BehaviorClass::Bom);
        let delta = behavior_delta(&prior, &Sanction::new(SanctionType::Detention, 4).unwrap());
        assert_eq!(delta, "passa de bom para insuficiente");
    }

    #[test]
    fn unchanged_behavior_is_reported() {
        let prior = SanctionRecord {
            detentions: 3,
            ..Default::default()
        };
        let delta = behavior_delta(&prior, &Sanction::reprimand());
        assert_eq!(delta, "permanece em mau");
    }

    #[test]
    fn parses_portuguese_labels() {
        assert_eq!("Detenção".parse::<SanctionType>().unwrap(), SanctionType::Detention);
        assert_eq!("média".parse::<Natureza>().unwrap(), Natureza::Media);
    }
}
