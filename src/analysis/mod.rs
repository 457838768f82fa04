use std::collections::BTreeSet;

use serde::{de::DeserializeOwned, Deserialize};
use tracing::{info, warn};

use crate::{
    error::{PatdError, PatdResult},
    llm::{LlmGateway, LlmRequest},
    patd::{Circumstances, RegulatoryItem},
    sanction::{
        self, textbook_base, CalculatorInput, Natureza, Sanction, SanctionOutcome,
        SanctionRecord, SanctionType, AGGRAVATOR_LETTERS, MITIGATOR_LETTERS, REINCIDENCE_LETTER,
    },
};

pub mod catalog;
pub mod prompts;

const MAX_ATTEMPTS: usize = 2;
const AUXILIARY_WORD_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
struct ItemReply {
    number: u32,
}

#[derive(Debug, Deserialize)]
struct ClassifyReply {
    items: Vec<ItemReply>,
}

#[derive(Debug, Deserialize)]
struct AssessReply {
    #[serde(default)]
    aggravators: Vec<String>,
    #[serde(default)]
    mitigators: Vec<String>,
    #[serde(default)]
    items: Vec<u32>,
    natureza: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SuggestReply {
    #[serde(rename = "type")]
    kind: String,
    days: i64,
    #[serde(default)]
    explanation: String,
}

#[derive(Debug, Deserialize)]
struct RewriteReply {
    formal: String,
    affirmative: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub aggravators: Vec<char>,
    pub mitigators: Vec<char>,
    pub items: Vec<u32>,
    pub natureza: Option<Natureza>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// `None` when the model proposed something the rules cannot produce,
    /// such as an odd number of days.
    pub sanction: Option<Sanction>,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub formal: String,
    pub affirmative: String,
}

#[derive(Debug, Clone)]
pub struct AnalysisInput<'a> {
    pub transgression: &'a str,
    pub defense: Option<&'a str>,
    pub history: SanctionRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub items: Vec<RegulatoryItem>,
    pub circumstances: Circumstances,
    pub outcome: SanctionOutcome,
    pub model_suggestion: Option<Sanction>,
    pub explanation: String,
}

impl AnalysisResult {
    pub fn sanction(&self) -> Sanction {
        self.outcome.sanction
    }

    /// Text kept on the case: the calculator rationale, then the model's
    /// explanation when it agreed.
    pub fn summary(&self) -> String {
        if self.model_suggestion == Some(self.outcome.sanction) && !self.explanation.is_empty() {
            format!("{} ({})", self.outcome.rationale, self.explanation)
        } else {
            self.outcome.rationale.clone()
        }
    }
}

fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

fn parse_reply<T: DeserializeOwned>(raw: &str) -> PatdResult<T> {
    serde_json::from_str(extract_json(raw))
        .map_err(|err| PatdError::AiFailure(format!("reply does not match the expected shape: {err}")))
}

/// Sends `request` and converts the reply, trying once more with the same
/// prompt when the call, the parse or the conversion fails.
async fn ask<T, U, F>(
    llm: &dyn LlmGateway,
    step: &'static str,
    request: &LlmRequest,
    convert: F,
) -> PatdResult<U>
where
    T: DeserializeOwned,
    F: Fn(T) -> PatdResult<U>,
{
    let mut last_error = String::new();
    for attempt in 1..=MAX_ATTEMPTS {
        let result = match llm.complete(request).await {
            Ok(raw) => parse_reply::<T>(&raw).and_then(&convert),
            Err(err) => Err(PatdError::AiFailure(format!("{err:#}"))),
        };
        match result {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(step, attempt, error = %err, "model reply rejected");
                last_error = err.to_string();
            }
        }
    }
    Err(PatdError::AiFailure(format!("{step}: {last_error}")))
}

fn catalog_items(numbers: impl IntoIterator<Item = u32>) -> PatdResult<Vec<RegulatoryItem>> {
    let distinct: BTreeSet<u32> = numbers.into_iter().collect();
    distinct
        .into_iter()
        .map(|number| {
            catalog::item(number)
                .ok_or_else(|| PatdError::AiFailure(format!("item {number} is not in the catalog")))
        })
        .collect()
}

fn parse_letters(values: &[String], allowed: &str, what: &str) -> PatdResult<Vec<char>> {
    let letters = values
        .iter()
        .map(|value| {
            value
                .trim()
                .chars()
                .next()
                .ok_or_else(|| PatdError::AiFailure(format!("empty {what} letter")))
        })
        .collect::<PatdResult<Vec<char>>>()?;
    let normalized = sanction::normalize_letters(&letters, allowed, what)
        .map_err(|err| PatdError::AiFailure(err.to_string()))?;
    Ok(normalized.into_iter().collect())
}

fn limit_words(text: &str, limit: usize) -> String {
    text.split_whitespace()
        .take(limit)
        .collect::<Vec<_>>()
        .join(" ")
}

pub async fn classify_items(llm: &dyn LlmGateway, transgression: &str) -> PatdResult<Vec<RegulatoryItem>> {
    let request = prompts::classify_items(transgression);
    ask(llm, "classify_items", &request, |reply: ClassifyReply| {
        if reply.items.is_empty() {
            return Err(PatdError::AiFailure("no regulatory item selected".into()));
        }
        catalog_items(reply.items.into_iter().map(|item| item.number))
    })
    .await
}

pub async fn assess_circumstances(
    llm: &dyn LlmGateway,
    history: &str,
    transgression: &str,
    defense: Option<&str>,
    items: &[RegulatoryItem],
) -> PatdResult<Assessment> {
    let request = prompts::assess_circumstances(history, transgression, defense, items);
    ask(llm, "assess_circumstances", &request, |reply: AssessReply| {
        catalog_items(reply.items.iter().copied())?;
        let natureza = reply
            .natureza
            .as_deref()
            .map(str::parse::<Natureza>)
            .transpose()
            .map_err(|err| PatdError::AiFailure(err.to_string()))?;
        Ok(Assessment {
            aggravators: parse_letters(&reply.aggravators, AGGRAVATOR_LETTERS, "aggravator")?,
            mitigators: parse_letters(&reply.mitigators, MITIGATOR_LETTERS, "mitigator")?,
            items: reply.items,
            natureza,
        })
    })
    .await
}

pub async fn suggest_sanction(
    llm: &dyn LlmGateway,
    transgression: &str,
    aggravators: &[char],
    mitigators: &[char],
    items: &[RegulatoryItem],
    observation: &str,
) -> PatdResult<Suggestion> {
    let request =
        prompts::suggest_sanction(transgression, aggravators, mitigators, items, observation);
    ask(llm, "suggest_sanction", &request, |reply: SuggestReply| {
        let kind = reply
            .kind
            .parse::<SanctionType>()
            .map_err(|err| PatdError::AiFailure(err.to_string()))?;
        let days = u32::try_from(reply.days)
            .map_err(|_| PatdError::AiFailure(format!("negative days {}", reply.days)))?;
        Ok(Suggestion {
            sanction: Sanction::new(kind, days).ok(),
            explanation: reply.explanation.trim().to_string(),
        })
    })
    .await
}

pub async fn summarize_defense(llm: &dyn LlmGateway, defense: &str) -> PatdResult<String> {
    if defense.trim().is_empty() {
        return Err(PatdError::validation("there is no defense to summarize"));
    }
    let request = prompts::summarize_defense(defense);
    let mut last_error = String::new();
    for attempt in 1..=MAX_ATTEMPTS {
        match llm.complete(&request).await {
            Ok(raw) if !raw.trim().is_empty() => {
                return Ok(limit_words(raw.trim(), AUXILIARY_WORD_LIMIT));
            }
            Ok(_) => last_error = "empty summary".to_string(),
            Err(err) => last_error = format!("{err:#}"),
        }
        warn!(step = "summarize_defense", attempt, error = %last_error, "model reply rejected");
    }
    Err(PatdError::AiFailure(format!("summarize_defense: {last_error}")))
}

pub async fn rewrite_occurrence(llm: &dyn LlmGateway, transgression: &str) -> PatdResult<Rewrite> {
    if transgression.trim().is_empty() {
        return Err(PatdError::validation("there is no occurrence to rewrite"));
    }
    let request = prompts::rewrite_occurrence(transgression);
    ask(llm, "rewrite_occurrence", &request, |reply: RewriteReply| {
        let formal = limit_words(reply.formal.trim(), AUXILIARY_WORD_LIMIT);
        let affirmative = limit_words(reply.affirmative.trim(), AUXILIARY_WORD_LIMIT);
        if formal.is_empty() || affirmative.is_empty() {
            return Err(PatdError::AiFailure("rewrite came back empty".into()));
        }
        Ok(Rewrite { formal, affirmative })
    })
    .await
}

pub async fn analyze(llm: &dyn LlmGateway, input: &AnalysisInput<'_>) -> PatdResult<AnalysisResult> {
    let history = input.history.describe();
    let classified = classify_items(llm, input.transgression).await?;
    let assessment =
        assess_circumstances(llm, &history, input.transgression, input.defense, &classified).await?;

    let items = if assessment.items.is_empty() {
        classified
    } else {
        catalog_items(assessment.items.iter().copied())?
    };

    // Reincidence comes from the record, never from the model.
    let aggravators: Vec<char> = assessment
        .aggravators
        .iter()
        .copied()
        .filter(|letter| *letter != REINCIDENCE_LETTER)
        .collect();

    let outcome = sanction::calculate(&CalculatorInput {
        items: items.iter().map(|item| item.number).collect(),
        aggravators,
        mitigators: assessment.mitigators.clone(),
        reincidence_count: input.history.restrictive(),
        base: textbook_base(input.transgression),
        natureza: assessment.natureza,
    })?;

    let suggestion = suggest_sanction(
        llm,
        input.transgression,
        &outcome.aggravators,
        &outcome.mitigators,
        &items,
        &history,
    )
    .await?;

    if suggestion.sanction != Some(outcome.sanction) {
        info!(
            suggested = ?suggestion.sanction,
            calculated = %outcome.sanction,
            "model suggestion overridden by calculator"
        );
    }

    Ok(AnalysisResult {
        circumstances: Circumstances {
            aggravators: outcome.aggravators.clone(),
            mitigators: outcome.mitigators.clone(),
        },
        items,
        model_suggestion: suggestion.sanction,
        explanation: suggestion.explanation,
        outcome,
    })
}
