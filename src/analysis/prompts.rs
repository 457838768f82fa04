use crate::{
    analysis::catalog,
    llm::LlmRequest,
    patd::RegulatoryItem,
};

const JSON_ONLY: &str = "Responda somente com um objeto JSON válido, sem texto adicional.";

pub fn classify_items(transgression: &str) -> LlmRequest {
    let system = format!(
        "Você é um assistente da Ouvidoria que enquadra transgressões disciplinares \
         no regulamento disciplinar. Escolha, na lista numerada abaixo, os itens que \
         descrevem a transgressão relatada. Use apenas números da lista.\n\n{}\n\n\
         Formato: {{\"items\": [{{\"number\": <número>, \"description\": \"<texto do item>\"}}]}}\n{JSON_ONLY}",
        catalog::render_items()
    );
    LlmRequest::new(system, format!("Transgressão relatada:\n{}", transgression.trim()))
}

pub fn assess_circumstances(
    history: &str,
    transgression: &str,
    defense: Option<&str>,
    items: &[RegulatoryItem],
) -> LlmRequest {
    let system = format!(
        "Você avalia as circunstâncias de uma transgressão disciplinar. Indique as \
         agravantes e atenuantes aplicáveis pelas letras abaixo, confirme os itens \
         enquadrados e classifique a natureza como grave, media ou leve.\n\n\
         Agravantes:\n{}\n\nAtenuantes:\n{}\n\n\
         Formato: {{\"aggravators\": [\"a\"], \"mitigators\": [\"b\"], \"items\": [<número>], \"natureza\": \"media\"}}\n{JSON_ONLY}",
        catalog::render_letters(&catalog::AGGRAVATORS),
        catalog::render_letters(&catalog::MITIGATORS),
    );
    let prompt = format!(
        "Histórico do militar: {history}\n\nTransgressão: {}\n\nDefesa: {}\n\nItens enquadrados:\n{}",
        transgression.trim(),
        defense.map(str::trim).filter(|text| !text.is_empty()).unwrap_or("não apresentada"),
        render_selected(items),
    );
    LlmRequest::new(system, prompt)
}

pub fn suggest_sanction(
    transgression: &str,
    aggravators: &[char],
    mitigators: &[char],
    items: &[RegulatoryItem],
    observation: &str,
) -> LlmRequest {
    let system = format!(
        "Você sugere a punição disciplinar seguindo estas regras:\n\
         - base: falta ao serviço = 6 dias de prisão; falta a missão = 6 dias de detenção; \
         caso contrário grave = 6 dias de prisão, media = 4 dias de detenção, leve = repreensão;\n\
         - agravantes somam dias: a, d, e, f = +4; b, c, g, h, i = +2; reincidência soma +2 por punição anterior;\n\
         - atenuantes subtraem dias: a, b, c = -2; d, e, f = -4;\n\
         - com dois ou mais itens inclua a agravante c;\n\
         - total ímpar arredonda para o próximo par;\n\
         - total menor ou igual a zero vira repreensão com 0 dias;\n\
         - base repreensão com total positivo vira detenção.\n\n\
         Formato: {{\"type\": \"reprimand|detention|arrest\", \"days\": <inteiro>, \"explanation\": \"<texto>\"}}\n{JSON_ONLY}"
    );
    let prompt = format!(
        "Transgressão: {}\nItens:\n{}\nAgravantes: {}\nAtenuantes: {}\nObservação: {observation}",
        transgression.trim(),
        render_selected(items),
        render_chars(aggravators),
        render_chars(mitigators),
    );
    LlmRequest::new(system, prompt)
}

pub fn summarize_defense(defense: &str) -> LlmRequest {
    LlmRequest::new(
        "Resuma a defesa apresentada por um militar em no máximo 50 palavras, em \
         linguagem formal e impessoal. Responda apenas com o resumo.",
        defense.trim(),
    )
}

pub fn rewrite_occurrence(transgression: &str) -> LlmRequest {
    LlmRequest::new(
        format!(
            "Reescreva o relato de uma ocorrência disciplinar em linguagem formal e \
             objetiva, com no máximo 50 palavras, e produza também uma versão afirmativa \
             em terceira pessoa começando por \"o militar\".\n\
             Formato: {{\"formal\": \"<texto>\", \"affirmative\": \"<texto>\"}}\n{JSON_ONLY}"
        ),
        transgression.trim(),
    )
}

fn render_selected(items: &[RegulatoryItem]) -> String {
    if items.is_empty() {
        return "nenhum".to_string();
    }
    items
        .iter()
        .map(|item| format!("{}. {}", item.number, item.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_chars(letters: &[char]) -> String {
    if letters.is_empty() {
        "nenhuma".to_string()
    } else {
        letters
            .iter()
            .map(char::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
