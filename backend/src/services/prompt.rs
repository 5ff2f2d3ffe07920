//! Prompt assembly for the advisory and the query rewrite

use shared::{AdvisoryContext, ConversationTurn, Role, SessionHistory};

use crate::external::ChatMessage;

/// Domain-expert instructions at the head of every advisory prompt
pub const ADVISOR_INSTRUCTIONS: &str = r#"You are an oilseed agronomy advisor for Indian farmers. You cover eight crops:
groundnut, soybean, rapeseed-mustard, sunflower, safflower, sesame, niger and castor.

You are given:
1. DOCUMENT CONTEXT: passages retrieved from agronomy bulletins and crop guides.
2. FIELD AND YIELD DATA: JSON with the crop, the predicted yield in t/ha when
   available, any extra field details, and a map of feature name to value.
3. FEATURE LIST: the same feature values as a readable list.

How to advise:
- Ground every recommendation in the document context first. When a number is
  not in the context, say the range is approximate.
- For each feature, judge whether it sits in the low, medium or high yield band
  for this crop. Call out critical limiting factors first, then moderate ones.
- Give concrete practices (variety, sowing window, seed rate, nutrient doses,
  irrigation timing, plant protection) that move limiting features towards the
  high-yield band.
- Stay specific to the crop and to the farmer's actual values. Never invent
  measurements the farmer did not provide.
- If the farmer asks a direct question, answer it precisely and relate it to
  their current values when field data is present.

Output format (Markdown):
### Summary
### Limiting factors
### Recommended actions
### Risks to watch
End with exactly one short question that would help refine the next advice.

Language rules:
- Follow the LANGUAGE section. When it says to infer, answer in the language of
  the farmer's query.
- Never mix languages within one answer.
- Be respectful and practical. Avoid academic jargon."#;

/// System instruction for the history-aware query rewrite
pub const REWRITE_INSTRUCTIONS: &str = "Rewrite the farmer's latest question as one standalone search query. \
Use the conversation so far to resolve references, and keep every crop and feature already mentioned. \
Do not introduce crops, features or numbers that appear neither in the conversation nor in the question. \
Reply with the query only.";

const NO_PASSAGES: &str = "No document passages were retrieved for this query.";

/// One prompt in fixed order: instructions, passages, numeric context,
/// feature listing, language directive.
pub fn compose_prompt(ctx: &AdvisoryContext) -> String {
    let passages = if ctx.passages.is_empty() {
        NO_PASSAGES.to_string()
    } else {
        ctx.passages
            .iter()
            .map(|p| match p.page {
                Some(page) => format!("[{} | page {}]\n{}", p.file_name(), page, p.text.trim()),
                None => format!("[{}]\n{}", p.file_name(), p.text.trim()),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!(
        "{instructions}\n\n\
         ==== DOCUMENT CONTEXT ====\n{passages}\n\n\
         ==== FIELD AND YIELD DATA ====\n{numeric}\n\n\
         ==== FEATURE LIST ====\n{features}\n\n\
         ==== LANGUAGE ====\n{language}\n\n\
         Now write the advisory answer to the farmer's query.",
        instructions = ADVISOR_INSTRUCTIONS,
        passages = passages,
        numeric = ctx.numeric.to_json(),
        features = ctx.feature_listing,
        language = ctx.language.directive(),
    )
}

fn history_messages(history: &SessionHistory) -> impl Iterator<Item = ChatMessage> + '_ {
    history.turns().iter().map(|turn: &ConversationTurn| match turn.role {
        Role::User => ChatMessage::user(turn.text.clone()),
        Role::Assistant => ChatMessage::assistant(turn.text.clone()),
    })
}

/// System prompt, prior turns, then the farmer's query.
pub fn answer_messages(
    ctx: &AdvisoryContext,
    history: &SessionHistory,
    query: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(compose_prompt(ctx)));
    messages.extend(history_messages(history));
    messages.push(ChatMessage::user(query));
    messages
}

pub fn rewrite_messages(history: &SessionHistory, query: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(REWRITE_INSTRUCTIONS));
    messages.extend(history_messages(history));
    messages.push(ChatMessage::user(query));
    messages
}
