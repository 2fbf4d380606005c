use super::intent::{select_entity, Intent};
use crate::knowledge::{KnowledgeBase, ShortAnswer};
use crate::nlu::Nlu;

pub const GREETING_REPLY: &str = "Hello! I am WolfyBot and I am here to answer your questions. :-)";
pub const NOT_UNDERSTOOD_REPLY: &str = "Oops, looks like I didn't quite understand that! :-O";
pub const TOO_LONG_REPLY: &str = "Whoops! I'm still learning the ropes and while I got your answer, it's a little long for me to communicate. :-P";
pub const UNCLEAR_REPLY: &str = "WARNING: User input is unclear. :-/ Try clarifying your question?";

/// Turn a classified intent into reply text.
///
/// Knowledge lookup failures are logged and answered with the "unclear"
/// text so the user always gets something back.
pub async fn compose_reply(intent: &Intent, knowledge: &dyn KnowledgeBase) -> String {
    match intent {
        Intent::Greeting => GREETING_REPLY.to_string(),
        Intent::KnowledgeQuery(query) => match knowledge.short_answer(query).await {
            Ok(ShortAnswer::Answer(answer)) => answer,
            Ok(ShortAnswer::NotUnderstood) => NOT_UNDERSTOOD_REPLY.to_string(),
            Ok(ShortAnswer::NoShortAnswer) => TOO_LONG_REPLY.to_string(),
            Err(e) => {
                tracing::error!(
                    "Unable to retrieve an answer from {}: {e}",
                    knowledge.name()
                );
                UNCLEAR_REPLY.to_string()
            }
        },
        Intent::Unclear => UNCLEAR_REPLY.to_string(),
    }
}

/// Full pipeline for one message: NLU, entity selection, reply.
///
/// An NLU failure is returned to the caller, which logs it and sends nothing.
pub async fn respond(
    nlu: &dyn Nlu,
    knowledge: &dyn KnowledgeBase,
    text: &str,
    threshold: f64,
) -> anyhow::Result<(Intent, String)> {
    let understanding = nlu.understand(text).await?;
    let selected = select_entity(&understanding.candidates, threshold);
    if let Some(entity) = selected {
        tracing::debug!(
            "Selected entity `{}` ({:.3}) out of {} candidates",
            entity.key,
            entity.confidence,
            understanding.candidates.len()
        );
    }
    let intent = Intent::classify(selected);
    let reply = compose_reply(&intent, knowledge).await;
    Ok((intent, reply))
}
