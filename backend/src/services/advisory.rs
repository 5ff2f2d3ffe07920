//! Retrieval-augmented advisory pipeline
//!
//! One call runs rewrite, retrieve, compose, generate, trace and persist, in
//! that order, while holding the session so concurrent calls on the same
//! session cannot interleave their history reads and writes.

use std::sync::Arc;

use shared::{Advisory, AdvisoryContext, ConversationTurn, Language, NumericContext};

use crate::error::{AppError, AppResult};
use crate::external::GenerativeModel;
use crate::services::prompt::answer_messages;
use crate::services::retrieval::Retriever;
use crate::services::rewrite::QueryRewriter;
use crate::services::session::SessionStore;
use crate::services::trace::render_trace;

const MAX_QUERY_CHARS: usize = 4000;

#[derive(Clone)]
pub struct AdvisoryService {
    retriever: Arc<dyn Retriever>,
    llm: Arc<dyn GenerativeModel>,
    rewriter: Arc<dyn QueryRewriter>,
    sessions: SessionStore,
}

impl AdvisoryService {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        llm: Arc<dyn GenerativeModel>,
        rewriter: Arc<dyn QueryRewriter>,
        sessions: SessionStore,
    ) -> Self {
        Self {
            retriever,
            llm,
            rewriter,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Produce an advisory for `query` and record the exchange in the session.
    ///
    /// Retrieval and generation failures are returned as errors and leave the
    /// session untouched. An empty model answer is still returned with its
    /// trace.
    pub async fn advise(
        &self,
        session_id: &str,
        query: &str,
        numeric: Option<NumericContext>,
        language: Language,
    ) -> AppResult<Advisory> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::invalid_input("query", "Query must not be empty"));
        }
        if query.chars().count() > MAX_QUERY_CHARS {
            return Err(AppError::invalid_input(
                "query",
                "Query must be at most 4000 characters",
            ));
        }
        let numeric = numeric.unwrap_or_else(NumericContext::unknown);

        let mut session = self.sessions.lock(session_id).await?;

        let rewritten = self.rewriter.rewrite(session.history(), query).await?;
        let passages = self.retriever.retrieve(&rewritten).await?;
        tracing::info!(
            session_id,
            crop = numeric.crop.as_deref().unwrap_or("-"),
            passages = passages.len(),
            "composing advisory"
        );

        let context = AdvisoryContext::new(passages, numeric, language);
        let messages = answer_messages(&context, session.history(), query);
        let answer = self.llm.generate(&messages).await?;
        if answer.trim().is_empty() {
            tracing::warn!(session_id, model = self.llm.model_name(), "model returned an empty answer");
        }

        let trace = render_trace(&context.numeric, &self.retriever.method(), &context.passages);

        session.push(ConversationTurn::user(query));
        session.push(ConversationTurn::assistant(answer.clone()));

        Ok(Advisory { answer, trace })
    }
}
