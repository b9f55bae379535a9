//! Wiring from configuration to runtime components.

use std::path::Path;

use anyhow::{Context as _, Result};
use tracing::{info, warn};

use lensbot_agent::{
    Assistant, CompletionClient, CompletionSettings, ConversationPolicy, KnowledgeBase,
    KnowledgeIndex,
};
use lensbot_config::{LensbotConfig, LoadedConfig, MatchStrategy};
use lensbot_llm::{EmbedderSpec, OpenAiConfig, RetryPolicy, build_embedder, create_shared_backend};
use lensbot_session::StoreConfig;

/// Load the explicit config file, or discover and merge the layers.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    lensbot_config::load_config(explicit).context("loading configuration")
}

/// Log whether the provider credential is present. Absence is not fatal.
pub fn report_api_key(config: &LensbotConfig) -> bool {
    let llm = config.llm_config();
    let present = llm.api_key().is_some();
    if present {
        info!(env = %llm.api_key_env, "API key loaded");
    } else {
        warn!(
            env = %llm.api_key_env,
            "API key not set, model calls will fail and fall back to the apology"
        );
    }
    present
}

/// Build the completion client (and embedder, for the embedding strategy).
pub fn build_client(config: &LensbotConfig) -> Result<CompletionClient> {
    let llm = config.llm_config();
    let api_key = llm.api_key();
    let timeout = llm.timeout();

    let backend = create_shared_backend(
        OpenAiConfig::openai(api_key.clone())
            .with_base_url(&llm.base_url)
            .with_model(&llm.model)
            .with_timeout(timeout),
    )?;

    let retry = config.retry_config();
    let mut client = CompletionClient::new(backend)
        .with_settings(CompletionSettings {
            model: llm.model.clone(),
            max_tokens: llm.max_tokens,
            temperature: llm.temperature,
        })
        .with_retry_policy(
            RetryPolicy::default()
                .with_max_retries(retry.max_retries)
                .with_backoff(retry.backoff()),
        );

    if config.matching_config().strategy == MatchStrategy::Embedding {
        let embedding = config.embedding_config();
        let embedder = build_embedder(&EmbedderSpec {
            provider: embedding.provider.as_str().to_string(),
            api_key,
            model: Some(embedding.model),
            base_url: Some(embedding.base_url.unwrap_or(llm.base_url)),
            timeout: Some(timeout),
        })?;
        info!(provider = embedding.provider.as_str(), "Embedding matcher enabled");
        client = client.with_embedder(embedder);
    }

    Ok(client)
}

/// Conversation texts and history rules from config.
pub fn conversation_policy(config: &LensbotConfig) -> ConversationPolicy {
    let conversation = config.conversation_config();
    ConversationPolicy {
        system_prompt: conversation.system_prompt,
        greeting: conversation.greeting,
        apology: conversation.apology,
        history_window: conversation.history_window,
        remember_canned_answers: conversation.remember_canned_answers,
        record_fallback: conversation.record_fallback,
    }
}

/// Load the knowledge files from their configured paths.
pub fn load_knowledge(config: &LensbotConfig) -> Result<KnowledgeBase> {
    let paths = config.knowledge_config();
    Ok(KnowledgeBase::load(&paths.faqs, &paths.myths)?)
}

/// Load knowledge, index it per the matching strategy and build the assistant.
///
/// Any knowledge or embedding failure here aborts startup.
pub async fn build_assistant(config: &LensbotConfig) -> Result<Assistant> {
    let client = build_client(config)?;
    let base = load_knowledge(config)?;

    let matching = config.matching_config();
    let index = match matching.strategy {
        MatchStrategy::Exact => KnowledgeIndex::exact(base),
        MatchStrategy::Embedding => KnowledgeIndex::semantic(base, &client, matching.threshold)
            .await
            .context("embedding knowledge base")?,
    };

    Ok(Assistant::new(client, index).with_policy(conversation_policy(config)))
}

/// Session store limits from config.
pub fn store_config(config: &LensbotConfig) -> StoreConfig {
    let session = config.session_config();
    StoreConfig::new()
        .with_max_sessions(session.max_sessions)
        .with_ttl(session.ttl())
        .with_cleanup_interval(session.cleanup_interval())
}
