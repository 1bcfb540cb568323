use std::path::Path;
use std::sync::Arc;

use galleria_contracts::chat::{
    classify, clean_display_text, extract_referenced_paths, ChatIntent, ChatMessage,
    ConversationState, Turn, DEFAULT_MAX_HISTORY,
};
use galleria_contracts::config::DEFAULT_TOP_K;
use galleria_contracts::error::{ChatError, ExternalStage};
use galleria_contracts::events::EventWriter;
use galleria_contracts::gallery::ChatResult;
use galleria_contracts::prompts::{
    format_retrieved_data, gallery_turn_prompt, general_query_prompt, NO_IMAGES_FOUND,
    SYSTEM_PROMPT,
};
use log::{debug, info, warn};
use serde_json::{json, Value};

use crate::embedding::EmbeddingFuser;
use crate::gallery::GalleryIndexClient;
use crate::providers::TextGenerator;
use crate::sessions::{lock_session, SessionStore};
use crate::summarizer::Summarizer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSettings {
    pub system_prompt: String,
    pub max_history: usize,
    pub top_k: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            system_prompt: SYSTEM_PROMPT.to_string(),
            max_history: DEFAULT_MAX_HISTORY,
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Per-turn pipeline: classify, then answer directly, describe the attached
/// image, or retrieve from the gallery and discuss the matches.
pub struct GalleryChat {
    sessions: Arc<dyn SessionStore>,
    fuser: EmbeddingFuser,
    gallery: GalleryIndexClient,
    generator: Arc<dyn TextGenerator>,
    summarizer: Summarizer,
    settings: ChatSettings,
    events: Option<EventWriter>,
}

impl GalleryChat {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        fuser: EmbeddingFuser,
        gallery: GalleryIndexClient,
        generator: Arc<dyn TextGenerator>,
        summarizer: Summarizer,
    ) -> Self {
        Self {
            sessions,
            fuser,
            gallery,
            generator,
            summarizer,
            settings: ChatSettings::default(),
            events: None,
        }
    }

    pub fn with_settings(mut self, settings: ChatSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn create_session(&self) -> String {
        let state = ConversationState::new(
            self.settings.system_prompt.clone(),
            self.settings.max_history,
        );
        let session_id = self.sessions.create(state);
        debug!("created session {session_id}");
        self.emit("session_created", json!({ "session_id": session_id }));
        session_id
    }

    pub fn delete_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.delete(session_id);
        if removed {
            self.emit("session_deleted", json!({ "session_id": session_id }));
        }
        removed
    }

    pub fn session_history(&self, session_id: &str) -> Result<Vec<Turn>, ChatError> {
        let handle = self
            .sessions
            .get(session_id)
            .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))?;
        let state = lock_session(&handle);
        Ok(state.snapshot())
    }

    /// Forgets every stored turn but keeps the session.
    pub fn clear_history(&self, session_id: &str) -> Result<(), ChatError> {
        let handle = self
            .sessions
            .get(session_id)
            .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))?;
        lock_session(&handle).clear();
        self.emit("history_cleared", json!({ "session_id": session_id }));
        Ok(())
    }

    /// Runs one turn. History is only touched on the gallery path, and only
    /// after every collaborator call for the turn has succeeded.
    pub fn handle_turn(
        &self,
        session_id: &str,
        text: Option<&str>,
        image: Option<&Path>,
    ) -> Result<ChatResult, ChatError> {
        let text = text.map(str::trim).filter(|value| !value.is_empty());
        if text.is_none() && image.is_none() {
            return Err(ChatError::no_input());
        }
        let handle = self
            .sessions
            .get(session_id)
            .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))?;
        let mut state = lock_session(&handle);

        let intent = classify(text, image.is_some());
        info!("session {session_id}: {} turn", intent.as_str());
        self.emit(
            "turn_classified",
            json!({
                "session_id": session_id,
                "intent": intent.as_str(),
                "has_text": text.is_some(),
                "has_image": image.is_some(),
            }),
        );

        let outcome = match intent {
            ChatIntent::DescribeImage => self.describe_turn(image),
            ChatIntent::General => self.general_turn(text),
            ChatIntent::Gallery => self.gallery_turn(session_id, &mut state, text, image),
        };

        match &outcome {
            Ok(result) => self.emit(
                "turn_completed",
                json!({
                    "session_id": session_id,
                    "intent": intent.as_str(),
                    "paths": result.paths,
                    "history_len": state.len(),
                }),
            ),
            Err(err) => {
                warn!("session {session_id}: turn failed: {err}");
                self.emit(
                    "turn_failed",
                    json!({
                        "session_id": session_id,
                        "intent": intent.as_str(),
                        "error_kind": err.kind(),
                        "message": err.to_string(),
                    }),
                );
            }
        }
        outcome
    }

    fn describe_turn(&self, image: Option<&Path>) -> Result<ChatResult, ChatError> {
        let Some(image) = image else {
            return Err(ChatError::no_input());
        };
        let description = self
            .summarizer
            .describe(image)
            .map_err(|err| ChatError::external(ExternalStage::Description, &err))?;
        Ok(ChatResult::text_only(description.trim()))
    }

    fn general_turn(&self, text: Option<&str>) -> Result<ChatResult, ChatError> {
        let Some(text) = text else {
            return Err(ChatError::no_input());
        };
        let prompt = general_query_prompt(text);
        let reply = self
            .generator
            .generate(&[ChatMessage::user(prompt)])
            .map_err(|err| ChatError::external(ExternalStage::Generation, &err))?;
        Ok(ChatResult::text_only(reply.trim()))
    }

    fn gallery_turn(
        &self,
        session_id: &str,
        state: &mut ConversationState,
        text: Option<&str>,
        image: Option<&Path>,
    ) -> Result<ChatResult, ChatError> {
        let query = self.fuser.embed_query(text, image)?;
        let retrieved = self
            .gallery
            .retrieve(&query, self.settings.top_k)
            .map_err(|err| ChatError::external(ExternalStage::Index, &err))?;
        self.emit(
            "retrieval_completed",
            json!({
                "session_id": session_id,
                "collection": self.gallery.collection(),
                "count": retrieved.len(),
                "paths": retrieved.paths,
            }),
        );

        let data = format_retrieved_data(&retrieved.documents, &retrieved.metadatas);
        let human = Turn::Human(gallery_turn_prompt(text, &data, &retrieved.paths));
        let messages = state.prompt_with(&human);
        let reply = self
            .generator
            .generate(&messages)
            .map_err(|err| ChatError::external(ExternalStage::Generation, &err))?;

        let referenced = extract_referenced_paths(&reply, &retrieved.paths);
        let response = clean_display_text(&reply);
        self.emit(
            "reply_parsed",
            json!({
                "session_id": session_id,
                "candidates": retrieved.len(),
                "referenced": referenced,
            }),
        );

        let combined_description = if referenced.is_empty() {
            self.emit(
                "description_skipped",
                json!({ "session_id": session_id, "reason": "no_referenced_paths" }),
            );
            NO_IMAGES_FOUND.to_string()
        } else {
            self.summarizer
                .summarize(&referenced)
                .map_err(|err| ChatError::external(ExternalStage::Summary, &err))?
                .trim()
                .to_string()
        };

        state.append(human);
        state.append(Turn::Ai(reply));

        Ok(ChatResult {
            response,
            paths: self.gallery.path_mapper().all_to_web(&referenced),
            combined_description,
        })
    }

    fn emit(&self, event_type: &str, payload: Value) {
        let Some(events) = &self.events else {
            return;
        };
        if let Err(err) = events.emit_json(event_type, payload) {
            warn!("failed to record {event_type} event: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::thread;

    use galleria_contracts::chat::{Role, Turn};
    use galleria_contracts::error::{ChatError, ExternalStage};
    use galleria_contracts::events::EventWriter;
    use galleria_contracts::gallery::PathMapper;
    use galleria_contracts::prompts::{NO_IMAGES_FOUND, NO_INPUT_ERROR};
    use serde_json::json;
    use tempfile::TempDir;

    use super::{ChatSettings, GalleryChat};
    use crate::embedding::tests::FixedEmbedder;
    use crate::embedding::EmbeddingFuser;
    use crate::gallery::GalleryIndexClient;
    use crate::index::{IndexRecord, LocalVectorIndex, VectorIndex};
    use crate::sessions::InMemorySessionStore;
    use crate::summarizer::tests::{ScriptedGenerator, TableDescriber};
    use crate::summarizer::Summarizer;

    const GIRAFFE: &str = "app/static/image_data/giraffe.jpg";
    const BOAT: &str = "app/static/image_data/boat.jpg";

    struct Fixture {
        chat: GalleryChat,
        generator: Arc<ScriptedGenerator>,
        describer: Arc<TableDescriber>,
        temp: TempDir,
    }

    fn fixture(
        replies: &[&str],
        collection: &str,
        image_vector: Vec<f32>,
        settings: ChatSettings,
    ) -> anyhow::Result<Fixture> {
        let temp = tempfile::tempdir()?;
        let index = Arc::new(LocalVectorIndex::new(temp.path().join("index.json")));
        for (path, embedding, tags) in [
            (GIRAFFE, vec![1.0f32, 0.0], "giraffe, savanna"),
            (BOAT, vec![0.0f32, 1.0], "boat, harbor"),
        ] {
            let id = Path::new(path)
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_default();
            index.add(
                "photos",
                IndexRecord {
                    document: format!("A photo of a {id}."),
                    id,
                    metadata: json!({ "image_path": path, "tags": tags, "color_palette": "gold" })
                        .as_object()
                        .cloned()
                        .unwrap_or_default(),
                    embedding,
                },
            )?;
        }

        let generator = Arc::new(ScriptedGenerator::replying(replies));
        let describer = Arc::new(TableDescriber::with(&[
            (GIRAFFE, "A tall giraffe under acacia trees."),
            (BOAT, "A red boat in a harbor."),
            ("upload.jpg", "  A close-up of a sunflower.  "),
        ]));
        let chat = GalleryChat::new(
            Arc::new(InMemorySessionStore::new()),
            EmbeddingFuser::new(Arc::new(FixedEmbedder {
                text: vec![3.0, 0.0],
                image: image_vector,
            })),
            GalleryIndexClient::new(index, collection, PathMapper::default()),
            generator.clone(),
            Summarizer::new(describer.clone(), generator.clone()),
        )
        .with_settings(settings)
        .with_events(EventWriter::new(temp.path().join("events.jsonl"), "test"));
        Ok(Fixture {
            chat,
            generator,
            describer,
            temp,
        })
    }

    fn gallery_fixture(replies: &[&str]) -> anyhow::Result<Fixture> {
        fixture(replies, "photos", vec![0.0, 2.0], ChatSettings::default())
    }

    #[test]
    fn gallery_turn_recovers_referenced_paths_and_summarizes() -> anyhow::Result<()> {
        let fx = gallery_fixture(&[
            "Here are some giraffe images from the gallery. [image: giraffe] Relevant images: app/static/image_data/giraffe.jpg, app/static/image_data/zebra.jpg",
            "A giraffe stands among acacia trees.",
        ])?;
        let session = fx.chat.create_session();

        let result = fx.chat.handle_turn(&session, Some("show me giraffes"), None)?;
        assert_eq!(result.response, "Here are some giraffe images from the gallery.");
        assert_eq!(result.paths, vec!["../static/image_data/giraffe.jpg"]);
        assert_eq!(result.combined_description, "A giraffe stands among acacia trees.");

        let prompts = fx.generator.prompts();
        assert_eq!(prompts.len(), 2);
        let gallery_prompt = &prompts[0];
        assert_eq!(gallery_prompt.len(), 2);
        assert_eq!(gallery_prompt[0].role, Role::System);
        let human = &gallery_prompt[1].content;
        assert!(human.starts_with("The user asked: 'show me giraffes'"));
        assert!(human.ends_with(&format!("Image paths: {GIRAFFE}, {BOAT}")));
        assert!(human.contains("Tags: giraffe, savanna"));
        assert!(prompts[1][0].content.contains("- A tall giraffe under acacia trees."));

        let described = fx.describer.calls.lock().map(|c| c.clone()).unwrap_or_default();
        assert_eq!(described, vec![GIRAFFE.to_string()]);

        let history = fx.chat.session_history(&session)?;
        assert_eq!(history.len(), 2);
        assert!(matches!(&history[0], Turn::Human(content) if content == human));
        assert!(matches!(&history[1], Turn::Ai(content) if content.contains("Relevant images:")));
        Ok(())
    }

    #[test]
    fn empty_collection_reports_no_images_found() -> anyhow::Result<()> {
        let fx = fixture(
            &["I couldn't find a close match."],
            "missing",
            vec![0.0, 1.0],
            ChatSettings::default(),
        )?;
        let session = fx.chat.create_session();

        let result = fx.chat.handle_turn(&session, Some("show me penguins"), None)?;
        assert!(result.paths.is_empty());
        assert_eq!(result.combined_description, NO_IMAGES_FOUND);
        assert_eq!(result.response, "I couldn't find a close match.");
        assert!(fx.generator.prompts()[0][1].content.ends_with("Image paths: None"));
        assert_eq!(fx.chat.session_history(&session)?.len(), 2);
        Ok(())
    }

    #[test]
    fn general_question_skips_history_and_retrieval() -> anyhow::Result<()> {
        let fx = gallery_fixture(&["  He is an American politician.  "])?;
        let session = fx.chat.create_session();

        let result = fx.chat.handle_turn(&session, Some("who is Donald Trump"), None)?;
        assert_eq!(result.response, "He is an American politician.");
        assert!(result.paths.is_empty());
        assert_eq!(result.combined_description, "");

        let prompts = fx.generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].len(), 1);
        assert_eq!(prompts[0][0].role, Role::User);
        assert!(prompts[0][0].content.contains("'who is Donald Trump'"));
        assert!(fx.chat.session_history(&session)?.is_empty());
        Ok(())
    }

    #[test]
    fn describe_request_describes_the_upload_only() -> anyhow::Result<()> {
        let fx = gallery_fixture(&[])?;
        let session = fx.chat.create_session();

        let result = fx.chat.handle_turn(
            &session,
            Some("Can you describe this image?"),
            Some(Path::new("upload.jpg")),
        )?;
        assert_eq!(result.response, "A close-up of a sunflower.");
        assert!(result.paths.is_empty());
        assert_eq!(result.combined_description, "");
        assert!(fx.generator.prompts().is_empty());
        assert!(fx.chat.session_history(&session)?.is_empty());
        Ok(())
    }

    #[test]
    fn image_alone_is_a_similarity_query() -> anyhow::Result<()> {
        let fx = gallery_fixture(&[
            "This looks like the boat. Relevant images: app/static/image_data/boat.jpg",
            "A red boat.",
        ])?;
        let session = fx.chat.create_session();

        let result = fx
            .chat
            .handle_turn(&session, Some("   "), Some(Path::new("upload.jpg")))?;
        assert_eq!(result.paths, vec!["../static/image_data/boat.jpg"]);
        let human = &fx.generator.prompts()[0][1].content;
        assert!(human.starts_with("The user asked: 'No text provided'"));
        assert!(human.ends_with(&format!("Image paths: {BOAT}, {GIRAFFE}")));
        Ok(())
    }

    #[test]
    fn rejects_missing_input_and_unknown_sessions() -> anyhow::Result<()> {
        let fx = gallery_fixture(&[])?;
        let session = fx.chat.create_session();

        match fx.chat.handle_turn(&session, Some("  "), None) {
            Err(ChatError::InvalidInput(message)) => assert_eq!(message, NO_INPUT_ERROR),
            other => anyhow::bail!("expected invalid input, got {other:?}"),
        }
        assert!(matches!(
            fx.chat.handle_turn("missing", Some("show me giraffes"), None),
            Err(ChatError::SessionNotFound(id)) if id == "missing"
        ));
        assert!(matches!(
            fx.chat.session_history("missing"),
            Err(ChatError::SessionNotFound(_))
        ));
        assert!(fx.generator.prompts().is_empty());
        Ok(())
    }

    #[test]
    fn failed_generation_leaves_history_untouched() -> anyhow::Result<()> {
        let fx = gallery_fixture(&[])?;
        fx.generator.push_failure("upstream 503");
        let session = fx.chat.create_session();

        let err = match fx.chat.handle_turn(&session, Some("show me boats"), None) {
            Err(err) => err,
            Ok(result) => anyhow::bail!("expected failure, got {result:?}"),
        };
        assert!(matches!(
            &err,
            ChatError::ExternalCall { stage: ExternalStage::Generation, message }
                if message.contains("upstream 503")
        ));
        assert!(fx.chat.session_history(&session)?.is_empty());
        Ok(())
    }

    #[test]
    fn failed_summary_leaves_history_untouched() -> anyhow::Result<()> {
        let fx = gallery_fixture(&["Boats! Relevant images: app/static/image_data/boat.jpg"])?;
        fx.generator.push_failure("summary quota");
        let session = fx.chat.create_session();

        let err = fx
            .chat
            .handle_turn(&session, Some("show me boats"), None)
            .err();
        assert!(matches!(
            err,
            Some(ChatError::ExternalCall { stage: ExternalStage::Summary, .. })
        ));
        assert!(fx.chat.session_history(&session)?.is_empty());
        Ok(())
    }

    #[test]
    fn embedding_failure_is_an_external_call_error() -> anyhow::Result<()> {
        let fx = fixture(&[], "photos", Vec::new(), ChatSettings::default())?;
        let session = fx.chat.create_session();
        let err = fx
            .chat
            .handle_turn(&session, None, Some(Path::new("upload.jpg")))
            .err();
        assert!(matches!(
            err,
            Some(ChatError::ExternalCall { stage: ExternalStage::Embedding, message })
                if message.contains("image encoder offline")
        ));
        Ok(())
    }

    #[test]
    fn history_stays_bounded_across_turns() -> anyhow::Result<()> {
        let settings = ChatSettings {
            max_history: 2,
            ..ChatSettings::default()
        };
        let fx = fixture(
            &["first", "second", "third"],
            "photos",
            vec![0.0, 1.0],
            settings,
        )?;
        let session = fx.chat.create_session();
        for query in ["show me giraffes", "show me boats", "show me photos"] {
            fx.chat.handle_turn(&session, Some(query), None)?;
        }

        let history = fx.chat.session_history(&session)?;
        assert_eq!(history.len(), 2);
        assert!(history[0].content().contains("show me photos"));
        assert_eq!(history[1], Turn::Ai("third".to_string()));

        let prompts = fx.generator.prompts();
        assert_eq!(prompts[2].len(), 3);
        assert_eq!(prompts[2][1], Turn::Ai("second".to_string()).to_message());
        Ok(())
    }

    #[test]
    fn turns_are_recorded_as_events() -> anyhow::Result<()> {
        let fx = gallery_fixture(&["Nothing relevant."])?;
        let session = fx.chat.create_session();
        fx.chat.handle_turn(&session, Some("show me boats"), None)?;
        assert!(fx.chat.delete_session(&session));
        assert!(!fx.chat.delete_session(&session));

        let events = EventWriter::new(fx.temp.path().join("events.jsonl"), "test").read_all()?;
        let types: Vec<&str> = events
            .iter()
            .filter_map(|event| event.get("type").and_then(|value| value.as_str()))
            .collect();
        assert_eq!(
            types,
            vec![
                "session_created",
                "turn_classified",
                "retrieval_completed",
                "reply_parsed",
                "description_skipped",
                "turn_completed",
                "session_deleted",
            ]
        );
        assert_eq!(events[1].get("intent"), Some(&json!("gallery")));
        assert_eq!(events[2].get("count"), Some(&json!(2)));
        Ok(())
    }
    #[test]
    fn clear_history_keeps_the_session() -> anyhow::Result<()> {
        let fx = gallery_fixture(&["Nothing relevant.", "Still nothing."])?;
        let session = fx.chat.create_session();
        fx.chat.handle_turn(&session, Some("show me boats"), None)?;
        assert_eq!(fx.chat.session_history(&session)?.len(), 2);

        fx.chat.clear_history(&session)?;
        assert!(fx.chat.session_history(&session)?.is_empty());
        fx.chat.handle_turn(&session, Some("show me giraffes"), None)?;
        assert_eq!(fx.generator.prompts()[1].len(), 2);
        assert!(matches!(
            fx.chat.clear_history("missing"),
            Err(ChatError::SessionNotFound(_))
        ));
        Ok(())
    }

    fn run_turns(chat: &GalleryChat, session: &str, queries: &[String]) -> anyhow::Result<()> {
        for query in queries {
            chat.handle_turn(session, Some(query), None)?;
        }
        Ok(())
    }

    #[test]
    fn concurrent_turns_on_one_session_are_serialized() -> anyhow::Result<()> {
        let workers = 4;
        let per_worker = 3;
        let total = workers * per_worker;
        let replies: Vec<String> = (0..total).map(|n| format!("Nothing relevant ({n}).")).collect();
        let reply_refs: Vec<&str> = replies.iter().map(String::as_str).collect();
        let settings = ChatSettings {
            max_history: 2 * total,
            ..ChatSettings::default()
        };
        let fx = fixture(&reply_refs, "photos", vec![0.0, 1.0], settings)?;
        let session = fx.chat.create_session();

        thread::scope(|scope| -> anyhow::Result<()> {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let queries: Vec<String> = (0..per_worker)
                        .map(|n| format!("show me boats w{worker} n{n}"))
                        .collect();
                    let chat = &fx.chat;
                    let session = session.as_str();
                    scope.spawn(move || run_turns(chat, session, &queries))
                })
                .collect();
            for handle in handles {
                handle
                    .join()
                    .map_err(|_| anyhow::anyhow!("turn worker panicked"))??;
            }
            Ok(())
        })?;

        let history = fx.chat.session_history(&session)?;
        assert_eq!(history.len(), 2 * total);
        for pair in history.chunks(2) {
            assert!(matches!(&pair[0], Turn::Human(content) if content.contains("show me boats w")));
            assert!(matches!(&pair[1], Turn::Ai(content) if content.starts_with("Nothing relevant")));
        }
        let mut asked: Vec<String> = history
            .iter()
            .filter_map(|turn| match turn {
                Turn::Human(content) => content
                    .split('\'')
                    .nth(1)
                    .map(str::to_string),
                Turn::Ai(_) => None,
            })
            .collect();
        asked.sort();
        asked.dedup();
        assert_eq!(asked.len(), total);

        let prompt_sizes: Vec<usize> = fx.generator.prompts().iter().map(Vec::len).collect();
        let expected: Vec<usize> = (0..total).map(|turn| 2 + 2 * turn).collect();
        assert_eq!(prompt_sizes, expected);
        Ok(())
    }

    #[test]
    fn concurrent_sessions_keep_separate_histories() -> anyhow::Result<()> {
        let per_session = 5;
        let replies: Vec<&str> = vec!["Nothing relevant."; 2 * per_session];
        let settings = ChatSettings {
            max_history: 4 * per_session,
            ..ChatSettings::default()
        };
        let fx = fixture(&replies, "photos", vec![0.0, 1.0], settings)?;
        let sessions = [fx.chat.create_session(), fx.chat.create_session()];

        thread::scope(|scope| -> anyhow::Result<()> {
            let handles: Vec<_> = sessions
                .iter()
                .enumerate()
                .map(|(idx, session)| {
                    let queries: Vec<String> = (0..per_session)
                        .map(|n| format!("show me boats s{idx} n{n}"))
                        .collect();
                    let chat = &fx.chat;
                    scope.spawn(move || run_turns(chat, session, &queries))
                })
                .collect();
            for handle in handles {
                handle
                    .join()
                    .map_err(|_| anyhow::anyhow!("session worker panicked"))??;
            }
            Ok(())
        })?;

        for (idx, session) in sessions.iter().enumerate() {
            let history = fx.chat.session_history(session)?;
            assert_eq!(history.len(), 2 * per_session);
            let own = format!("show me boats s{idx} ");
            for (n, pair) in history.chunks(2).enumerate() {
                assert!(
                    matches!(&pair[0], Turn::Human(content) if content.contains(&format!("{own}n{n}'")))
                );
                assert!(matches!(&pair[1], Turn::Ai(_)));
            }
        }
        Ok(())
    }
}
