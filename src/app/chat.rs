//! The chat loop: record input, stream the reply, record the reply

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    app::events::{ChatEvent, NO_MODEL_WARNING, STREAMING_CURSOR},
    llm::{ChatRequest, LlmError, LlmResult, Message},
    session::SessionState,
    utils::text::string::truncate,
};

/// How a user input was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model answered with `content`
    Responded { content: String },

    /// No model was loaded; the input was recorded without an answer
    SkippedNoModel,
}

/// Handle one user input against the session.
///
/// The user message is always recorded. Generation runs only when the
/// session holds a model; the assistant message is recorded once the stream
/// has ended. Errors from the stream propagate and leave the user message
/// without an answer.
pub async fn submit(
    session: &mut SessionState,
    prompt: String,
    temperature: f32,
    events: &mpsc::UnboundedSender<ChatEvent>,
) -> LlmResult<TurnOutcome> {
    debug!("User input in session {}: {}", session.id(), truncate(&prompt, 50));

    session.push(Message::user(prompt.clone()));
    emit(events, ChatEvent::UserMessage { content: prompt });

    if !session.has_model() {
        warn!("Input received without a loaded model in session {}", session.id());
        emit(
            events,
            ChatEvent::Warning {
                message: NO_MODEL_WARNING.to_string(),
            },
        );
        return Ok(TurnOutcome::SkippedNoModel);
    }

    let request = ChatRequest {
        messages: session.messages().to_vec(),
        temperature,
    };

    let model = session
        .model()
        .ok_or_else(|| LlmError::EngineUnavailable("no model loaded".to_string()))?;
    let mut stream = model.chat_completion_stream(request).await?;
    emit(events, ChatEvent::AssistantStarted);

    let mut full_response = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if let Some(text) = chunk.text() {
            full_response.push_str(text);
            emit(
                events,
                ChatEvent::AssistantPartial {
                    text: format!("{}{}", full_response, STREAMING_CURSOR),
                },
            );
        }
    }

    info!(
        "Response in session {} complete ({} chars)",
        session.id(),
        full_response.chars().count()
    );

    emit(
        events,
        ChatEvent::AssistantFinished {
            content: full_response.clone(),
        },
    );
    session.push(Message::assistant(full_response.clone()));

    Ok(TurnOutcome::Responded {
        content: full_response,
    })
}

fn emit(events: &mpsc::UnboundedSender<ChatEvent>, event: ChatEvent) {
    // Nobody rendering is not a reason to stop the turn
    let _ = events.send(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        llm::{
            testing::ScriptedEngine, CompletionChunk, FinishReason, InferenceEngine, LlmError,
            LoadParams, MessageRole,
        },
        session::ModelState,
    };
    use std::path::PathBuf;

    async fn loaded_session(engine: &ScriptedEngine) -> SessionState {
        let mut session = SessionState::new("s", "You are a helpful AI assistant.");
        let handle = engine
            .load(LoadParams {
                model_path: PathBuf::from("models/x.gguf"),
                n_ctx: 2048,
                n_gpu_layers: 0,
                verbose: false,
            })
            .await
            .map_err(|e| e.to_string())
            .unwrap();
        session.install_model(handle);
        session
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ChatEvent>) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_submit_after_model_cleared_skips_generation() {
        let engine = ScriptedEngine::new(vec![CompletionChunk::content("unused")]);
        let mut session = loaded_session(&engine).await;
        assert!(session.has_model());
        session.clear_model();
        let (tx, _rx) = mpsc::unbounded_channel();

        let outcome = submit(&mut session, "hi".to_string(), 0.7, &tx)
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::SkippedNoModel);
        assert!(engine.requests().is_empty());
        assert_eq!(session.visible_messages().count(), 1);
    }

    #[tokio::test]
    async fn test_submit_without_model_records_input_and_warns() {
        let mut session = SessionState::new("s", "sys");
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = submit(&mut session, "hello".to_string(), 0.7, &tx)
            .await
            .unwrap();

        assert_eq!(outcome, TurnOutcome::SkippedNoModel);
        assert_eq!(session.state(), ModelState::NoModel);
        assert_eq!(
            session.messages(),
            &[Message::system("sys"), Message::user("hello")]
        );
        assert_eq!(
            drain(&mut rx),
            vec![
                ChatEvent::UserMessage {
                    content: "hello".to_string()
                },
                ChatEvent::Warning {
                    message: NO_MODEL_WARNING.to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_submit_concatenates_fragments_in_order() {
        let engine = ScriptedEngine::new(vec![
            CompletionChunk::role(MessageRole::Assistant),
            CompletionChunk::content("Hel"),
            CompletionChunk::content(""),
            CompletionChunk::content("lo"),
            CompletionChunk::content(", world"),
            CompletionChunk::finish(FinishReason::Stop),
        ]);
        let mut session = loaded_session(&engine).await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = submit(&mut session, "hi".to_string(), 0.25, &tx)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TurnOutcome::Responded {
                content: "Hello, world".to_string()
            }
        );

        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1], Message::user("hi"));
        assert_eq!(messages[2], Message::assistant("Hello, world"));

        let partials: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|event| match event {
                ChatEvent::AssistantPartial { text } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(partials, vec!["Hel▌", "Hello▌", "Hello, world▌"]);
    }

    #[tokio::test]
    async fn test_submit_sends_full_history_and_temperature() {
        let engine = ScriptedEngine::new(vec![CompletionChunk::content("ok")]);
        let mut session = loaded_session(&engine).await;
        let (tx, _rx) = mpsc::unbounded_channel();

        submit(&mut session, "first".to_string(), 0.7, &tx).await.unwrap();
        submit(&mut session, "second".to_string(), 0.1, &tx).await.unwrap();

        let requests = engine.requests();
        assert_eq!(requests.len(), 2);

        let last = &requests[1];
        assert!((last.temperature - 0.1).abs() < f32::EPSILON);
        let roles: Vec<_> = last.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User
            ]
        );
        assert_eq!(last.messages[3].content, "second");
    }

    #[tokio::test]
    async fn test_event_sequence_for_answered_turn() {
        let engine = ScriptedEngine::new(vec![CompletionChunk::content("yes")]);
        let mut session = loaded_session(&engine).await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        submit(&mut session, "ok?".to_string(), 0.7, &tx).await.unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![
                ChatEvent::UserMessage {
                    content: "ok?".to_string()
                },
                ChatEvent::AssistantStarted,
                ChatEvent::AssistantPartial {
                    text: "yes▌".to_string()
                },
                ChatEvent::AssistantFinished {
                    content: "yes".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_stream_records_empty_answer() {
        let engine = ScriptedEngine::new(vec![CompletionChunk::finish(FinishReason::Stop)]);
        let mut session = loaded_session(&engine).await;
        let (tx, _rx) = mpsc::unbounded_channel();

        let outcome = submit(&mut session, "?".to_string(), 0.7, &tx).await.unwrap();

        assert_eq!(
            outcome,
            TurnOutcome::Responded {
                content: String::new()
            }
        );
        assert_eq!(session.messages().last(), Some(&Message::assistant("")));
    }

    #[tokio::test]
    async fn test_stream_error_propagates_without_assistant_message() {
        let engine = ScriptedEngine::new(vec![CompletionChunk::content("partial")])
            .with_stream_error("decode failed");
        let mut session = loaded_session(&engine).await;
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = submit(&mut session, "go".to_string(), 0.7, &tx)
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Generation(_)));
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1], Message::user("go"));
    }

    #[tokio::test]
    async fn test_closed_event_channel_does_not_abort_turn() {
        let engine = ScriptedEngine::new(vec![CompletionChunk::content("still here")]);
        let mut session = loaded_session(&engine).await;
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let outcome = submit(&mut session, "x".to_string(), 0.7, &tx).await.unwrap();
        assert_eq!(
            outcome,
            TurnOutcome::Responded {
                content: "still here".to_string()
            }
        );
    }
}
