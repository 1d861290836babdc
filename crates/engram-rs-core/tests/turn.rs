//! Turn processor integration tests with scripted model and fake embedder.

use engram_rs_core::{AgentRuntime, ToolRegistry, TurnProcessor, render_transcript};
use engram_rs_llm::{ChatResponse, EmbeddingClient};
use engram_rs_memory::{MemoryStore, MemoryTools, SaveMemoryTool, SearchMemoriesTool};
use engram_rs_protocol::{ToolCall, TraceMessage};
use engram_rs_test_utils::{FixedTool, HashEmbeddingClient, ScriptedChatClient};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

const DIM: usize = 16;

struct Harness {
    chat: Arc<ScriptedChatClient>,
    store: Arc<MemoryStore>,
    embedder: Arc<HashEmbeddingClient>,
    processor: TurnProcessor,
}

/// Wire a processor over in-memory storage, a deterministic embedder, and a
/// scripted model, mirroring the production assembly in the CLI.
fn harness(responses: Vec<ChatResponse>) -> Harness {
    let chat = Arc::new(ScriptedChatClient::new(responses));
    let store = Arc::new(MemoryStore::open_in_memory(DIM).expect("store"));
    let embedder = Arc::new(HashEmbeddingClient::new(DIM));
    let memory_tools = Arc::new(MemoryTools::new(
        store.clone(),
        embedder.clone(),
        0.3,
        5,
    ));

    let registry = ToolRegistry::new();
    registry.register(Arc::new(SaveMemoryTool::new(memory_tools.clone())));
    registry.register(Arc::new(SearchMemoriesTool::new(memory_tools.clone())));
    registry.register(Arc::new(FixedTool::new(
        "create_notion_page",
        json!("Page created"),
    )));

    let runtime = AgentRuntime::new(chat.clone(), registry, 8);
    let processor = TurnProcessor::new(runtime, memory_tools, store.clone());

    Harness {
        chat,
        store,
        embedder,
        processor,
    }
}

fn answer(content: &str) -> ChatResponse {
    ChatResponse {
        content: content.to_string(),
        tool_calls: Vec::new(),
    }
}

/// A non-PR question with no prior memories persists an empty analysis and
/// an "Answer:"-form memory.
#[tokio::test]
async fn non_pr_turn_persists_answer_form() {
    let harness = harness(vec![answer("It is sunny.")]);
    let outcome = harness
        .processor
        .process("What's the weather?")
        .await
        .expect("turn");

    assert_eq!(outcome.answer, "It is sunny.");
    assert!(!outcome.pr_related);
    assert_eq!(outcome.analysis, "");

    let conv = harness
        .store
        .conversation(outcome.conv_id.expect("conv id"))
        .expect("lookup")
        .expect("record");
    assert_eq!(conv.user_question, "What's the weather?");
    assert_eq!(conv.chatbot_answer, "It is sunny.");
    assert_eq!(conv.analysis, "");

    let combined = "Question: What's the weather?\nAnswer: It is sunny.";
    let embedding = harness.embedder.embed(combined).await.expect("embed");
    let hits = harness
        .store
        .find_similar(&embedding, 0.3, 5)
        .expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].ques_analysis, combined);
}

/// A PR question whose model run calls `create_notion_page` persists the
/// parsed analysis and an "Analysis:"-form memory.
#[tokio::test]
async fn pr_turn_extracts_and_persists_analysis() {
    let harness = harness(vec![
        ChatResponse {
            content: String::new(),
            tool_calls: vec![ToolCall::new(
                "call_1",
                "create_notion_page",
                r#"{"content": "X did Y"}"#,
            )],
        },
        answer("Summary posted."),
    ]);

    let outcome = harness
        .processor
        .process("Summarize PR #7")
        .await
        .expect("turn");

    assert!(outcome.pr_related);
    assert_eq!(outcome.analysis, "X did Y");
    assert_eq!(outcome.answer, "Summary posted.");

    let conv = harness
        .store
        .conversation(outcome.conv_id.expect("conv id"))
        .expect("lookup")
        .expect("record");
    assert_eq!(conv.analysis, "X did Y");

    let combined = "Question: Summarize PR #7\nAnalysis: X did Y";
    let embedding = harness.embedder.embed(combined).await.expect("embed");
    let hits = harness
        .store
        .find_similar(&embedding, 0.3, 5)
        .expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].ques_analysis, combined);

    let memories = harness
        .store
        .memories_for_conversation(conv.id)
        .expect("memories");
    assert_eq!(memories.len(), 1);
    assert_eq!(memories[0].conv_id, conv.id);
}

/// The model is offered the memory tools and the remote tool on every call.
#[tokio::test]
async fn model_sees_memory_and_remote_tools() {
    let harness = harness(vec![answer("ok")]);
    harness.processor.process("hello").await.expect("turn");

    let mut names = harness.chat.seen_tools();
    names.sort();
    assert_eq!(
        names,
        vec!["create_notion_page", "save_memory", "search_memories"]
    );
}

/// Recalled memories from earlier turns are injected into the next turn's
/// system message.
#[tokio::test]
async fn second_turn_recalls_first_turn_memory() {
    let harness = harness(vec![answer("Use the release script."), answer("ok")]);

    harness
        .processor
        .process("How do I deploy?")
        .await
        .expect("first turn");
    harness
        .processor
        .process("How do I deploy?")
        .await
        .expect("second turn");

    let calls = harness.chat.seen_messages();
    let second_system = &calls[1][0];
    let TraceMessage::System { content } = second_system else {
        panic!("expected system message first");
    };
    assert!(content.contains("Use the release script."));
    assert!(content.contains("Similarity: "));
}

/// With no prior memories the sentinel is what reaches the model.
#[tokio::test]
async fn empty_recall_injects_sentinel_text() {
    let harness = harness(vec![answer("ok")]);
    harness.processor.process("first question").await.expect("turn");

    let calls = harness.chat.seen_messages();
    let TraceMessage::System { content } = &calls[0][0] else {
        panic!("expected system message first");
    };
    assert!(content.contains("No similar memories found"));
}

/// Transcript rendering covers the whole trace and leaves it untouched.
#[tokio::test]
async fn transcript_renders_full_trace() {
    let harness = harness(vec![
        ChatResponse {
            content: String::new(),
            tool_calls: vec![ToolCall::new(
                "call_1",
                "create_notion_page",
                r#"{"content": "X did Y"}"#,
            )],
        },
        answer("Summary posted."),
    ]);

    let outcome = harness
        .processor
        .process("Review this pull request")
        .await
        .expect("turn");

    let before = outcome.trace.clone();
    let rendered = render_transcript(&outcome.trace);
    assert_eq!(outcome.trace, before);

    assert!(rendered.contains("[Human] Review this pull request"));
    assert!(rendered.contains("-> tool call: create_notion_page"));
    assert!(rendered.contains("[Tool: create_notion_page] Page created"));
    assert!(rendered.contains("[AI] Summary posted."));
}
