//! Transcript rendering for a finished turn.

use engram_rs_protocol::TraceMessage;

/// Render the full trace as printable text.
///
/// Pure over the trace: rendering mutates nothing and can be repeated.
pub fn render_transcript(trace: &[TraceMessage]) -> String {
    let mut out = String::new();
    for message in trace {
        match message {
            TraceMessage::Tool {
                content, tool_name, ..
            } => {
                out.push_str(&format!("[Tool: {tool_name}] {content}\n"));
            }
            other => {
                out.push_str(&format!("[{}] {}\n", other.label(), other.content()));
                for call in other.tool_calls() {
                    out.push_str(&format!("  -> tool call: {}({})\n", call.name, call.arguments));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::render_transcript;
    use engram_rs_protocol::{ToolCall, TraceMessage};
    use pretty_assertions::assert_eq;

    fn sample_trace() -> Vec<TraceMessage> {
        vec![
            TraceMessage::system("context"),
            TraceMessage::human("Summarize PR #7"),
            TraceMessage::ai_with_tool_calls(
                "",
                vec![ToolCall::new("call_1", "analyze_pr", r#"{"number": 7}"#)],
            ),
            TraceMessage::tool("looks fine", "analyze_pr", "call_1"),
            TraceMessage::ai("The PR looks fine."),
        ]
    }

    #[test]
    fn renders_every_variant_with_labels() {
        let rendered = render_transcript(&sample_trace());
        assert!(rendered.contains("[System] context"));
        assert!(rendered.contains("[Human] Summarize PR #7"));
        assert!(rendered.contains("-> tool call: analyze_pr({\"number\": 7})"));
        assert!(rendered.contains("[Tool: analyze_pr] looks fine"));
        assert!(rendered.contains("[AI] The PR looks fine."));
    }

    #[test]
    fn rendering_is_idempotent_over_the_trace() {
        let trace = sample_trace();
        let first = render_transcript(&trace);
        let second = render_transcript(&trace);
        assert_eq!(first, second);
    }
}
