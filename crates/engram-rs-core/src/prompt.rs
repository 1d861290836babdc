//! System prompt assembly for a turn.

/// Build the system message injecting recalled memories as free text.
///
/// The memory lines arrive exactly as `search_memories` produced them,
/// including its sentinel and failure texts; the model sees what the search
/// saw.
pub fn build_system_prompt(memories: &[String]) -> String {
    let mut prompt = String::from(
        "You are a helpful assistant that can analyze pull requests and \
         remember past conversations. Use the available tools when they help \
         answer the user's question.",
    );
    prompt.push_str("\n\nRelevant memories from previous conversations:\n");
    for memory in memories {
        prompt.push_str(memory);
        if !memory.ends_with('\n') {
            prompt.push('\n');
        }
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::build_system_prompt;

    #[test]
    fn embeds_memory_lines() {
        let prompt = build_system_prompt(&[
            "Similarity: 0.900\nMemory: user likes Rust\n".to_string(),
            "Similarity: 0.500\nMemory: user maintains repo X\n".to_string(),
        ]);
        assert!(prompt.contains("user likes Rust"));
        assert!(prompt.contains("user maintains repo X"));
    }

    #[test]
    fn handles_empty_memory_list() {
        let prompt = build_system_prompt(&[]);
        assert!(prompt.contains("Relevant memories"));
    }
}
