//! Prompt framing for grounded answers.

/// Fixed system framing sent with every question.
pub const SYSTEM_PROMPT: &str = "\
You are an expert basketball statistics analyst. Answer the user's question \
using only the numbered sources provided with it.

Guidelines:
1. Ground every claim in the sources and cite them as [Source n].
2. Never invent statistics, dates, or results that the sources do not state.
3. If the sources do not contain the answer, say that the data is not available.
4. Quote figures exactly as written in the sources.
5. Point out notable trends or comparisons when the sources support them.
6. Keep the answer concise and well organized.";

/// User message combining the assembled context and the question.
pub fn user_message(context: &str, query: &str) -> String {
    format!("Sources:\n\n{context}\n\nQuestion: {query}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_user_message_layout() {
        assert_eq!(
            user_message("[Source 1] team LAL\nLakers won 52 games in 2020", "Lakers wins?"),
            "Sources:\n\n[Source 1] team LAL\nLakers won 52 games in 2020\n\nQuestion: Lakers wins?"
        );
        assert!(SYSTEM_PROMPT.contains("Never invent statistics"));
    }
}
