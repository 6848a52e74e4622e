pub const SUMMARIZER_PREAMBLE: &str = "Progressively summarize the lines of conversation provided, \
adding onto the previous summary and returning a new summary.";

const CONVERSATION_PREAMBLE: &str = "The following is a friendly conversation between a human and an AI. \
The AI is talkative and provides lots of specific details from its context. \
If the AI does not know the answer to a question, it truthfully says it does not know.";

/// Prompt for one turn: the running summary stands in for the history.
pub fn conversation(summary: &str, input: &str) -> String {
    format!("{CONVERSATION_PREAMBLE}\n\nCurrent conversation:\n{summary}\nHuman: {input}\nAI:")
}

/// Prompt asking the model to fold `new_lines` into `summary`.
pub fn summarize(summary: &str, new_lines: &str) -> String {
    format!(
        "{SUMMARIZER_PREAMBLE}\n\nCurrent summary:\n{summary}\n\nNew lines of conversation:\n{new_lines}\n\nNew summary:"
    )
}
