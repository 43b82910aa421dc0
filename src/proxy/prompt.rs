/// Build the fact-check prompt for `text`.
///
/// The text is embedded verbatim, quoted.
pub fn fact_check_prompt(text: &str) -> String {
    format!(
        "Analyze the following user-selected text for factual accuracy, bias, and context. \
Search for reliable sources to verify the core claim. \
Your output MUST be in a valid JSON format following the provided schema. \
The text to analyze is: \"{}\"",
        text
    )
}
