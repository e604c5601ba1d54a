//! Prompt templates. Every function here is pure: the same inputs always
//! give the same prompt.

/// Instruction header of the MCQ prompt. The answer parser relies on the
/// model leading its reply with the letter.
pub const MCQ_INSTRUCTIONS: &str = "Choose the correct answer (A, B, C, or D) and provide only the letter.\n\n\
For example, if the correct answer is B, just output:\n\n\
B\n\n\
Make sure to restate the letter of the correct answer.";

pub const SHORTQA_INSTRUCTIONS: &str =
    "Answer the following question using relevant information from the textbook. \
Be concise, factual, and clear.";

/// Few-shot examples shown before a short-answer question.
pub const SHORTQA_EXAMPLES: [(&str, &str); 2] = [
    (
        "What is the function of the heart?",
        "The heart pumps blood throughout the body, delivering oxygen and nutrients.",
    ),
    (
        "What are the three types of blood vessels?",
        "Arteries, veins, and capillaries.",
    ),
];

pub fn build_mcq_prompt(question: &str, options: &str) -> String {
    format!("{MCQ_INSTRUCTIONS}\n\nQuestion: {question}\n\nOptions:\n{options}\n\n")
}

pub fn build_shortqa_prompt(question: &str, context: Option<&str>) -> String {
    let mut prompt = String::with_capacity(512);
    prompt.push_str(SHORTQA_INSTRUCTIONS);
    prompt.push_str("\n\n");

    if let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str("Textbook excerpts:\n");
        prompt.push_str(context);
        prompt.push_str("\n\n");
    }

    for (i, (q, a)) in SHORTQA_EXAMPLES.iter().enumerate() {
        prompt.push_str(&format!("Example {}:\nQ: {}\nA: {}\n\n", i + 1, q, a));
    }

    prompt.push_str(&format!("Now answer the question:\nQ: {question}\nA:"));
    prompt
}

/// Ground `prompt` in retrieved textbook context. Empty context leaves the
/// prompt unchanged.
pub fn with_context(context: &str, prompt: &str) -> String {
    let context = context.trim();
    if context.is_empty() {
        return prompt.to_string();
    }
    format!(
        "Context information is below.\n\
         ---------------------\n\
         {context}\n\
         ---------------------\n\
         Given the context information and not prior knowledge, answer the query.\n\
         Query: {prompt}\n\
         Answer: "
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mcq_prompt_layout() {
        let prompt = build_mcq_prompt(
            "What is the function of the heart?",
            "A. digest\nB. pump blood\nC. filter\nD. hormones",
        );
        assert!(prompt.starts_with("Choose the correct answer (A, B, C, or D)"));
        assert!(prompt.contains("\n\nQuestion: What is the function of the heart?\n\n"));
        assert!(prompt.ends_with("Options:\nA. digest\nB. pump blood\nC. filter\nD. hormones\n\n"));
    }

    #[test]
    fn test_mcq_prompt_is_deterministic() {
        let a = build_mcq_prompt("Q?", "A. 1\nB. 2\nC. 3\nD. 4");
        let b = build_mcq_prompt("Q?", "A. 1\nB. 2\nC. 3\nD. 4");
        assert_eq!(a, b);
    }

    #[test]
    fn test_shortqa_prompt_without_context() {
        let prompt = build_shortqa_prompt("What do enzymes do?", None);
        assert!(prompt.starts_with(SHORTQA_INSTRUCTIONS));
        assert!(prompt.contains("Example 1:\nQ: What is the function of the heart?\nA: "));
        assert!(prompt.contains("Example 2:\nQ: What are the three types of blood vessels?"));
        assert!(prompt.ends_with("Now answer the question:\nQ: What do enzymes do?\nA:"));
        assert!(!prompt.contains("Textbook excerpts"));
    }

    #[test]
    fn test_shortqa_prompt_with_context() {
        let prompt = build_shortqa_prompt("What do enzymes do?", Some("Enzymes speed up reactions."));
        let context_at = prompt.find("Enzymes speed up reactions.").unwrap();
        let question_at = prompt.find("Q: What do enzymes do?").unwrap();
        assert!(context_at < question_at);

        let blank = build_shortqa_prompt("What do enzymes do?", Some("  \n"));
        assert_eq!(blank, build_shortqa_prompt("What do enzymes do?", None));
    }

    #[test]
    fn test_with_context() {
        let grounded = with_context("The heart pumps blood.", "Question?");
        assert!(grounded.contains("---------------------\nThe heart pumps blood.\n---------------------"));
        assert!(grounded.contains("Query: Question?"));
        assert_eq!(with_context("   ", "Question?"), "Question?");
    }
}
