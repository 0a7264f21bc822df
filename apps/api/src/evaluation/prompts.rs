pub const ASSESSMENT_SYSTEM: &str = "You are a strict reviewer of interview questions. \
    You answer every assessment with a single word, Yes or No. \
    You MUST respond with valid JSON only.";

pub const ASSESSMENT_PROMPT_TEMPLATE: &str = r#"Answer the assessment question about the text below.

ASSESSMENT QUESTION:
{assessment_question}

TEXT:
{assessed_text}

Return JSON with exactly this shape:
{"assessment_answer": "Yes" | "No"}"#;
