pub const QUESTION_SYSTEM: &str = "You are an experienced technical interviewer running a \
    mock interview. You ask one question at a time, tailored to the candidate's resume and \
    the job description, and you build on what the candidate has already said. \
    You MUST respond with valid JSON only.";

pub const QUESTION_PROMPT_TEMPLATE: &str = r#"Generate the next interview question.

{grounding_instruction}

Rules:
- Ask exactly ONE question.
- Do NOT repeat or rephrase a previous question.
- Follow up on the candidate's most recent answer when it leaves something worth probing.
- Move on to another requirement from the job description once a skill has been covered well.

{demonstrations}RESUME:
{resume_text}

JOB DESCRIPTION:
{job_text}

PREVIOUS QUESTIONS (one per line, oldest first):
{previous_questions}

PREVIOUS ANSWERS (one per line, oldest first):
{previous_answers}

Return JSON with exactly this shape:
{"question": "<thoughtful interview question>", "rationale": "<brief explanation of the question's relevance>"}"#;

/// Header placed above the rendered demonstrations, when there are any.
pub const DEMONSTRATIONS_HEADER: &str = "Examples of good follow-up questions from past interviews:";
