//! Skill topic detection via a fixed keyword table.

/// Ordered skill → keyword table. Earlier rows win when several skills match.
pub const SKILL_KEYWORDS: &[(&str, &[&str])] = &[
    ("sql", &["sql"]),
    ("python", &["python"]),
    ("powerbi", &["powerbi"]),
];

/// Returns the first skill whose keywords appear (case-insensitively) in the proposed
/// question or in any previous question.
pub fn identify_current_skill(question: &str, previous_questions: &[String]) -> Option<&'static str> {
    let question = question.to_lowercase();
    let previous: Vec<String> = previous_questions.iter().map(|q| q.to_lowercase()).collect();

    SKILL_KEYWORDS
        .iter()
        .find(|(_, keywords)| {
            keywords.iter().any(|kw| {
                question.contains(kw) || previous.iter().any(|q| q.contains(kw))
            })
        })
        .map(|(skill, _)| *skill)
}
