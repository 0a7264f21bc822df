// Shared prompt constants and template filling.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Keeps generated and assessed content tied to the supplied documents.
pub const GROUNDING_INSTRUCTION: &str = "\
    Base everything you write on the resume and job description provided. \
    Do NOT invent employers, projects, or technologies that appear in neither document.";

/// Fills `{name}` placeholders in a single pass over `template`.
///
/// Only the template is scanned, so braces inside substituted values (uploaded
/// documents, candidate answers) are copied through verbatim. Braces that do not
/// name a known placeholder, like the JSON shape at the end of a prompt, are kept.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substitution = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match substitution {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
