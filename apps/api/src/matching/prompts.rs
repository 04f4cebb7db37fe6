//! Prompts for the scoring and critic oracles. Both demand bare JSON;
//! `strip_code_fences` handles the models that ignore that anyway.

pub const SCORING_SYSTEM: &str = "You are an expert resume matcher. You evaluate how well a \
resume fits a specific job posting and return structured scores.";

const SCORING_TEMPLATE: &str = r#"Score how well this resume matches the job across four dimensions, each 0-100. Be discriminating - use the full range.

1. skill_alignment - does the candidate have the required technical skills?
2. experience_match - do years and level of experience meet the requirements?
3. role_fit - do past roles and responsibilities align with the job duties?
4. cultural_fit - does the background suggest a fit with the company environment? Omit this field if the posting gives you nothing to judge it by.

Also write a short summary explaining the match quality: what aligns, what is missing, key strengths and gaps.

CRITICAL: Return ONLY valid JSON. No markdown, no code blocks.

JSON format:
{
  "skill_alignment": 90,
  "experience_match": 80,
  "role_fit": 70,
  "cultural_fit": 60,
  "summary": "Strong technical overlap; experience depth unclear."
}
{guidance}
RESUME:
{resume}

JOB:
{job}"#;

/// Appendix used on the one retry after malformed output.
const STRICT_SUFFIX: &str = "\n\nYOUR PREVIOUS RESPONSE WAS NOT PARSEABLE. Respond with exactly \
one JSON object in the format above. Every score must be an integer between 0 and 100. \
No other text of any kind.";

pub fn scoring_prompt(resume: &str, job: &str, guidance: &[String], strict: bool) -> String {
    let guidance_block = if guidance.is_empty() {
        String::new()
    } else {
        let items: String = guidance.iter().map(|g| format!("- {g}\n")).collect();
        format!("\nApply these refinements from earlier review rounds:\n{items}")
    };

    let mut prompt = SCORING_TEMPLATE
        .replace("{guidance}", &guidance_block)
        .replace("{resume}", truncate(resume, 4000))
        .replace("{job}", truncate(job, 3500));

    if strict {
        prompt.push_str(STRICT_SUFFIX);
    }
    prompt
}

pub const CRITIC_SYSTEM: &str = "You are a quality control expert reviewing resume-job match \
analyses produced by another model.";

const CRITIC_TEMPLATE: &str = r#"Review this match analysis for quality:

{analysis}

Consider:
1. Are the dimension scores consistent with the summary?
2. Is the summary specific, or generic filler?
3. Were any obvious requirements likely missed?

Return a quality_score from 0-100 and concrete suggestions for improving the analysis. An empty suggestions list means you found nothing to fix.

CRITICAL: Return ONLY valid JSON. No markdown, no code blocks.

JSON format:
{
  "quality_score": 75,
  "suggestions": ["Re-check the seniority requirement against stated years"]
}"#;

pub fn critic_prompt(analysis_json: &str) -> String {
    CRITIC_TEMPLATE.replace("{analysis}", analysis_json)
}

/// Truncates on a char boundary so oversized documents cannot blow the
/// prompt budget.
fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
