/// Instruction sent ahead of the resume (and optional job description) to the
/// text model when asking for a rubric.
pub const RUBRIC_INSTRUCTION: &str = "You are an ATS expert. Given the resume text and \
    (optional) job description, return a JSON object with numeric scores (0-1) for: format, \
    readability, experience_relevance, and an overall short suggestions array. Be concise and \
    ONLY return valid JSON.";

pub const RESUME_HEADING: &str = "ResumeText:";

pub const JOB_DESCRIPTION_HEADING: &str = "\nJobDescription:";

/// Suggestion attached to the neutral rubric when the model's answer had no
/// usable JSON in it.
pub const UNSTRUCTURED_OUTPUT_SUGGESTION: &str =
    "Model did not return structured JSON. Consider increasing model token limit.";
