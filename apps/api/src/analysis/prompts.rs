// Resume analysis prompt template.
// Every provider receives exactly this prompt; the normalizer depends on the
// JSON-only instruction at the end.

const ANALYSIS_PREAMBLE: &str = "You are an expert career advisor and recruiter. \
Analyze how well the following resume matches the job description.";

const ANALYSIS_OUTPUT_INSTRUCTION: &str = r#"Provide your analysis in the following JSON format only (no extra text):
{
  "score": <number from 0 to 100>,
  "feedback": "<detailed feedback with strengths, weaknesses, and suggestions for improvement>"
}"#;

/// Renders the analysis prompt. Both inputs are embedded verbatim.
pub fn build_prompt(resume_text: &str, job_description: &str) -> String {
    format!(
        "{ANALYSIS_PREAMBLE}\n\nResume:\n{resume_text}\n\nJob Description:\n{job_description}\n\n{ANALYSIS_OUTPUT_INSTRUCTION}"
    )
}
