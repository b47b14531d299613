//! Scoring prompt and structured-output schema for the language model

use serde_json::{Value, json};

use crate::providers::ScoringRequest;
use crate::text_metrics::TranscriptMetrics;

/// Name the schema is registered under when a provider supports structured output
pub const SCHEMA_NAME: &str = "conversation_feedback";

/// Sampling temperature for scoring requests
pub const SCORING_TEMPERATURE: f32 = 0.7;

const SYSTEM_PROMPT: &str = "You are an expert communication coach analyzing a conversation practice session.

Given the user's transcript and the AI's transcript, evaluate the conversation on multiple dimensions and provide structured feedback.

Analyze the following aspects:
1. Clarity & Brevity: How clear and concise were their statements?
2. Confidence: Did they sound confident and assertive?
3. Empathy & Active Listening: Did they acknowledge the other person and show understanding?
4. Structure: Was their conversation well-organized with clear points?
5. Tone: Was their tone appropriate for the context?

Provide scores from 0 to 10 for clarity, confidence, empathy, and pacing quality.

Also provide:
- A brief summary (2-3 sentences)
- 3 specific things they did well
- 3 specific areas for improvement
- 1 practice drill they should do before their next session
- A brief tone assessment and a brief structure assessment

Return your analysis as a single JSON object with exactly these fields:
{
  \"clarity_score\": 7.5,
  \"confidence_score\": 6.0,
  \"empathy_score\": 8.0,
  \"pacing_score\": 7.0,
  \"summary\": \"Your analysis summary here\",
  \"strengths\": [\"strength 1\", \"strength 2\", \"strength 3\"],
  \"improvements\": [\"improvement 1\", \"improvement 2\", \"improvement 3\"],
  \"practice_drill\": \"Specific drill description\",
  \"tone_analysis\": \"Brief tone assessment\",
  \"structure_quality\": \"Brief structure assessment\"
}";

/// Transcripts and timing the prompt is built from
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub user_transcript: &'a str,
    pub ai_transcript: &'a str,
    pub duration_seconds: f64,
}

/// The fixed rubric instruction
pub fn system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

/// JSON schema the model's answer must satisfy
pub fn response_schema() -> Value {
    let score = json!({ "type": "number", "minimum": 0, "maximum": 10 });
    let text = json!({ "type": "string" });
    let list = json!({ "type": "array", "items": { "type": "string" } });

    json!({
        "type": "object",
        "properties": {
            "clarity_score": score,
            "confidence_score": score,
            "empathy_score": score,
            "pacing_score": score,
            "summary": text,
            "strengths": list,
            "improvements": list,
            "practice_drill": text,
            "tone_analysis": text,
            "structure_quality": text,
        },
        "required": [
            "clarity_score",
            "confidence_score",
            "empathy_score",
            "pacing_score",
            "summary",
            "strengths",
            "improvements",
            "practice_drill",
            "tone_analysis",
            "structure_quality",
        ],
        "additionalProperties": false,
    })
}

/// Render the user-content block: transcripts plus computed metrics
pub fn user_prompt(input: &PromptInput<'_>, metrics: &TranscriptMetrics) -> String {
    let ai_transcript = if input.ai_transcript.trim().is_empty() {
        "N/A"
    } else {
        input.ai_transcript
    };

    format!(
        "User Transcript:\n{}\n\nAI Transcript:\n{}\n\nAdditional Metrics:\n\
         - Duration: {} seconds\n\
         - Words per minute: {}\n\
         - Filler word count: {}\n\
         - Question ratio: {:.1}%\n\n\
         Please analyze this conversation and provide structured feedback.",
        input.user_transcript,
        ai_transcript,
        input.duration_seconds,
        metrics.words_per_minute,
        metrics.fillers.count,
        metrics.question_ratio,
    )
}

/// Build the provider-agnostic scoring request
pub fn build_scoring_request(
    input: &PromptInput<'_>,
    metrics: &TranscriptMetrics,
) -> ScoringRequest {
    ScoringRequest::new(system_prompt(), user_prompt(input, metrics))
        .with_schema(SCHEMA_NAME, response_schema())
        .with_temperature(SCORING_TEMPERATURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_metrics::analyze;

    fn input<'a>(user: &'a str, ai: &'a str) -> PromptInput<'a> {
        PromptInput {
            user_transcript: user,
            ai_transcript: ai,
            duration_seconds: 30.0,
        }
    }

    #[test]
    fn test_user_prompt_includes_transcripts_and_metrics() {
        let user = "Um, I think we should ship on Friday. Does that work?";
        let metrics = analyze(user, 30.0);
        let prompt = user_prompt(&input(user, "Friday is tight."), &metrics);

        assert!(prompt.contains(user));
        assert!(prompt.contains("Friday is tight."));
        assert!(prompt.contains("Duration: 30 seconds"));
        assert!(prompt.contains(&format!("Words per minute: {}", metrics.words_per_minute)));
        assert!(prompt.contains("Filler word count: 1"));
        assert!(prompt.contains("Question ratio: 50.0%"));
    }

    #[test]
    fn test_missing_ai_transcript_rendered_as_na() {
        let metrics = analyze("Hello.", 5.0);
        let prompt = user_prompt(&input("Hello.", "   "), &metrics);
        assert!(prompt.contains("AI Transcript:\nN/A"));
    }

    #[test]
    fn test_schema_requires_every_field() {
        let schema = response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();

        for field in [
            "clarity_score",
            "confidence_score",
            "empathy_score",
            "pacing_score",
            "summary",
            "strengths",
            "improvements",
            "practice_drill",
            "tone_analysis",
            "structure_quality",
        ] {
            assert!(required.contains(&field), "missing {field}");
            assert!(schema["properties"].get(field).is_some());
        }
        assert_eq!(schema["properties"]["pacing_score"]["maximum"], 10);
    }

    #[test]
    fn test_build_request_carries_rubric_and_schema() {
        let metrics = analyze("Hello there.", 5.0);
        let request = build_scoring_request(&input("Hello there.", ""), &metrics);

        assert!(request.system_prompt.contains("Empathy & Active Listening"));
        assert!(request.system_prompt.contains("0 to 10"));
        assert_eq!(request.schema_name, SCHEMA_NAME);
        assert!(request.response_schema.is_some());
        assert!((request.temperature - 0.7).abs() < f32::EPSILON);
    }
}
