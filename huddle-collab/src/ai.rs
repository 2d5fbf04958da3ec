use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use reqwest::Url;

pub type AiResult<T> = std::result::Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    /// The collaborator did not answer within the allowed time. Nothing was
    /// committed.
    #[error("Collaborator timed out")]
    Timeout,
    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),
    #[error("Summarization failed: {0}")]
    SummarizationFailed(String),
}

/// Represents a type that can turn an audio payload into plain text.
#[async_trait]
pub trait Transcriber: Send + Sync + 'static {
    async fn transcribe(&self, audio: Vec<u8>) -> AiResult<String>;
}

/// What the summarization collaborator distilled from a transcript.
#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    pub summary: String,
    pub action_items: Vec<String>,
}

/// Represents a type that can summarize an ordered transcript.
#[async_trait]
pub trait Summarizer: Send + Sync + 'static {
    async fn summarize(&self, transcript: &str) -> AiResult<SummaryOutcome>;
}

/// Both AI collaborators backed by one OpenAI-compatible local endpoint.
pub struct OllamaClient {
    client: Client,
    base_url: Url,
    chat_model: String,
    transcription_model: String,
}

impl OllamaClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
            chat_model: "llama3:8b".to_string(),
            transcription_model: "ZimaBlueAI/whisper-large-v3".to_string(),
        }
    }

    pub fn with_models(mut self, chat_model: &str, transcription_model: &str) -> Self {
        self.chat_model = chat_model.to_string();
        self.transcription_model = transcription_model.to_string();

        self
    }

    fn endpoint(&self, path: &str) -> Url {
        self.base_url
            .join(path)
            .expect("endpoint paths are valid relative urls")
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[async_trait]
impl Summarizer for OllamaClient {
    async fn summarize(&self, transcript: &str) -> AiResult<SummaryOutcome> {
        let prompt = build_analysis_prompt(transcript);

        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are an expert meeting analyst.",
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: 0.7,
        };

        let response: ChatResponse = self
            .client
            .post(self.endpoint("v1/chat/completions"))
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::SummarizationFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| AiError::SummarizationFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| AiError::SummarizationFailed(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AiError::SummarizationFailed("No response from model".to_string()))?;

        Ok(SummaryOutcome {
            action_items: parse_action_items(&content),
            summary: content,
        })
    }
}

#[async_trait]
impl Transcriber for OllamaClient {
    async fn transcribe(&self, audio: Vec<u8>) -> AiResult<String> {
        let form = multipart::Form::new()
            .text("model", self.transcription_model.clone())
            .part(
                "file",
                multipart::Part::bytes(audio).file_name("chunk.wav"),
            );

        let response: TranscriptionResponse = self
            .client
            .post(self.endpoint("v1/audio/transcriptions"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AiError::TranscriptionFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| AiError::TranscriptionFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| AiError::TranscriptionFailed(e.to_string()))?;

        Ok(response.text.trim().to_string())
    }
}

fn build_analysis_prompt(transcript: &str) -> String {
    format!(
        "Based on the following transcript of a group discussion, provide:\n\
         1. A concise one-paragraph summary\n\
         2. Bulleted list of key decisions\n\
         3. Bulleted list of action items with owners\n\
         \n\
         Transcript:\n\
         ---\n\
         {}\n\
         ---\n\
         \n\
         Analysis:",
        transcript
    )
}

/// Pulls the bullet points following an "action items" heading out of the
/// model's free-form answer. The full answer stays available as the summary.
fn parse_action_items(content: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut in_section = false;

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.to_lowercase().contains("action item") {
            in_section = true;
            continue;
        }

        if !in_section {
            continue;
        }

        if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            items.push(item.trim().to_string());
        } else if !trimmed.is_empty() {
            // A new heading ends the section
            in_section = false;
        }
    }

    items
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_action_items() {
        let content = "Summary:\n\
                       The team discussed the release.\n\
                       \n\
                       Key decisions:\n\
                       - Ship on Friday\n\
                       \n\
                       Action items:\n\
                       - Alice: write the changelog\n\
                       * Bob: tag the release\n\
                       \n\
                       Closing notes follow here.";

        let items = parse_action_items(content);

        assert_eq!(
            items,
            vec!["Alice: write the changelog", "Bob: tag the release"]
        );
    }

    #[test]
    fn test_parse_action_items_without_a_section() {
        assert!(parse_action_items("Just a summary, no lists.").is_empty());
    }

    #[test]
    fn test_prompt_carries_the_transcript() {
        let prompt = build_analysis_prompt("alice: hello\nbob: hi");

        assert!(prompt.contains("alice: hello\nbob: hi"));
        assert!(prompt.starts_with("Based on the following transcript"));
    }
}
