//! Text generation tiers (song composition)
//!
//! Two tiers, OpenAI → Gemini, both producing the same JSON song
//! sheet. Output that fails validation (missing sections, oversized
//! sections, wrong tag arity) counts as that tier's failure so the
//! executor can fall through to the next tier.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::executor::{ProviderError, ProviderTier};
use crate::models::song::GENRE_TAG_COMPONENTS;
use crate::models::{ComposeRequest, SongSheet};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_MODEL: &str = "gpt-4o";
const GEMINI_GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";
const HTTP_TIMEOUT_SECS: u64 = 45;

const SYSTEM_PROMPT: &str = "You are a music producer creating personalized daily songs. \
Generate song specifications in JSON format following the music generation guidelines.";

/// Maximum lines in a verse section
pub const MAX_VERSE_LINES: usize = 8;
/// Maximum lines in a chorus section
pub const MAX_CHORUS_LINES: usize = 6;

/// Build the compose prompt from the flattened context summary
pub fn build_compose_prompt(request: &ComposeRequest) -> String {
    let news_summary = if request.news_titles.is_empty() {
        "- No notable headlines".to_string()
    } else {
        request
            .news_titles
            .iter()
            .map(|t| format!("- {}", t))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let schedule_summary = if request.activity_titles.is_empty() {
        "No scheduled activities".to_string()
    } else {
        request
            .activity_titles
            .iter()
            .map(|t| format!("- {}", t))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"Create a personalized daily song based on today's context.

CONTEXT:
Weather: {weather}
Top News:
{news}
Schedule:
{schedule}

User Preferences:
- Genres: {genres}
- Vocal: {vocal}
- Mood: {mood}

GENERATE (in JSON format):
{{
    "genre_tags": "5-component tag string for music generation",
    "lyrics": "Complete lyrics with [verse] and [chorus] sections",
    "title": "Song title (max 50 characters)",
    "description": "One sentence about the song (max 100 characters)"
}}

REQUIREMENTS FOR GENRE TAGS:
- Must include exactly 5 components (space-separated): genre, instrument, mood, gender, timbre
- Use tags from: pop, rock, electronic, folk, indie, acoustic, jazz, r&b
- Mood tags: uplifting, energetic, calm, inspiring, melancholic, motivational
- Gender: male, female, neutral

REQUIREMENTS FOR LYRICS:
- Structure: one [verse] section followed by one [chorus] section
- Verse: Maximum {max_verse} lines
- Chorus: Maximum {max_chorus} lines
- Separate sections with a double newline
- Tell a story: weather, news, the user's day, motivation
- Keep language simple and singable

Return ONLY valid JSON, no additional text."#,
        weather = request.weather_summary,
        news = news_summary,
        schedule = schedule_summary,
        genres = request.genres.join(", "),
        vocal = request.vocal_preference,
        mood = request.mood_preference,
        max_verse = MAX_VERSE_LINES,
        max_chorus = MAX_CHORUS_LINES,
    )
}

/// Parse and validate a model response into a song sheet.
///
/// Tolerates markdown code fences around the JSON. Any structural
/// violation is a `Malformed` error - the caller's tier fails and the
/// executor moves on.
pub fn parse_song_sheet(raw: &str) -> Result<SongSheet, ProviderError> {
    #[derive(Debug, Deserialize)]
    struct RawSheet {
        genre_tags: String,
        lyrics: String,
        title: String,
        description: String,
    }

    let cleaned = strip_code_fences(raw);
    let parsed: RawSheet = serde_json::from_str(cleaned)
        .map_err(|e| ProviderError::Malformed(format!("invalid JSON: {}", e)))?;

    let sheet = SongSheet {
        title: parsed.title.trim().to_string(),
        description: parsed.description.trim().to_string(),
        lyrics: parsed.lyrics.trim().to_string(),
        genre_tags: parsed.genre_tags.trim().to_string(),
    };
    validate_song_sheet(&sheet).map_err(ProviderError::Malformed)?;

    Ok(sheet)
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language hint, then the closing fence
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim().strip_suffix("```").unwrap_or(rest).trim()
}

/// Validate the structural requirements of a composed song sheet
pub fn validate_song_sheet(sheet: &SongSheet) -> Result<(), String> {
    if sheet.title.is_empty() {
        return Err("missing title".to_string());
    }

    let lyrics_lower = sheet.lyrics.to_lowercase();
    let verse_count = lyrics_lower.matches("[verse]").count();
    let chorus_count = lyrics_lower.matches("[chorus]").count();
    if verse_count != 1 {
        return Err(format!("expected exactly one [verse] section, found {}", verse_count));
    }
    if chorus_count != 1 {
        return Err(format!("expected exactly one [chorus] section, found {}", chorus_count));
    }

    let verse_pos = lyrics_lower.find("[verse]").expect("checked above");
    let chorus_pos = lyrics_lower.find("[chorus]").expect("checked above");
    if chorus_pos < verse_pos {
        return Err("[chorus] must follow [verse]".to_string());
    }

    let verse_lines = section_lines(&lyrics_lower[verse_pos..chorus_pos]);
    if verse_lines > MAX_VERSE_LINES {
        return Err(format!("verse has {} lines (max {})", verse_lines, MAX_VERSE_LINES));
    }
    let chorus_lines = section_lines(&lyrics_lower[chorus_pos..]);
    if chorus_lines > MAX_CHORUS_LINES {
        return Err(format!("chorus has {} lines (max {})", chorus_lines, MAX_CHORUS_LINES));
    }

    let components = sheet.genre_tags.split_whitespace().count();
    if components != GENRE_TAG_COMPONENTS {
        return Err(format!(
            "genre tags must have exactly {} components, got {}",
            GENRE_TAG_COMPONENTS, components
        ));
    }

    Ok(())
}

/// Count lyric lines in a section, ignoring blanks and section markers
fn section_lines(section: &str) -> usize {
    section
        .lines()
        .filter(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('[')
        })
        .count()
}

// ============================================================================
// OpenAI - primary
// ============================================================================

pub struct OpenAiTextGen {
    client: reqwest::Client,
    api_key: String,
}

impl OpenAiTextGen {
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(Self { client, api_key })
    }
}

#[async_trait]
impl ProviderTier<ComposeRequest, SongSheet> for OpenAiTextGen {
    fn name(&self) -> &str {
        "openai"
    }

    async fn call(&self, request: &ComposeRequest) -> Result<SongSheet, ProviderError> {
        let body = json!({
            "model": OPENAI_MODEL,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": build_compose_prompt(request)},
            ],
            "temperature": 0.8,
            "max_tokens": 1500,
            "response_format": {"type": "json_object"},
        });

        let response = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), body));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let content = parsed["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ProviderError::Malformed("no message content".to_string()))?;

        parse_song_sheet(content)
    }
}

// ============================================================================
// Gemini - fallback
// ============================================================================

pub struct GeminiTextGen {
    client: reqwest::Client,
    api_key: String,
}

impl GeminiTextGen {
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(Self { client, api_key })
    }
}

#[async_trait]
impl ProviderTier<ComposeRequest, SongSheet> for GeminiTextGen {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn call(&self, request: &ComposeRequest) -> Result<SongSheet, ProviderError> {
        let body = json!({
            "contents": [{
                "parts": [{"text": build_compose_prompt(request)}],
            }],
            "generationConfig": {
                "temperature": 0.8,
                "maxOutputTokens": 1500,
            },
        });

        let response = self
            .client
            .post(GEMINI_GENERATE_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), body));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let content = parsed["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| ProviderError::Malformed("no candidate text".to_string()))?;

        parse_song_sheet(content)
    }
}
