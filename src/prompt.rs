//! Request construction: fixed instruction template plus the user's fields

use serde::Serialize;

use crate::form::ChannelInput;

/// Used when the audience field is left blank
pub const AUDIENCE_FALLBACK: &str = "Not specified (assume based on topic)";

pub const SYSTEM_PROMPT: &str = r#"You are a YouTube Growth Strategist, Content Architect, SEO Expert, and Monetization Consultant.

Your task is to create a COMPLETE YOUTUBE CHANNEL STRATEGY for the given input.

The strategy must be practical, structured, and designed for long-term growth, authority building, and monetization.

Avoid generic advice. Give specific actionable ideas.

YOUR OUTPUT MUST FOLLOW THIS EXACT STRUCTURE:

# 1️⃣ CHANNEL POSITIONING

Define:
- Core niche
- Unique angle
- What makes this channel different
- Emotional value offered to viewers
- Authority positioning statement

# 2️⃣ TARGET AUDIENCE PROFILE

Describe:
- Who they are
- Their biggest problems
- What they search on YouTube
- What type of videos they binge-watch
- Their transformation goal

# 3️⃣ CONTENT PILLARS (Give 4–6)

For each pillar include:
- Pillar name
- What type of videos belong here
- Why this pillar attracts viewers
- Monetization role (growth / trust / sales)

# 4️⃣ VIDEO STRATEGY

Explain clearly:
- Shorts strategy
- Long video strategy
- Educational vs emotional mix
- Authority-building video types
- Viral video formats to use
- Series ideas for retention

# 5️⃣ 10 STARTER VIDEO IDEAS

Give 10 strong early videos.

For each include:
- Title idea
- Video angle
- Why it will perform well

# 6️⃣ SEO STRATEGY

Explain:
- Keyword approach (recommend specific tools like vidIQ, TubeBuddy, Ahrefs, or YouTube Search Auto-suggest)
- Title formula
- Thumbnail psychology
- Description structure
- Tag strategy
- How to rank as a new channel

# 7️⃣ MONETIZATION ROADMAP

Explain step-by-step:
- Phase 1 — First 1k subscribers
- Phase 2 — 1k–10k growth
- Phase 3 — Authority stage

Include:
- When to sell
- What to sell
- Lead magnet ideas
- Affiliate options
- Digital product ideas

# 8️⃣ POSTING SCHEDULE PLAN

Create a realistic weekly plan based on posting capacity.

Include:
- Shorts vs long video mix
- Batch recording strategy
- Growth timeline expectation

# 9️⃣ 90-DAY GROWTH ROADMAP

Explain what to focus on:
- Month 1 — Foundation
- Month 2 — Momentum
- Month 3 — Authority

Include:
- Key actions
- Metrics to track
- What success looks like

GLOBAL RULES:
- Use simple English
- Avoid generic advice
- Be practical, not theoretical
- Keep formatting clean using Markdown
- Avoid emojis (except the headers)
- Do not skip sections
- Focus on growth + monetization"#;

/// Render the user turn sent alongside the system instruction
pub fn compose_prompt(input: &ChannelInput) -> String {
    let audience = match input.audience.trim() {
        "" => AUDIENCE_FALLBACK,
        a => a,
    };

    format!(
        "INPUT:\n\
         Channel Topic: {}\n\
         Target Audience: {}\n\
         Goal: {}\n\
         Experience Level: {}\n\
         Posting Capacity: {}\n",
        input.topic.trim(),
        audience,
        input.goal,
        input.experience,
        input.capacity,
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
}

/// Body of a `streamGenerateContent` call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub contents: Vec<Content>,
    pub system_instruction: Content,
    pub generation_config: GenerationConfig,
}

impl GenerationRequest {
    pub fn new(input: &ChannelInput, temperature: f32) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: compose_prompt(input),
                }],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: SYSTEM_PROMPT.to_string(),
                }],
            },
            generation_config: GenerationConfig { temperature },
        }
    }

    /// The user turn, mostly for logging
    pub fn user_text(&self) -> &str {
        self.contents
            .first()
            .and_then(|c| c.parts.first())
            .map(|p| p.text.as_str())
            .unwrap_or_default()
    }
}
