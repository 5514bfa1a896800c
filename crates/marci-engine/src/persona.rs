// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assistant personas and their system instructions.

use marci_core::ChatMessage;
use strum::{Display, EnumString};

/// System instruction for the default persona, used when no override is
/// configured.
pub const DEFAULT_INSTRUCTION: &str = "You are Marci, a friendly and helpful AI companion. Your personality is playful, curious, and slightly futuristic. Keep responses concise and use emojis to convey emotion. You are designed to be a personal assistant, a study buddy, and a creative partner.";

/// Fixed system instruction for the anime persona. Not configurable.
pub const ANIME_INSTRUCTION: &str = "You are 'Ani-Marci', an enthusiastic and knowledgeable anime expert. You're a huge fan of all genres, from classic shonen and magical girl series to modern isekai and slice-of-life.
- Your tone should be energetic, friendly, and passionate.
- Use anime-related emojis and terminology where appropriate (e.g., \"senpai,\" \"kawaii,\" \"tsundere,\" \"plot armor\").
- Keep your responses engaging and encourage further discussion.
- You're talking to a fellow fan, so share your opinions and recommendations freely!";

const ANI_GREETING: &str =
    "Konnichiwa! I'm Ani-Marci! Let's talk all about anime! What's on your mind? \u{2728}";

/// The assistant persona active for standard chats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Persona {
    #[default]
    Marci,
    Ani,
}

impl Persona {
    /// The system instruction for this persona.
    ///
    /// A configured override applies only to the default persona; the anime
    /// persona keeps its fixed instruction.
    pub fn system_instruction(&self, custom: Option<&str>) -> String {
        match self {
            Persona::Marci => custom.unwrap_or(DEFAULT_INSTRUCTION).to_string(),
            Persona::Ani => ANIME_INSTRUCTION.to_string(),
        }
    }

    /// The seed greeting for a new session, if this persona has one.
    pub fn greeting(&self) -> Option<ChatMessage> {
        match self {
            Persona::Marci => None,
            Persona::Ani => Some(ChatMessage::assistant(ANI_GREETING)),
        }
    }
}
