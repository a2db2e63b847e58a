//! Sound categories and their name lookup.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mixer channel a sound plays on. Each category has its own volume scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCategory {
    /// Master channel; scaled only by the master gain.
    Master,
    /// Background music
    Music,
    /// Jukebox records
    Record,
    /// Rain and thunder
    Weather,
    /// Block sounds, including jets
    Block,
    /// Hostile creatures
    Hostile,
    /// Passive creatures and the fallback category
    Neutral,
    /// Player actions
    Player,
    /// Environmental ambience
    Ambient,
    /// Voice/speech
    Voice,
    /// Footstep acoustics
    Footsteps,
    /// Toolbar equip and swing sounds
    Toolbar,
}

impl SoundCategory {
    /// All categories in mixer order.
    pub const ALL: [SoundCategory; 12] = [
        SoundCategory::Master,
        SoundCategory::Music,
        SoundCategory::Record,
        SoundCategory::Weather,
        SoundCategory::Block,
        SoundCategory::Hostile,
        SoundCategory::Neutral,
        SoundCategory::Player,
        SoundCategory::Ambient,
        SoundCategory::Voice,
        SoundCategory::Footsteps,
        SoundCategory::Toolbar,
    ];

    /// Canonical lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            SoundCategory::Master => "master",
            SoundCategory::Music => "music",
            SoundCategory::Record => "record",
            SoundCategory::Weather => "weather",
            SoundCategory::Block => "block",
            SoundCategory::Hostile => "hostile",
            SoundCategory::Neutral => "neutral",
            SoundCategory::Player => "player",
            SoundCategory::Ambient => "ambient",
            SoundCategory::Voice => "voice",
            SoundCategory::Footsteps => "footsteps",
            SoundCategory::Toolbar => "toolbar",
        }
    }

    /// Look up a category by name. Accepts the plural forms used by older
    /// configuration files (`blocks`, `players`, `records`).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        let name = match name.as_str() {
            "blocks" => "block",
            "players" => "player",
            "records" => "record",
            other => other,
        };
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Music-like categories that a fader may mute.
    pub fn can_mute(self) -> bool {
        matches!(self, SoundCategory::Music | SoundCategory::Record)
    }
}

impl fmt::Display for SoundCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
