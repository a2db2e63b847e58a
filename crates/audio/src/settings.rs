//! Audio settings and per-category volume controls.

use crate::SoundCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Volume percentages (0 to 100) for the master channel and each category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Master volume percent
    pub master: u8,
    /// Per-category volume percent; categories not listed play at 100
    pub categories: BTreeMap<SoundCategory, u8>,
    /// Silences everything without touching the stored percents
    pub muted: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(SoundCategory::Music, 50);
        categories.insert(SoundCategory::Ambient, 70);
        Self {
            master: 100,
            categories,
            muted: false,
        }
    }
}

impl AudioSettings {
    /// Same as [`AudioSettings::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Listener gain in `0.0..=1.0`; zero while muted.
    pub fn master_gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            percent(self.master)
        }
    }

    /// Scale for a category. The master category is already covered by
    /// [`AudioSettings::master_gain`] and always reports 1.
    pub fn category_scale(&self, category: SoundCategory) -> f32 {
        if category == SoundCategory::Master {
            return 1.0;
        }
        self.categories
            .get(&category)
            .map(|&p| percent(p))
            .unwrap_or(1.0)
    }

    /// Category scale multiplied by the master gain.
    pub fn effective_volume(&self, category: SoundCategory) -> f32 {
        self.master_gain() * self.category_scale(category)
    }

    /// Flip between muted and audible.
    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    /// Set master volume (clamped to 0-100).
    pub fn set_master(&mut self, percent: u8) {
        self.master = percent.min(100);
    }

    /// Set a category volume (clamped to 0-100).
    pub fn set_category(&mut self, category: SoundCategory, percent: u8) {
        self.categories.insert(category, percent.min(100));
    }
}

fn percent(p: u8) -> f32 {
    f32::from(p.min(100)) / 100.0
}
