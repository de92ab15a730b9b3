//! Configuration module for Faktum.
//!
//! Handles loading and saving application settings.

mod settings;

pub use settings::{
    AudioFallbackSettings, CacheSettings, CaptionSettings, FactCheckSettings, GeneralSettings,
    RateLimitSettings, Settings, TranscriptionSettings,
};
