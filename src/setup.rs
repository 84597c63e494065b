//! Interactive first-run setup wizard (`lingua setup`)

use dialoguer::{Confirm, Input, Select};

use crate::config::file::{
    ApiKeysFileConfig, ChatFileConfig, LinguaConfigFile, TtsFileConfig, VoiceFileConfig,
};
use crate::config::{DEFAULT_CHAT_MODEL, DEFAULT_STT_MODEL};
use crate::language::{language_at, language_index, language_labels};

/// TTS providers offered by the wizard, as `(label, config value)`
const TTS_PROVIDERS: &[(&str, &str)] = &[
    ("Google Translate (free, no key)", "google"),
    ("OpenAI", "openai"),
];

/// Run the interactive setup wizard
///
/// # Errors
///
/// Returns error if user input fails or config cannot be written
pub fn run_setup() -> anyhow::Result<()> {
    println!("Lingua Setup\n");

    let existing = crate::config::file::load_config_file();
    if let Some(path) = crate::config::file::config_file_path().filter(|p| p.exists()) {
        println!("Existing config found at {}\n", path.display());
    }

    // 1. Language
    let default_language = existing
        .language
        .as_deref()
        .and_then(language_index)
        .unwrap_or(0);

    let language_idx = Select::new()
        .with_prompt("Default language")
        .items(&language_labels())
        .default(default_language)
        .interact()?;
    let language = language_at(language_idx).to_string();

    // 2. OpenAI key
    let existing_key = existing.api_keys.openai.as_deref();
    let prompt = existing_key.map_or_else(
        || "OpenAI API key (OPENAI_API_KEY)".to_string(),
        |k| format!("OpenAI API key (current: {}, leave blank to keep)", mask_key(k)),
    );

    let api_key_input: String = Input::new()
        .with_prompt(&prompt)
        .allow_empty(true)
        .interact_text()?;

    let openai = if api_key_input.trim().is_empty() {
        existing_key.map(str::to_string)
    } else {
        Some(api_key_input.trim().to_string())
    };

    // 3. Models
    let chat_model: String = Input::new()
        .with_prompt("Chat model")
        .default(
            existing
                .chat
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
        )
        .interact_text()?;

    let stt_model: String = Input::new()
        .with_prompt("Transcription model")
        .default(
            existing
                .voice
                .stt_model
                .clone()
                .unwrap_or_else(|| DEFAULT_STT_MODEL.to_string()),
        )
        .interact_text()?;

    let recording_duration: u64 = Input::new()
        .with_prompt("Recording duration (seconds)")
        .default(existing.voice.recording_duration.unwrap_or(5))
        .validate_with(|d: &u64| if *d == 0 { Err("must be at least 1") } else { Ok(()) })
        .interact_text()?;

    // 4. Speech synthesis
    let default_provider = existing
        .tts
        .provider
        .as_deref()
        .and_then(|p| TTS_PROVIDERS.iter().position(|(_, v)| v.eq_ignore_ascii_case(p)))
        .unwrap_or(0);

    let labels: Vec<&str> = TTS_PROVIDERS.iter().map(|(label, _)| *label).collect();
    let provider_idx = Select::new()
        .with_prompt("Speech synthesis")
        .items(&labels)
        .default(default_provider)
        .interact()?;
    let provider = TTS_PROVIDERS[provider_idx].1;

    let tts = if provider == "google" {
        let slow = Confirm::new()
            .with_prompt("Speak slowly?")
            .default(existing.tts.slow.unwrap_or(false))
            .interact()?;

        TtsFileConfig {
            provider: Some(provider.to_string()),
            slow: Some(slow),
            ..TtsFileConfig::default()
        }
    } else {
        let voice: String = Input::new()
            .with_prompt("Voice")
            .default(
                existing
                    .tts
                    .voice
                    .clone()
                    .unwrap_or_else(|| "alloy".to_string()),
            )
            .interact_text()?;

        TtsFileConfig {
            provider: Some(provider.to_string()),
            slow: None,
            model: Some(
                existing
                    .tts
                    .model
                    .clone()
                    .unwrap_or_else(|| "tts-1".to_string()),
            ),
            voice: Some(voice),
            speed: existing.tts.speed.or(Some(1.0)),
        }
    };

    // 5. Write
    let config_file = LinguaConfigFile {
        language: Some(language),
        chat: ChatFileConfig {
            model: Some(chat_model),
            ..existing.chat
        },
        voice: VoiceFileConfig {
            stt_model: Some(stt_model),
            recording_duration: Some(recording_duration),
            ..existing.voice
        },
        tts,
        api_keys: ApiKeysFileConfig { openai },
    };

    let path = crate::config::file::save_config_file(&config_file)?;
    println!("\nConfig written to {}", path.display());

    if config_file.api_keys.openai.is_none() {
        println!("No OpenAI key saved; set OPENAI_API_KEY before running lingua.");
    }

    println!("\nSetup complete! Run `lingua` to start a session.");

    Ok(())
}

/// Show only the ends of a secret
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}
