//! Interactive session loop (`lingua` with no subcommand)

use std::time::Duration;

use dialoguer::{Confirm, Input, Select};

use crate::Assistant;
use crate::language::{language_at, language_index, language_labels, language_name};

/// One entry of the main menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Voice,
    Text,
    ChangeLanguage,
    ClearHistory,
    Exit,
}

impl MenuAction {
    /// Menu entries in display order
    pub const ALL: [Self; 5] = [
        Self::Voice,
        Self::Text,
        Self::ChangeLanguage,
        Self::ClearHistory,
        Self::Exit,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Voice => "Talk (record a question)",
            Self::Text => "Type a message",
            Self::ChangeLanguage => "Change language",
            Self::ClearHistory => "Clear conversation history",
            Self::Exit => "Exit",
        }
    }

    /// Action at `index`; anything out of range exits
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or(Self::Exit)
    }
}

/// Run the menu until the user exits
///
/// Failures of a single turn are printed and the loop continues.
///
/// # Errors
///
/// Returns error if terminal input fails or a fatal error occurs
pub async fn run_menu(assistant: &mut Assistant, duration: Duration) -> anyhow::Result<()> {
    let labels = MenuAction::ALL.map(MenuAction::label);

    loop {
        let language = assistant.language().to_string();
        let prompt = format!(
            "Lingua [{}]",
            language_name(&language).unwrap_or(language.as_str())
        );

        let idx = Select::new()
            .with_prompt(prompt)
            .items(&labels)
            .default(0)
            .interact()?;

        let outcome = match MenuAction::from_index(idx) {
            MenuAction::Voice => talk(assistant, duration).await,
            MenuAction::Text => type_message(assistant).await,
            MenuAction::ChangeLanguage => {
                change_language(assistant)?;
                Ok(())
            }
            MenuAction::ClearHistory => {
                assistant.clear_history();
                println!("Conversation history cleared.\n");
                Ok(())
            }
            MenuAction::Exit => break,
        };

        if let Err(e) = outcome {
            if e.is_fatal() {
                return Err(e.into());
            }
            tracing::warn!(error = %e, "turn failed");
            println!("Error: {e}\n");
        }
    }

    println!("Goodbye!");
    Ok(())
}

async fn talk(assistant: &mut Assistant, duration: Duration) -> crate::Result<()> {
    println!("Recording for {} seconds... speak now.", duration.as_secs());

    let turn = assistant.converse_by_voice(duration, None).await?;

    println!("You: {}", turn.user_text);
    println!("Assistant: {}\n", turn.assistant_text);
    Ok(())
}

async fn type_message(assistant: &mut Assistant) -> crate::Result<()> {
    let Some((message, speak)) = prompt_message()? else {
        return Ok(());
    };

    let reply = assistant.converse_by_text(&message, speak).await?;
    println!("Assistant: {reply}\n");
    Ok(())
}

fn prompt_message() -> crate::Result<Option<(String, bool)>> {
    let message: String = Input::new()
        .with_prompt("Message")
        .allow_empty(true)
        .interact_text()
        .map_err(std::io::Error::other)?;

    if message.trim().is_empty() {
        return Ok(None);
    }

    let speak = Confirm::new()
        .with_prompt("Speak the reply?")
        .default(true)
        .interact()
        .map_err(std::io::Error::other)?;

    Ok(Some((message, speak)))
}

fn change_language(assistant: &mut Assistant) -> anyhow::Result<()> {
    let current = language_index(assistant.language()).unwrap_or(0);

    let idx = Select::new()
        .with_prompt("Select a language")
        .items(&language_labels())
        .default(current)
        .interact()?;

    let code = language_at(idx);
    assistant.change_language(code);
    println!(
        "Language set to {}.\n",
        language_name(code).unwrap_or(code)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_actions_in_order() {
        assert_eq!(MenuAction::from_index(0), MenuAction::Voice);
        assert_eq!(MenuAction::from_index(2), MenuAction::ChangeLanguage);
        assert_eq!(MenuAction::from_index(4), MenuAction::Exit);
    }

    #[test]
    fn test_out_of_range_choice_exits() {
        assert_eq!(MenuAction::from_index(42), MenuAction::Exit);
    }

    #[test]
    fn test_labels_are_distinct() {
        let mut labels = MenuAction::ALL.map(MenuAction::label).to_vec();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), MenuAction::ALL.len());
    }
}
