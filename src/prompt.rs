//! Interactive questions
//!
//! [`Prompter`] is the raw terminal backend. [`Interaction`] wraps it with
//! the per-invocation non-interactive policy: when the run is not
//! interactive, questions take their default, confirmations are accepted,
//! and menus fail with a usage error naming the flag to pass instead.

use console::style;
use dialoguer::{Confirm, Input, Select};

use crate::context::InvocationContext;
use crate::error::{Result, ShipError};

/// Terminal backend for questions.
pub trait Prompter {
    /// Pick one of `items`, returning its index.
    fn select(&self, prompt: &str, items: &[String]) -> Result<usize>;

    /// Free-text answer; an empty answer yields `default` if one is given.
    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String>;

    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// [`Prompter`] on top of dialoguer.
#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn select(&self, prompt: &str, items: &[String]) -> Result<usize> {
        Ok(Select::new()
            .with_prompt(format!("  {} {}", style("?").cyan().bold(), prompt))
            .items(items)
            .default(0)
            .interact()?)
    }

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::new()
            .with_prompt(format!("  {} {}", style("?").cyan().bold(), prompt))
            .allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text()?)
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        Ok(Confirm::new()
            .with_prompt(format!("  {} {}", style("?").cyan().bold(), prompt))
            .default(true)
            .interact()?)
    }
}

/// Outcome of a "one of N, or all of them" menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuChoice {
    One(usize),
    All,
}

/// Questions bound to one invocation.
pub struct Interaction<'a> {
    ctx: &'a InvocationContext,
    prompter: &'a dyn Prompter,
}

impl<'a> Interaction<'a> {
    pub fn new(ctx: &'a InvocationContext, prompter: &'a dyn Prompter) -> Self {
        Self { ctx, prompter }
    }

    /// Pick one item. `flag_hint` names the option that replaces the menu
    /// in non-interactive mode.
    pub fn choose(&self, prompt: &str, items: &[String], flag_hint: &str) -> Result<usize> {
        if !self.ctx.interactive {
            return Err(ShipError::Usage(format!(
                "The {} option must be specified (in non-interactive mode).",
                flag_hint
            )));
        }
        if items.is_empty() {
            return Err(ShipError::NotFound("Nothing to choose from".to_string()));
        }
        self.prompter.select(prompt, items)
    }

    /// Pick one item, or the extra `all_label` entry appended to the menu.
    pub fn choose_one_or_all(
        &self,
        prompt: &str,
        items: &[String],
        all_label: &str,
        flag_hint: &str,
    ) -> Result<MenuChoice> {
        let mut menu = items.to_vec();
        menu.push(all_label.to_string());

        let index = self.choose(prompt, &menu, flag_hint)?;
        if index == items.len() {
            Ok(MenuChoice::All)
        } else {
            Ok(MenuChoice::One(index))
        }
    }

    /// Ask for a value. Non-interactive runs get `default`.
    pub fn ask(&self, prompt: &str, default: Option<&str>) -> Result<Option<String>> {
        let answer = if self.ctx.interactive {
            self.prompter.input(prompt, default)?
        } else {
            default.unwrap_or_default().to_string()
        };

        let answer = answer.trim();
        Ok((!answer.is_empty()).then(|| answer.to_string()))
    }

    /// Ask for confirmation. Non-interactive runs are auto-accepted.
    pub fn confirm(&self, prompt: &str) -> Result<bool> {
        if !self.ctx.interactive {
            tracing::debug!("Auto-confirmed (non-interactive): {}", prompt);
            return Ok(true);
        }
        self.prompter.confirm(prompt)
    }
}


#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::testing::ScriptedPrompter;
    use super::*;
    use crate::config::AppConfig;
    use crate::context::Verbosity;

    fn ctx(interactive: bool) -> InvocationContext {
        InvocationContext {
            interactive,
            verbosity: Verbosity::Normal,
            config: AppConfig::default(),
            cwd: PathBuf::from("/tmp"),
            project_root: None,
        }
    }

    fn items() -> Vec<String> {
        vec!["web/uploads".to_string(), "var/cache".to_string()]
    }

    #[test]
    fn test_non_interactive_choose_is_usage_error() {
        let ctx = ctx(false);
        let prompter = ScriptedPrompter::default();
        let interaction = Interaction::new(&ctx, &prompter);

        let err = interaction.choose("Pick", &items(), "--mount").unwrap_err();
        assert!(matches!(err, ShipError::Usage(_)));
        assert!(err.to_string().contains("--mount"));
        assert!(prompter.asked.borrow().is_empty());
    }

    #[test]
    fn test_choose_one_or_all_maps_extra_entry() {
        let ctx = ctx(true);
        let prompter = ScriptedPrompter::default().select_answers(&[2, 1]);
        let interaction = Interaction::new(&ctx, &prompter);

        let choice = interaction
            .choose_one_or_all("Pick", &items(), "All mounts", "--mount")
            .unwrap();
        assert_eq!(choice, MenuChoice::All);

        let choice = interaction
            .choose_one_or_all("Pick", &items(), "All mounts", "--mount")
            .unwrap();
        assert_eq!(choice, MenuChoice::One(1));

        assert!(prompter.asked.borrow()[0].contains("All mounts"));
    }

    #[test]
    fn test_ask_non_interactive_takes_default() {
        let ctx = ctx(false);
        let prompter = ScriptedPrompter::default();
        let interaction = Interaction::new(&ctx, &prompter);

        assert_eq!(
            interaction.ask("Target", Some("/srv/files")).unwrap(),
            Some("/srv/files".to_string())
        );
        assert_eq!(interaction.ask("Target", None).unwrap(), None);
    }

    #[test]
    fn test_ask_interactive_blank_answer_uses_default() {
        let ctx = ctx(true);
        let prompter = ScriptedPrompter::default().input_answers(&["", "  custom  "]);
        let interaction = Interaction::new(&ctx, &prompter);

        assert_eq!(
            interaction.ask("Target", Some("shared")).unwrap(),
            Some("shared".to_string())
        );
        assert_eq!(
            interaction.ask("Target", Some("shared")).unwrap(),
            Some("custom".to_string())
        );
    }

    #[test]
    fn test_confirm_policy() {
        let ctx_batch = ctx(false);
        let prompter = ScriptedPrompter::default();
        assert!(Interaction::new(&ctx_batch, &prompter).confirm("Go?").unwrap());

        let ctx_tty = ctx(true);
        let prompter = ScriptedPrompter::default().confirm_answers(&[false]);
        assert!(!Interaction::new(&ctx_tty, &prompter).confirm("Go?").unwrap());
    }
}
