//! Operator prompts
//!
//! Prompts are awaited inline by the orchestrator. The dialoguer backed
//! implementation blocks, so each prompt runs on the blocking pool.

use async_trait::async_trait;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect, Password, Select};
use secrecy::SecretString;
use tracing::debug;

use crate::errors::BeamError;

/// Interactive questions asked during a run
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Yes/no question
    async fn confirm(&self, message: &str, default: bool) -> Result<bool, BeamError>;

    /// Free text, returning `default` on empty input when given
    async fn input(&self, message: &str, default: Option<&str>) -> Result<String, BeamError>;

    /// Hidden input
    async fn password(&self, message: &str) -> Result<SecretString, BeamError>;

    /// Pick one item, returning its index
    async fn select(
        &self,
        message: &str,
        items: &[String],
        default: Option<usize>,
    ) -> Result<usize, BeamError>;

    /// Pick any number of items, returning their indices
    async fn multi_select(&self, message: &str, items: &[String]) -> Result<Vec<usize>, BeamError>;
}

/// Terminal prompts using dialoguer
#[derive(Debug, Default, Clone, Copy)]
pub struct DialoguerPrompter;

async fn blocking<T, F>(f: F) -> Result<T, BeamError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, dialoguer::Error> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BeamError::PromptError(e.to_string()))?
        .map_err(|e| BeamError::PromptError(e.to_string()))
}

#[async_trait]
impl Prompter for DialoguerPrompter {
    async fn confirm(&self, message: &str, default: bool) -> Result<bool, BeamError> {
        let message = message.to_string();
        blocking(move || {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(message)
                .default(default)
                .interact()
        })
        .await
    }

    async fn input(&self, message: &str, default: Option<&str>) -> Result<String, BeamError> {
        let message = message.to_string();
        let default = default.map(str::to_string);
        blocking(move || {
            let theme = ColorfulTheme::default();
            let mut input = Input::<String>::with_theme(&theme).with_prompt(message);
            if let Some(default) = default {
                input = input.default(default);
            }
            input.interact_text()
        })
        .await
    }

    async fn password(&self, message: &str) -> Result<SecretString, BeamError> {
        let message = message.to_string();
        let password = blocking(move || {
            Password::with_theme(&ColorfulTheme::default())
                .with_prompt(message)
                .allow_empty_password(true)
                .interact()
        })
        .await?;
        Ok(SecretString::from(password))
    }

    async fn select(
        &self,
        message: &str,
        items: &[String],
        default: Option<usize>,
    ) -> Result<usize, BeamError> {
        let message = message.to_string();
        let items = items.to_vec();
        blocking(move || {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt(message)
                .items(&items)
                .default(default.unwrap_or(0))
                .interact()
        })
        .await
    }

    async fn multi_select(&self, message: &str, items: &[String]) -> Result<Vec<usize>, BeamError> {
        let message = message.to_string();
        let items = items.to_vec();
        blocking(move || {
            MultiSelect::with_theme(&ColorfulTheme::default())
                .with_prompt(message)
                .items(&items)
                .interact()
        })
        .await
    }
}

/// Answers every yes/no question with yes; other prompts go to `inner`
pub struct AssumeYes<P> {
    inner: P,
}

impl<P: Prompter> AssumeYes<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<P: Prompter> Prompter for AssumeYes<P> {
    async fn confirm(&self, message: &str, _default: bool) -> Result<bool, BeamError> {
        debug!("Assuming yes: {}", message);
        Ok(true)
    }

    async fn input(&self, message: &str, default: Option<&str>) -> Result<String, BeamError> {
        self.inner.input(message, default).await
    }

    async fn password(&self, message: &str) -> Result<SecretString, BeamError> {
        self.inner.password(message).await
    }

    async fn select(
        &self,
        message: &str,
        items: &[String],
        default: Option<usize>,
    ) -> Result<usize, BeamError> {
        self.inner.select(message, items, default).await
    }

    async fn multi_select(&self, message: &str, items: &[String]) -> Result<Vec<usize>, BeamError> {
        self.inner.multi_select(message, items).await
    }
}
