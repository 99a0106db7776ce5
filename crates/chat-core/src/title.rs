//! Session title derivation from the first user message.

use std::rc::Rc;

use futures::future::{self, Either};

use chat_types::{config::TitleConfig, config::DEFAULT_PLACEHOLDER_TITLE, ChatError, Result};

use crate::ports::{TimerPort, TitleGeneratorPort};

const ELLIPSIS: &str = "...";

pub struct TitleGenerator {
    port: Rc<dyn TitleGeneratorPort>,
    timer: Rc<dyn TimerPort>,
    config: TitleConfig,
}

impl TitleGenerator {
    pub fn new(port: Rc<dyn TitleGeneratorPort>, timer: Rc<dyn TimerPort>, config: TitleConfig) -> Self {
        Self { port, timer, config }
    }

    /// Always yields a title: remote if it answers in time, local otherwise.
    pub async fn generate(&self, first_message: &str) -> String {
        let attempts = self.config.max_attempts.max(1);
        for attempt in 1..=attempts {
            match self.attempt(first_message).await {
                Ok(raw) => match clean_title(&raw) {
                    Some(title) => return title,
                    None => log::debug!("Remote title was blank (attempt {}/{})", attempt, attempts),
                },
                Err(ChatError::Timeout(ms)) => {
                    log::warn!("Title generation timed out after {}ms, using local title", ms);
                    break;
                }
                Err(e) => {
                    log::warn!("Title generation attempt {}/{} failed: {}", attempt, attempts, e)
                }
            }
        }
        fallback_title(first_message, self.config.fallback_chars)
    }

    async fn attempt(&self, first_message: &str) -> Result<String> {
        let remote = self.port.generate_title(first_message);
        let timeout = self.timer.sleep(self.config.timeout_ms);
        match future::select(remote, timeout).await {
            Either::Left((result, _)) => result,
            Either::Right(_) => Err(ChatError::Timeout(self.config.timeout_ms)),
        }
    }
}

/// Deterministic local title: the first `max_chars` characters, ellipsised
/// when truncated.
pub fn fallback_title(message: &str, max_chars: usize) -> String {
    let single_line = message.trim().replace(['\r', '\n'], " ");
    if single_line.is_empty() {
        return DEFAULT_PLACEHOLDER_TITLE.to_string();
    }
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let mut title: String = single_line.chars().take(max_chars).collect();
    title.push_str(ELLIPSIS);
    title
}

fn clean_title(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let title = line.trim_matches(|c| c == '"' || c == '\'').trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}
