//! Prompt assembly under the excerpt and total-prompt character budgets.

use crate::config::Config;
use crate::llm::{LlmConfig, NO_CONTENT_MARKER};

const CONTENT_PLACEHOLDER: &str = "{content}";

/// System and user text ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltPrompt {
    pub system: String,
    pub user: String,
    /// Excerpt characters that made it into `user`.
    pub excerpt_chars: usize,
}

impl BuiltPrompt {
    /// Combined length of system and user text in characters.
    pub fn total_chars(&self) -> usize {
        self.system.chars().count() + self.user.chars().count()
    }
}

/// Builds classification prompts from excerpts.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system: String,
    /// User template text before `{content}`, with `{domains}` filled in.
    head: String,
    /// User template text after `{content}`.
    tail: String,
    max_chars_for_llm: usize,
    max_prompt_chars: usize,
}

impl PromptBuilder {
    pub fn new(config: &Config) -> Self {
        Self::with_budgets(&config.llm, config.max_chars_for_llm, config.max_prompt_chars)
    }

    pub fn with_budgets(llm: &LlmConfig, max_chars_for_llm: usize, max_prompt_chars: usize) -> Self {
        let domains = llm.preferred_domains.join("、");
        let template = llm.get_user_prompt();
        let (head, tail) = match template.split_once(CONTENT_PLACEHOLDER) {
            Some((head, tail)) => (head.to_string(), tail.to_string()),
            None => (format!("{}\n\n", template), String::new()),
        };

        Self {
            system: llm.get_system_prompt().to_string(),
            head: head.replace("{domains}", &domains),
            tail: tail.replace("{domains}", &domains),
            max_chars_for_llm,
            max_prompt_chars,
        }
    }

    /// Build the prompt for one document.
    ///
    /// The excerpt is cut from its tail until it fits `max_chars_for_llm` and
    /// the whole prompt fits `max_prompt_chars`. If the template alone is over
    /// the bound, user and then system text are cut as well.
    pub fn build(&self, file_name: &str, excerpt: &str) -> BuiltPrompt {
        let head = self.head.replace("{file_name}", file_name);
        let tail = self.tail.replace("{file_name}", file_name);

        let excerpt = excerpt.trim();
        let content = if excerpt.is_empty() {
            NO_CONTENT_MARKER
        } else {
            excerpt
        };

        let system_chars = self.system.chars().count();
        let overhead = system_chars + head.chars().count() + tail.chars().count();
        let allowance = self
            .max_chars_for_llm
            .min(self.max_prompt_chars.saturating_sub(overhead));
        let content = take_chars(content, allowance);
        let excerpt_chars = if excerpt.is_empty() {
            0
        } else {
            content.chars().count()
        };

        let user = format!("{}{}{}", head, content, tail);
        if overhead <= self.max_prompt_chars {
            return BuiltPrompt {
                system: self.system.clone(),
                user,
                excerpt_chars,
            };
        }

        // Template alone is over budget: keep as much system text as fits,
        // then fill the remainder with the head of the user text.
        let system = take_chars(&self.system, self.max_prompt_chars).to_string();
        let user_budget = self.max_prompt_chars - system.chars().count();
        BuiltPrompt {
            system,
            user: take_chars(&user, user_budget).to_string(),
            excerpt_chars,
        }
    }
}

/// Leading `n` characters of `s`.
fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(max_chars_for_llm: usize, max_prompt_chars: usize) -> PromptBuilder {
        PromptBuilder::with_budgets(&LlmConfig::default(), max_chars_for_llm, max_prompt_chars)
    }

    #[test]
    fn test_prompt_contains_parts() {
        let prompt = builder(3000, 4000).build("paper.pdf", "【标题】\nImmune checkpoints");
        assert!(prompt.system.contains("domain_cn"));
        assert!(prompt.user.contains("【文件名】paper.pdf"));
        assert!(prompt.user.contains("免疫学、肿瘤学"));
        assert!(prompt.user.ends_with("【标题】\nImmune checkpoints"));
        assert!(!prompt.user.contains("{content}"));
        assert_eq!(prompt.excerpt_chars, "【标题】\nImmune checkpoints".chars().count());
    }

    #[test]
    fn test_empty_excerpt_uses_marker() {
        let prompt = builder(3000, 4000).build("blank.pdf", "   ");
        assert!(prompt.user.ends_with(NO_CONTENT_MARKER));
        assert_eq!(prompt.excerpt_chars, 0);
    }

    #[test]
    fn test_excerpt_cut_to_max_chars_for_llm() {
        let excerpt = "细".repeat(500);
        let prompt = builder(120, 100_000).build("a.pdf", &excerpt);
        assert_eq!(prompt.excerpt_chars, 120);
        assert!(prompt.user.ends_with(&"细".repeat(120)));
    }

    #[test]
    fn test_prompt_never_exceeds_max_prompt_chars() {
        let template = builder(usize::MAX, usize::MAX).build("f.pdf", "");
        let overhead = template.total_chars() - NO_CONTENT_MARKER.chars().count();

        for max_prompt in [1, 50, overhead - 1, overhead, overhead + 1, overhead + 700, 10_000] {
            for excerpt_len in [0, 1, 10, 699, 700, 701, 5_000, 20_000] {
                let excerpt = "词a".repeat(excerpt_len / 2 + 1);
                let excerpt: String = excerpt.chars().take(excerpt_len).collect();
                let prompt = builder(3000, max_prompt).build("f.pdf", &excerpt);
                assert!(
                    prompt.total_chars() <= max_prompt,
                    "{} > {} for excerpt {}",
                    prompt.total_chars(),
                    max_prompt,
                    excerpt_len
                );
                assert!(prompt.excerpt_chars <= excerpt_len.min(3000));
            }
        }
    }

    #[test]
    fn test_excerpt_cut_from_tail_when_prompt_bound_is_tighter() {
        let template = builder(usize::MAX, usize::MAX).build("f.pdf", "");
        let overhead = template.total_chars() - NO_CONTENT_MARKER.chars().count();

        let excerpt = "abcdefghij".repeat(100);
        let prompt = builder(3000, overhead + 25).build("f.pdf", &excerpt);
        assert_eq!(prompt.excerpt_chars, 25);
        assert!(prompt.user.ends_with("abcdefghijabcdefghijabcde"));
        assert_eq!(prompt.total_chars(), overhead + 25);
    }

    #[test]
    fn test_deterministic() {
        let b = builder(300, 900);
        let excerpt = "Deterministic excerpt. ".repeat(100);
        assert_eq!(b.build("x.pdf", &excerpt), b.build("x.pdf", &excerpt));
    }

    #[test]
    fn test_template_without_placeholder_appends_content() {
        let llm = LlmConfig {
            user_prompt: Some("Classify {file_name}.".to_string()),
            ..Default::default()
        };
        let prompt = PromptBuilder::with_budgets(&llm, 100, 10_000).build("x.pdf", "text");
        assert_eq!(prompt.user, "Classify x.pdf.\n\ntext");
    }
}
