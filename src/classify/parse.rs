//! Parsing of model replies into bilingual domain labels.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::models::{DomainPair, UNCATEGORIZED_CN, UNCATEGORIZED_EN};

/// Labels longer than this are prose, not a domain name.
const MAX_LABEL_CHARS: usize = 50;

static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^{}]*\}").expect("valid regex"));

static LABEL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(领域|学科|类别)\s*[：:]?\s*").expect("valid regex"));

/// Result of reading one reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(DomainPair),
    Unparsed,
}

/// Any of the reply shapes models produce.
#[derive(Debug, Deserialize)]
struct DomainReply {
    domain_cn: Option<String>,
    domain_en: Option<String>,
    field: Option<String>,
}

/// Parse a raw reply.
///
/// Accepts `{"domain_cn": .., "domain_en": ..}`, the single-label
/// `{"field": ..}` and `cn | en`. Reasoning blocks are skipped; a reply that
/// is only reasoning is unparsed.
pub fn parse_reply(raw: &str) -> ParseOutcome {
    let Some(work) = strip_think(raw) else {
        return ParseOutcome::Unparsed;
    };

    for m in JSON_OBJECT.find_iter(work) {
        let Ok(reply) = serde_json::from_str::<DomainReply>(m.as_str()) else {
            continue;
        };
        let pair = match (reply.domain_cn, reply.field) {
            (Some(cn), _) => normalize(&cn, reply.domain_en.as_deref().unwrap_or("")),
            (None, Some(field)) => normalize(&field, ""),
            (None, None) => None,
        };
        if let Some(pair) = pair {
            return ParseOutcome::Parsed(pair);
        }
    }

    if let Some((cn, en)) = work.split_once('|') {
        let en = en.split('|').next().unwrap_or("");
        if let Some(pair) = normalize(cn, en) {
            return ParseOutcome::Parsed(pair);
        }
    }

    ParseOutcome::Unparsed
}

/// Text after the last `</think>`, or None for an empty or reasoning-only reply.
fn strip_think(raw: &str) -> Option<&str> {
    let s = raw.trim();
    let work = match s.rfind("</think>") {
        Some(i) => s[i + "</think>".len()..].trim(),
        None if s.to_lowercase().starts_with("<think>") => return None,
        None => s,
    };
    (!work.is_empty()).then_some(work)
}

/// Clean both labels; None when the Chinese label is unusable.
fn normalize(cn: &str, en: &str) -> Option<DomainPair> {
    let cn = clean_label(cn);
    if !is_valid_label(&cn) || cn == UNCATEGORIZED_CN {
        return None;
    }

    let en = clean_label(en);
    let en = if is_valid_label(&en) && en != UNCATEGORIZED_EN {
        en
    } else {
        cn.clone()
    };
    Some(DomainPair::new(cn, en))
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && !label.contains("<think>")
        && !label.contains("</think>")
        && label.chars().count() <= MAX_LABEL_CHARS
}

/// First line/clause of a label without `领域：`-style prefixes or quotes.
fn clean_label(raw: &str) -> String {
    let mut s = raw.trim();
    for sep in ['\n', '，', '。', ','] {
        if let Some((first, _)) = s.split_once(sep) {
            s = first.trim();
        }
    }
    let s = s.trim_end_matches('.');
    let s = LABEL_PREFIX.replace(s, "");
    s.trim_matches(|c: char| c == '"' || c == '\'' || c == '“' || c == '”' || c.is_whitespace())
        .to_string()
}
