//! Keyword heuristic used by `scan --mock`.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::DomainPair;

/// Ordered keyword table; the first matching row wins. Stems match anywhere
/// in a word ("microbiology", "astrophysics"); `cell` and `gene` only at a word
/// start so "excellent" and "general" stay unmatched.
const KEYWORD_DOMAINS: &[(&[&str], &str, &str)] = &[
    (
        &["comput", "algorithm", "机器学习", "深度学习", "神经网络", "软件", "计算机"],
        "计算机科学",
        "Computer Science",
    ),
    (
        &["bioinformatic", "genom", "生物信息", "基因组", "蛋白组"],
        "生物信息学",
        "Bioinformatics",
    ),
    (
        &["medic", "hospital", "临床", "肿瘤", "癌症", "医学"],
        "医学",
        "Medicine",
    ),
    (
        &["biolog", r"\bcell", r"\bgenes?\b", r"\bgenetic", "生物", "细胞", "基因", "生命科学"],
        "生命科学",
        "Life Science",
    ),
    (&["chemi", "化学", "分子"], "化学", "Chemistry"),
    (&["physic", "物理", "量子"], "物理学", "Physics"),
    (&["material", "材料", "纳米"], "材料科学", "Materials Science"),
    (&["agricultur", "农学", "作物"], "农学", "Agriculture"),
    (&["econom", "经济", "金融"], "经济学", "Economics"),
];

static RULES: LazyLock<Vec<(Regex, DomainPair)>> = LazyLock::new(|| {
    KEYWORD_DOMAINS
        .iter()
        .map(|(keywords, cn, en)| {
            let pattern = format!("(?i){}", keywords.join("|"));
            (
                Regex::new(&pattern).expect("valid keyword regex"),
                DomainPair::new(*cn, *en),
            )
        })
        .collect()
});

/// Offline stand-in for the model: maps keywords in the title and excerpt to
/// a fixed domain pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// First matching domain, or the sentinel pair.
    pub fn classify(&self, title: &str, content: &str) -> DomainPair {
        // File names often use underscores as word separators.
        let text = format!("{} {}", title, content).replace('_', " ");
        RULES
            .iter()
            .find(|(re, _)| re.is_match(&text))
            .map(|(_, domain)| domain.clone())
            .unwrap_or_else(DomainPair::uncategorized)
    }
}
