//! Default LLM prompts for domain classification.

/// System instruction. Keeps reasoning models from emitting `<think>` blocks,
/// which both slows them down and gets the answer truncated by `max_tokens`.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"你是文献领域分类器。本任务只需根据给定内容判断文献所属的最小学科领域，无需推理过程。
禁止使用 <think> 或任何思考标签，不要输出解释，直接只输出一行 JSON：{"domain_cn": "中文学科名称", "domain_en": "English domain name"}。"#;

/// User instruction. `{domains}` and `{file_name}` are substituted first, then
/// the excerpt is placed at `{content}`.
pub const DEFAULT_USER_PROMPT: &str = r#"判断下面文献最接近的最小领域（学科）。
请优先从以下领域中选择最贴近的一项：{domains}
若以上均不贴近，再自行给出一个最具体的学科名称，同时给出中文名与英文名。
直接输出一行 JSON，不要 <think>、不要解释：
{"domain_cn": "中文学科名称", "domain_en": "English domain name"}

【文件名】{file_name}

【标题、作者、机构、摘要】
{content}"#;

/// Placeholder rendered in place of an empty excerpt.
pub const NO_CONTENT_MARKER: &str = "No Content Detected";

/// Preferred vocabulary offered to the model before it invents its own label.
pub const DEFAULT_PREFERRED_DOMAINS: &[&str] = &[
    "细胞生物学",
    "分子生物学",
    "免疫学",
    "肿瘤学",
    "癌症生物学",
    "干细胞生物学",
    "发育生物学",
    "药理学",
    "毒理学",
    "再生医学",
    "组织工程",
    "疫苗学",
    "病毒学",
    "生物制药",
    "生物技术",
    "体外受精",
    "生殖生物学",
    "培养肉",
    "合成生物学",
    "微生物学",
    "植物生物学",
    "神经科学",
    "内分泌学",
    "代谢研究",
    "流行病学",
    "公共卫生",
];
