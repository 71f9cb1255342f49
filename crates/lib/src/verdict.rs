//! Interpret a raw model verdict and render the user-facing reply.

use crate::llm::UNRECOGNIZED_SENTINEL;

pub const GUIDANCE_MESSAGE: &str = "❓ 無法辨識圖片中的物品

建議：
• 拍攝更清晰、光線充足的照片
• 確保物品在畫面中央
• 或直接用文字描述物品";

pub const MALFORMED_MESSAGE: &str = "🤖 分析結果格式異常，請重新嘗試。";

pub const DISCLAIMER: &str = "💡 小提醒：各地區回收規定可能略有不同，請以當地清潔隊為準";

/// Structured reading of a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The model could not identify the item.
    Unrecognized,
    Classified { item: String, category: String },
    /// Neither shape matched.
    Malformed,
}

impl Verdict {
    /// Sentinel anywhere wins; otherwise split on the first comma only.
    pub fn parse(raw: &str) -> Self {
        if raw.contains(UNRECOGNIZED_SENTINEL) {
            return Verdict::Unrecognized;
        }
        match raw.split_once(',') {
            Some((item, category)) => Verdict::Classified {
                item: item.trim().to_string(),
                category: category.trim().to_string(),
            },
            None => Verdict::Malformed,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Verdict::Unrecognized => GUIDANCE_MESSAGE.to_string(),
            Verdict::Classified { item, category } => format!(
                "✅ 分析完成！\n\n物品：{}\n分類：{}\n\n{}",
                item, category, DISCLAIMER
            ),
            Verdict::Malformed => MALFORMED_MESSAGE.to_string(),
        }
    }
}

/// Render the reply for a raw verdict.
pub fn format(raw: &str) -> String {
    log::info!("formatting verdict: {}", raw);
    let verdict = Verdict::parse(raw);
    if verdict == Verdict::Malformed {
        log::warn!("verdict has unexpected format: {}", raw);
    }
    verdict.render()
}
