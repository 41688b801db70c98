//! Embedded fallback prompts
//!
//! These are compiled into the binary and used when template files are not found.

/// Plan decomposition prompt
///
/// Context: `goal` - the user's own words.
pub const PLAN: &str = r#"用户想要做这件事，但正在拖延：{{goal}}。
请作为一个温柔、有同理心的行动教练，把这个任务拆解成非常微小、容易执行的步骤（微习惯）。
第一步必须非常简单（例如“放下手机”或“深呼吸”）。

请返回JSON格式。
Title: 给这个行动起一个简约清新的名字。
Steps: 步骤列表。每个步骤包含 text (动作描述) 和 encouragement (对这个具体小步骤的鼓励，说明为什么它很简单)。
OverallEncouragement: 一句温暖的总鼓励。
语言必须是中文，风格治愈、清新、无压力。
"#;

/// Illustration prompt
///
/// Context: `context` - task title and original input.
pub const ILLUSTRATION: &str = r#"Create a minimalist, zen-style, vector-like illustration for a task titled: "{{context}}".
Style: Soft pastel colors (sage green, beige, soft blue), clean lines, flat design, plenty of whitespace.
Mood: Calming, encouraging, fresh. No text in the image.
"#;

/// Look up an embedded template by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    match name {
        "plan" => Some(PLAN),
        "illustration" => Some(ILLUSTRATION),
        _ => None,
    }
}
