use serde::{Deserialize, Serialize};

const CLASSIC_WIRE_COLORS: [&str; 8] = [
    "#1F77B4", "#D62728", "#2CA02C", "#9467BD", "#FF7F0E", "#8C564B", "#E377C2", "#17BECF",
];

const MODERN_WIRE_COLORS: [&str; 8] = [
    "#3E63DD", "#E5484D", "#30A46C", "#8E4EC6", "#F76B15", "#A18072", "#D6409F", "#05A2C2",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub block_fill: String,
    pub block_border: String,
    pub pass_through_fill: String,
    pub label_color: String,
    pub label_background: String,
    pub background: String,
    /// Cycled per network.
    pub wire_colors: Vec<String>,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 12.0,
            block_fill: "#ECECFF".to_string(),
            block_border: "#9370DB".to_string(),
            pass_through_fill: "#FFFFDE".to_string(),
            label_color: "#333333".to_string(),
            label_background: "#E8E8E8".to_string(),
            background: "#FFFFFF".to_string(),
            wire_colors: CLASSIC_WIRE_COLORS.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 11.0,
            block_fill: "#F8FAFF".to_string(),
            block_border: "#C7D2E5".to_string(),
            pass_through_fill: "#F7FAFF".to_string(),
            label_color: "#1C2430".to_string(),
            label_background: "#FFFFFF".to_string(),
            background: "#FFFFFF".to_string(),
            wire_colors: MODERN_WIRE_COLORS.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn wire_color(&self, network: usize) -> &str {
        if self.wire_colors.is_empty() {
            return "#333333";
        }
        &self.wire_colors[network % self.wire_colors.len()]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}
