use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    /// How far a bundle end sitting on a block node is pulled in before overlap tests.
    pub overlap_epsilon: f32,
    /// Distance between adjacent lanes, in grid units.
    pub lane_spacing: f32,
    /// Shortest uncrossed span that can carry a label, in grid units.
    pub min_label_span: f32,
    pub max_grid_points: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            overlap_epsilon: 0.01,
            lane_spacing: 0.2,
            min_label_span: 1.0,
            max_grid_points: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    /// Pixels per grid unit.
    pub scale: f32,
    pub padding: f32,
    pub stroke_width: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: 24.0,
            padding: 16.0,
            stroke_width: 1.5,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::classic();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    block_fill: Option<String>,
    block_border: Option<String>,
    label_color: Option<String>,
    background: Option<String>,
    wire_colors: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfig>,
    render: Option<RenderConfig>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "modern" => config.theme = Theme::modern(),
            "classic" | "default" => config.theme = Theme::classic(),
            other => tracing::warn!(theme = other, "unknown theme; keeping the default"),
        }
        config.render.background = config.theme.background.clone();
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.block_fill {
            config.theme.block_fill = v;
        }
        if let Some(v) = vars.block_border {
            config.theme.block_border = v;
        }
        if let Some(v) = vars.label_color {
            config.theme.label_color = v;
        }
        if let Some(v) = vars.background {
            config.render.background = v.clone();
            config.theme.background = v;
        }
        if let Some(v) = vars.wire_colors {
            config.theme.wire_colors = v;
        }
    }

    if let Some(layout) = parsed.layout {
        config.layout = layout;
    }
    if let Some(render) = parsed.render {
        config.render = render;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_defaults() {
        let config = LayoutConfig::default();
        assert_eq!(config.overlap_epsilon, 0.01);
        assert_eq!(config.lane_spacing, 0.2);
        assert_eq!(config.min_label_span, 1.0);
    }

    #[test]
    fn partial_layout_section_keeps_defaults() {
        let parsed: ConfigFile =
            serde_json::from_str(r#"{"layout": {"laneSpacing": 0.35}, "theme": "modern"}"#)
                .unwrap();
        let layout = parsed.layout.unwrap();
        assert_eq!(layout.lane_spacing, 0.35);
        assert_eq!(layout.min_label_span, 1.0);
        assert_eq!(layout.max_grid_points, 1_000_000);
    }

    #[test]
    fn load_config_reads_file() {
        let path = std::env::temp_dir().join(format!("wirelay-config-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r##"{"theme": "modern", "themeVariables": {"wireColors": ["#000000"]},
                "layout": {"minLabelSpan": 3}}"##,
        )
        .unwrap();
        let config = load_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.layout.min_label_span, 3.0);
        assert_eq!(config.theme.wire_colors, vec!["#000000".to_string()]);
        assert_eq!(config.theme.font_size, Theme::modern().font_size);
        assert!(load_config(None).is_ok());
    }
}
