use crate::config::RenderConfig;
use crate::ir::{Diagram, LabelOrientation};
use crate::layout::{GridRect, Layout};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

/// Half-width of the margin drawn around a block's grid rectangle, in grid units.
const BLOCK_MARGIN: f32 = 0.6;
const LABEL_PAD: f32 = 2.0;
/// Rough glyph advance relative to the font size, for label backgrounds only.
const GLYPH_WIDTH: f32 = 0.6;

/// Wireframe preview of a layout: blocks, drawn wires and label spans.
pub fn render_svg(
    layout: &Layout,
    diagram: &Diagram,
    theme: &Theme,
    config: &RenderConfig,
) -> String {
    let scale = config.scale.max(1.0);
    let pad = config.padding.max(0.0);
    let to_px = |v: f32| pad + v * scale;

    let width = 2.0 * pad + (layout.grid().cols() - 1).max(0) as f32 * scale;
    let height = 2.0 * pad + (layout.grid().rows() - 1).max(0) as f32 * scale;

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        config.background
    ));

    // containers first so nested blocks draw on top
    let mut blocks: Vec<_> = diagram.blocks.iter().collect();
    blocks.sort_by_key(|b| std::cmp::Reverse(b.cells().area()));
    for block in blocks {
        let rect = GridRect::from_cells(&block.cells());
        let x = to_px(rect.left as f32 - BLOCK_MARGIN);
        let y = to_px(rect.top as f32 - BLOCK_MARGIN);
        let w = (rect.right - rect.left) as f32 * scale + 2.0 * BLOCK_MARGIN * scale;
        let h = (rect.bottom - rect.top) as f32 * scale + 2.0 * BLOCK_MARGIN * scale;
        let (fill, dash) = if block.pass_through {
            (&theme.pass_through_fill, " stroke-dasharray=\"6 4\"")
        } else {
            (&theme.block_fill, "")
        };
        svg.push_str(&format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" rx=\"4\" ry=\"4\" fill=\"{fill}\" stroke=\"{}\" stroke-width=\"1\"{dash}/>",
            theme.block_border
        ));
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            x + 3.0,
            y + theme.font_size,
            escape_xml(&theme.font_family),
            theme.font_size,
            theme.label_color,
            escape_xml(&block.id)
        ));
    }

    for network in layout.networks() {
        let color = theme.wire_color(network.id.0);
        for wire in &network.wires {
            let points = layout
                .polyline(wire)
                .iter()
                .map(|(x, y)| format!("{:.2},{:.2}", to_px(*x), to_px(*y)))
                .collect::<Vec<_>>()
                .join(" ");
            svg.push_str(&format!(
                "<polyline points=\"{points}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"{}\" stroke-linejoin=\"round\"/>",
                config.stroke_width
            ));
        }
    }

    for label in layout.wire_labels() {
        let (ax, ay) = label.anchor();
        let (x, y) = (to_px(ax), to_px(ay));
        let text_w = label.text.chars().count() as f32 * theme.font_size * GLYPH_WIDTH;
        let text_h = theme.font_size;
        let rotate = match label.orientation {
            LabelOrientation::Horizontal => String::new(),
            LabelOrientation::Vertical => format!(" transform=\"rotate(-90 {x:.2} {y:.2})\""),
        };
        svg.push_str(&format!("<g{rotate}>"));
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" opacity=\"0.85\"/>",
            x - text_w / 2.0 - LABEL_PAD,
            y - text_h / 2.0 - LABEL_PAD,
            text_w + 2.0 * LABEL_PAD,
            text_h + 2.0 * LABEL_PAD,
            theme.label_background
        ));
        svg.push_str(&format!(
            "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"middle\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            escape_xml(&theme.font_family),
            theme.font_size,
            theme.label_color,
            escape_xml(&label.text)
        ));
        svg.push_str("</g>");
    }

    svg.push_str("</svg>");
    svg
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme
        .font_family
        .split(',')
        .next()
        .map(|f| f.trim().trim_matches('"').to_string())
        .unwrap_or_else(|| "sans-serif".to_string());
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
