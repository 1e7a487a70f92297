/// Screen-space overlay anchored above a scene node
use nalgebra::{Point3, Vector3};

use crate::config::OverlayConfig;
use crate::projection::{Camera, Viewport};

/// Pixel position of the overlay for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayAnchor {
    pub x: f32,
    pub y: f32,
    /// False when the anchor point is behind the camera or past the far plane
    pub visible: bool,
}

impl OverlayAnchor {
    /// CSS `left` value
    pub fn css_left(&self) -> String {
        format!("{}px", self.x)
    }

    /// CSS `top` value
    pub fn css_top(&self) -> String {
        format!("{}px", self.y)
    }
}

/// Link button that follows a node
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayButton {
    pub label: String,
    pub href: String,
    /// World-space offset from the followed node
    pub offset: Vector3<f32>,
}

impl OverlayButton {
    pub fn from_config(config: &OverlayConfig) -> Self {
        Self {
            label: config.label.clone(),
            href: config.href.clone(),
            offset: Vector3::new(0.0, config.offset_y, 0.0),
        }
    }

    /// Anchor for a node at `node_position`, recomputed every frame.
    pub fn anchor(&self, node_position: &Point3<f32>, camera: &Camera, viewport: &Viewport) -> OverlayAnchor {
        let point = camera.project(&(*node_position + self.offset), viewport);
        OverlayAnchor {
            x: point.x,
            y: point.y,
            visible: point.is_in_front() && point.depth <= 1.0,
        }
    }

    /// Markup for hosts that render HTML.
    pub fn html(&self) -> String {
        format!(
            "<a href=\"{}\" class=\"purple-button\">{}</a>",
            escape_html(&self.href),
            escape_html(&self.label)
        )
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button() -> OverlayButton {
        OverlayButton::from_config(&OverlayConfig::default())
    }

    #[test]
    fn anchor_sits_above_node() {
        let viewport = Viewport::new(800, 600);
        let camera = Camera::new(800, 600);
        let anchor = button().anchor(&Point3::origin(), &camera, &viewport);
        assert!(anchor.visible);
        assert!((anchor.x - 400.0).abs() < 1e-3);
        assert!(anchor.y < 300.0);
    }

    #[test]
    fn anchor_behind_camera_is_hidden() {
        let viewport = Viewport::new(800, 600);
        let camera = Camera::new(800, 600);
        let anchor = button().anchor(&Point3::new(0.0, 0.0, 90.0), &camera, &viewport);
        assert!(!anchor.visible);
    }

    #[test]
    fn css_values_have_pixel_units() {
        let anchor = OverlayAnchor {
            x: 12.5,
            y: 40.0,
            visible: true,
        };
        assert_eq!(anchor.css_left(), "12.5px");
        assert_eq!(anchor.css_top(), "40px");
    }

    #[test]
    fn html_is_escaped() {
        let mut b = button();
        b.label = "Comments & <more>".into();
        assert_eq!(
            b.html(),
            "<a href=\"comment.html\" class=\"purple-button\">Comments &amp; &lt;more&gt;</a>"
        );
    }
}
