//! Atlas metadata text.
//!
//! ```text
//! <hash>
//!
//! # Meta
//! name Hero
//! num_sprites 4
//! dims_image 36 36
//! dims_frame 16 16
//! dims_padded 18 18
//! dims_grid 2 2
//! padding 1
//! framerate 30
//! <settings text>
//! # Anims
//! Walk 0 1 2
//! Idle 3
//! ```
//!
//! `padding` and `framerate` lines are only added when the settings text did
//! not set them; the settings text follows verbatim.

use crate::compositor::PlacedFrames;
use crate::layout::AtlasLayout;
use crate::settings::{AtlasSettings, DEFAULT_PADDING};

/// Render the metadata body (everything below the hash line).
pub fn render_metadata(
    name: &str,
    layout: &AtlasLayout,
    settings: &AtlasSettings,
    placed: &PlacedFrames,
) -> String {
    let mut out = String::from("# Meta\n");
    out.push_str(&format!("name {}\n", name));
    out.push_str(&format!("num_sprites {}\n", placed.total_frames()));
    out.push_str(&format!(
        "dims_image {} {}\n",
        layout.image_dims.0, layout.image_dims.1
    ));
    out.push_str(&format!(
        "dims_frame {} {}\n",
        layout.frame_dims.0, layout.frame_dims.1
    ));
    out.push_str(&format!(
        "dims_padded {} {}\n",
        layout.padded_dims.0, layout.padded_dims.1
    ));
    out.push_str(&format!(
        "dims_grid {} {}\n",
        layout.grid.columns, layout.grid.rows
    ));
    if !settings.explicit.padding {
        out.push_str(&format!("padding {}\n", DEFAULT_PADDING));
    }
    if !settings.explicit.frame_rate {
        out.push_str(&format!("framerate {}\n", settings.config.frame_rate));
    }
    out.push_str(&settings.source_text);
    out.push('\n');

    out.push_str("# Anims\n");
    for anim in &placed.animations {
        out.push_str(&anim.name);
        for index in &anim.frames {
            out.push_str(&format!(" {}", index));
        }
        out.push('\n');
    }
    out
}

/// Prefix a metadata body with its hash line.
pub fn with_hash_header(hash: &str, body: &str) -> String {
    format!("{}\n\n{}", hash, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Animation;
    use crate::settings::parse_settings;
    use pretty_assertions::assert_eq;

    fn placed() -> PlacedFrames {
        PlacedFrames {
            animations: vec![
                Animation {
                    name: "Walk".to_string(),
                    frames: vec![0, 1, 2],
                },
                Animation {
                    name: "Idle".to_string(),
                    frames: vec![3],
                },
            ],
        }
    }

    #[test]
    fn test_default_settings_injected() {
        let settings = parse_settings("").unwrap();
        let layout = AtlasLayout::compute(4, (16, 16), &settings.config).unwrap();
        let text = render_metadata("Hero", &layout, &settings, &placed());

        assert_eq!(
            text,
            "# Meta\n\
             name Hero\n\
             num_sprites 4\n\
             dims_image 36 36\n\
             dims_frame 16 16\n\
             dims_padded 18 18\n\
             dims_grid 2 2\n\
             padding 1\n\
             framerate 30\n\
             \n\
             # Anims\n\
             Walk 0 1 2\n\
             Idle 3\n"
        );
    }

    #[test]
    fn test_explicit_settings_not_repeated() {
        let settings = parse_settings("padding 0\nframerate 12\norigin 8 8").unwrap();
        let layout = AtlasLayout::compute(4, (16, 16), &settings.config).unwrap();
        let text = render_metadata("Hero", &layout, &settings, &placed());

        assert_eq!(
            text,
            "# Meta\n\
             name Hero\n\
             num_sprites 4\n\
             dims_image 32 32\n\
             dims_frame 16 16\n\
             dims_padded 16 16\n\
             dims_grid 2 2\n\
             padding 0\n\
             framerate 12\n\
             origin 8 8\n\
             # Anims\n\
             Walk 0 1 2\n\
             Idle 3\n"
        );
    }

    #[test]
    fn test_only_missing_tag_injected() {
        let settings = parse_settings("framerate 24").unwrap();
        let layout = AtlasLayout::compute(1, (8, 8), &settings.config).unwrap();
        let single = PlacedFrames {
            animations: vec![Animation {
                name: "Dot".to_string(),
                frames: vec![0],
            }],
        };
        let text = render_metadata("Fx", &layout, &settings, &single);
        assert!(text.contains("dims_grid 1 1\npadding 1\nframerate 24\n# Anims\n"));
        assert_eq!(text.matches("framerate").count(), 1);
    }

    #[test]
    fn test_empty_animation_line() {
        let settings = parse_settings("").unwrap();
        let layout = AtlasLayout::compute(1, (8, 8), &settings.config).unwrap();
        let placed = PlacedFrames {
            animations: vec![
                Animation::new("Empty"),
                Animation {
                    name: "One".to_string(),
                    frames: vec![0],
                },
            ],
        };
        let text = render_metadata("Fx", &layout, &settings, &placed);
        assert!(text.ends_with("# Anims\nEmpty\nOne 0\n"));
    }

    #[test]
    fn test_hash_header() {
        assert_eq!(with_hash_header("abc", "# Meta\n"), "abc\n\n# Meta\n");
    }
}
