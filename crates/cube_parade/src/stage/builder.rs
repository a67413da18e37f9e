//! Segment authoring: height grids to stage rows

use cube_engine::foundation::math::{Color, Vec3i};

use super::cube::{StageCube, StageRow};

/// Light checker tone
pub const LIGHT_TONE: Color = Color::gray(0.8);
/// Dark checker tone
pub const DARK_TONE: Color = Color::gray(0.6);
/// Tint of the start/finish marker line
pub const LINE_TINT: Color = Color::new(1.0, 0.0, 0.0);

/// Turn a height grid into rows starting at grid depth `start_z`
///
/// Negative heights become inactive blocks. Cells alternate between two tones
/// on `(x + z) & 1`. With `marker_line` set, the segment's final row is tinted
/// as a start/finish line.
pub fn build_segment(
    body: &[Vec<i32>],
    start_z: i32,
    cube_size: f32,
    marker_line: bool,
) -> Vec<StageRow> {
    let last_z = start_z + body.len() as i32 - 1;
    body.iter()
        .zip(start_z..)
        .map(|(heights, z)| {
            heights
                .iter()
                .zip(0..)
                .map(|(&y, x)| {
                    let mut color = if (x + z) & 1 == 1 { LIGHT_TONE } else { DARK_TONE };
                    if marker_line && z == last_z {
                        color = color.tint(LINE_TINT);
                    }
                    StageCube::new(Vec3i::new(x, y, z), cube_size, y >= 0, color)
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_follow_grid_depth() {
        let rows = build_segment(&[vec![0, 0], vec![1, -1]], 4, 1.0, false);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1].block(), Vec3i::new(1, 0, 4));
        assert_eq!(rows[1][0].block(), Vec3i::new(0, 1, 5));
        assert!(!rows[1][1].is_active());
    }

    #[test]
    fn test_checkerboard_colors() {
        let rows = build_segment(&[vec![0, 0], vec![0, 0], vec![0, 0]], 0, 1.0, false);
        assert_eq!(rows[0][0].color(), DARK_TONE);
        assert_eq!(rows[0][1].color(), LIGHT_TONE);
        assert_eq!(rows[1][0].color(), LIGHT_TONE);
    }

    #[test]
    fn test_marker_line_tints_last_row_only() {
        let rows = build_segment(&[vec![0], vec![0]], 0, 1.0, true);
        assert_eq!(rows[0][0].color(), DARK_TONE);
        assert_eq!(rows[1][0].color(), LIGHT_TONE.tint(LINE_TINT));
    }

    #[test]
    fn test_world_position_scales_with_size() {
        let rows = build_segment(&[vec![0, 2]], 3, 0.5, false);
        assert_eq!(rows[0][1].pos().y, 1.0);
        assert_eq!(rows[0][1].pos().z, 1.5);
    }
}
