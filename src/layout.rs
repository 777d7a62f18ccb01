/*
 *  layout.rs
 *
 *  SMeterS - every dB counts
 *	(c) 2024-26 SMeterS contributors
 *
 *	Responsive canvas styling: a pure function of window geometry and
 *	placement state. The host applies the result as inline styles; no
 *	widget numeric state is involved.
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use crate::constants::{
    CANVAS_WIDTH, FULL_HEIGHT_LEGACY_PX, FULL_HEIGHT_PX, OUTSIDE_MARGIN_PX,
    PEAKMETER_NARROW_TOP_PX, PEAKMETER_TOP_PX, RESPONSIVE_MARGIN_PCT, RESPONSIVE_WIDTH_PCT,
    WIDE_HOST_WIDTH_PX,
};
use crate::placement::ResolvedPlacement;

/// A CSS length as the host applies it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CssLength {
    Px(i32),
    Percent(f32),
}

/// Canvas positioning scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionMode {
    Relative,
    Absolute,
}

/// Inline style set for the canvas pair. The marker canvas takes the same
/// style with the host-side overlap margin on top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasStyle {
    pub width: CssLength,
    pub max_width_px: u32,
    pub margin_top_px: i32,
    pub margin_left: CssLength,
    pub position: PositionMode,
    pub top_px: Option<i32>,
}

/// Compute the canvas style for the current window. `overlay_covered`
/// reports whether the graph panel currently shows (the percent-width
/// layout only applies while it does not).
pub fn compute_style(
    window: (u32, u32),
    overlay_covered: bool,
    placement: &ResolvedPlacement,
    legacy_host: bool,
) -> CanvasStyle {
    let (width, height) = window;
    let narrow = width <= WIDE_HOST_WIDTH_PX;

    // Peak-meter mounts flip between inline and outside at the narrow
    // threshold, dragging their top offset along.
    if placement.use_peakmeter {
        if narrow {
            return CanvasStyle {
                width: CssLength::Px(CANVAS_WIDTH as i32),
                max_width_px: CANVAS_WIDTH,
                margin_top_px: 4,
                margin_left: CssLength::Px(OUTSIDE_MARGIN_PX),
                position: PositionMode::Absolute,
                top_px: Some(PEAKMETER_NARROW_TOP_PX),
            };
        }
        return CanvasStyle {
            width: CssLength::Px(CANVAS_WIDTH as i32),
            max_width_px: CANVAS_WIDTH,
            margin_top_px: 4,
            margin_left: CssLength::Px(0),
            position: PositionMode::Relative,
            top_px: Some(PEAKMETER_TOP_PX),
        };
    }

    let position = if placement.outside_field {
        PositionMode::Absolute
    } else {
        PositionMode::Relative
    };

    if !narrow && !overlay_covered {
        let margin_left = if placement.outside_field {
            CssLength::Percent(RESPONSIVE_MARGIN_PCT)
        } else {
            CssLength::Px(0)
        };
        let full_height = if legacy_host { FULL_HEIGHT_LEGACY_PX } else { FULL_HEIGHT_PX };
        // Tall desktop hosts get the roomier top margin; legacy layouts
        // need a bigger correction to clear their header.
        let margin_top_px = if height > full_height {
            if legacy_host { 9 } else { 4 }
        } else {
            4
        };
        return CanvasStyle {
            width: CssLength::Percent(RESPONSIVE_WIDTH_PCT),
            max_width_px: CANVAS_WIDTH,
            margin_top_px,
            margin_left,
            position,
            top_px: None,
        };
    }

    CanvasStyle {
        width: CssLength::Px(CANVAS_WIDTH as i32),
        max_width_px: CANVAS_WIDTH,
        margin_top_px: 2,
        margin_left: if placement.outside_field {
            CssLength::Px(OUTSIDE_MARGIN_PX)
        } else {
            CssLength::Px(0)
        },
        position,
        top_px: None,
    }
}

impl CanvasStyle {
    /// The CSS pixel width the canvas renders at under this style, used
    /// for the pointer backing-store translation. Percent widths resolve
    /// against the max width cap.
    pub fn css_width_px(&self, container_width: f32) -> f32 {
        match self.width {
            CssLength::Px(px) => px as f32,
            CssLength::Percent(pct) => {
                (container_width * pct / 100.0).min(self.max_width_px as f32)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outside() -> ResolvedPlacement {
        ResolvedPlacement {
            use_peakmeter: false,
            outside_field: true,
            relocation: true,
            rotator_offset_px: 0,
            hide_until_overlay: false,
            top_offset_px: 0,
        }
    }

    #[test]
    fn test_wide_host_uses_percent_width() {
        let style = compute_style((1280, 800), false, &outside(), false);
        assert_eq!(style.width, CssLength::Percent(RESPONSIVE_WIDTH_PCT));
        assert_eq!(style.margin_left, CssLength::Percent(RESPONSIVE_MARGIN_PCT));
        assert_eq!(style.margin_top_px, 4);
        assert_eq!(style.position, PositionMode::Absolute);
    }

    #[test]
    fn test_overlay_covering_forces_fixed_width() {
        let style = compute_style((1280, 800), true, &outside(), false);
        assert_eq!(style.width, CssLength::Px(256));
        assert_eq!(style.margin_left, CssLength::Px(OUTSIDE_MARGIN_PX));
        assert_eq!(style.margin_top_px, 2);
    }

    #[test]
    fn test_narrow_host_fixed_width() {
        let style = compute_style((600, 900), false, &outside(), false);
        assert_eq!(style.width, CssLength::Px(256));
        assert_eq!(style.css_width_px(600.0), 256.0);
    }

    #[test]
    fn test_legacy_tall_host_margin() {
        // Legacy hosts only grow the margin past their own taller cutoff
        let style = compute_style((1280, 800), false, &outside(), true);
        assert_eq!(style.margin_top_px, 4);
        let tall = compute_style((1280, 900), false, &outside(), true);
        assert_eq!(tall.margin_top_px, 9);
    }

    #[test]
    fn test_peakmeter_mount_flips_at_threshold() {
        let placement = ResolvedPlacement { use_peakmeter: true, ..outside() };
        let wide = compute_style((1280, 800), false, &placement, false);
        assert_eq!(wide.top_px, Some(PEAKMETER_TOP_PX));
        assert_eq!(wide.position, PositionMode::Relative);

        let narrow = compute_style((600, 900), false, &placement, false);
        assert_eq!(narrow.top_px, Some(PEAKMETER_NARROW_TOP_PX));
        assert_eq!(narrow.position, PositionMode::Absolute);
        assert_eq!(narrow.margin_left, CssLength::Px(OUTSIDE_MARGIN_PX));
    }

    #[test]
    fn test_percent_width_resolves_against_cap() {
        let style = compute_style((1280, 800), false, &outside(), false);
        // A small container scales down; a huge one caps at the canvas max
        assert!((style.css_width_px(300.0) - 229.965).abs() < 0.01);
        assert_eq!(style.css_width_px(2000.0), 256.0);
    }
}
