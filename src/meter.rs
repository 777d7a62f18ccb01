/*
 *  meter.rs
 *
 *  SMeterS - every dB counts
 *	(c) 2024-26 SMeterS contributors
 *
 *	dB-to-pixel mapping with noise-floor interpolation, plus the bitmap
 *	painting of the scale, ticks, labels, peak line, and needle.
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

use embedded_graphics::mono_font::ascii::{FONT_4X6, FONT_5X8};
use embedded_graphics::pixelcolor::Rgb888;
use log::debug;

use crate::canvas::WidgetCanvas;
use crate::constants::{
    AM_CUTOFF_MHZ, CANVAS_HEIGHT, CANVAS_WIDTH, COLOR_LABEL, COLOR_NEEDLE_NORMAL,
    COLOR_NEEDLE_OVERLOAD, COLOR_TICK_GREEN, COLOR_TICK_RED, FLOOR_ANCHOR_PX,
    FLOOR_BREAKPOINT_PX, LABEL_POSITIONS, METER_BAR_HEIGHT, METER_LEFT_INSET, METER_MIDPOINT_PX,
    METER_RIGHT_INSET, METER_START_PX, NOISE_FLOOR_VALID_DBM, NORM_OFFSET_DB, NORM_RANGE_DB,
    POSITION_MARGIN_PX, SCALE_LABELS, S_REP_FALLBACK_PX, TICK_GREEN_COUNT, TICK_POSITIONS,
};
use crate::draw::{draw_label_centered, draw_tick, draw_text, fill_hbar};
use crate::sampler::SignalSample;
use crate::theme::MeterPalette;

/// Static pixel layout of the meter. Immutable for the widget's lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterGeometry {
    pub width: u32,
    pub height: u32,
    /// Inactive pixels at the right edge of the canvas.
    pub right_inset: u32,
    /// Pixels reserved for the legend before the scale begins.
    pub left_inset: i32,
    /// First active pixel; needle, peak, and marker never sit left of it.
    pub start_px: i32,
    /// Where the needle's overload segment begins.
    pub midpoint_px: i32,
    /// Interpolated noise floor lands on this pixel.
    pub floor_anchor_px: f32,
    /// Raw positions below this are remapped through the interpolation.
    pub floor_breakpoint_px: f32,
    /// Margin constant folded into the percent-to-pixel scale.
    pub margin_px: f32,
}

impl Default for MeterGeometry {
    fn default() -> Self {
        Self {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            right_inset: METER_RIGHT_INSET,
            left_inset: METER_LEFT_INSET,
            start_px: METER_START_PX,
            midpoint_px: METER_MIDPOINT_PX,
            floor_anchor_px: FLOOR_ANCHOR_PX,
            floor_breakpoint_px: FLOOR_BREAKPOINT_PX,
            margin_px: POSITION_MARGIN_PX,
        }
    }
}

impl MeterGeometry {
    /// Width in pixels of the active scale.
    pub fn active_width(&self) -> f32 {
        (self.width - self.right_inset) as f32
    }

    /// Pixels per percent on the position scale.
    pub fn max_position_scale(&self) -> f32 {
        (self.width as f32 + self.margin_px) / 100.0
    }

    /// Squelch marker bounds derived from the scale.
    pub fn marker_min(&self) -> f32 {
        self.start_px as f32
    }

    pub fn marker_max(&self) -> f32 {
        self.active_width() - 1.0
    }
}

/// Needle and peak pixel positions computed for one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeedlePositions {
    pub needle_px: f32,
    pub peak_px: f32,
}

/// Reference pixel the raw position is measured against during low-signal
/// interpolation. Implausible floor calibrations fall back to a fixed
/// reference.
pub fn s_rep_px(noise_floor_dbm: f32) -> f32 {
    if NOISE_FLOOR_VALID_DBM.contains(&noise_floor_dbm) {
        2.0 * noise_floor_dbm + 310.0
    } else {
        S_REP_FALLBACK_PX
    }
}

/// Maps samples to pixels and paints the meter bitmap.
#[derive(Debug, Clone)]
pub struct MeterRenderer {
    geometry: MeterGeometry,
    /// Calibrated no-antenna dBm reading; None disables interpolation.
    noise_floor_dbm: Option<f32>,
    /// AM offset mode suppresses the interpolation below the cutoff.
    am_offset: bool,
}

impl MeterRenderer {
    pub fn new(noise_floor_dbm: Option<f32>, am_offset: bool) -> Self {
        Self {
            geometry: MeterGeometry::default(),
            noise_floor_dbm,
            am_offset,
        }
    }

    pub fn geometry(&self) -> &MeterGeometry {
        &self.geometry
    }

    /// Raw percentage-scale position, clamped to the active width. May be
    /// negative for very weak signals; the final floor is applied after
    /// interpolation.
    fn raw_position(&self, db: f32) -> f32 {
        let normalized = (db + NORM_OFFSET_DB) / NORM_RANGE_DB * 100.0;
        (normalized * self.geometry.max_position_scale()).min(self.geometry.active_width())
    }

    /// Compress the low end of the scale so weak signals still separate
    /// visually from "no signal". Continuous and monotonic: positions at
    /// the breakpoint map to themselves, the reference position maps to
    /// the anchor.
    fn interpolate_low(&self, position: f32, s_rep: f32) -> f32 {
        let anchor = self.geometry.floor_anchor_px;
        let breakpoint = self.geometry.floor_breakpoint_px;
        if position < breakpoint {
            anchor + (position - s_rep) * (breakpoint - anchor) / (breakpoint - s_rep)
        } else {
            position
        }
    }

    fn floor_interpolation_active(&self, frequency_mhz: f32) -> bool {
        self.noise_floor_dbm.is_some() && !(self.am_offset && frequency_mhz <= AM_CUTOFF_MHZ)
    }

    /// Map a sample to needle and peak pixel positions. Monotonic
    /// non-decreasing in signal level; always within
    /// `[start_px, active_width]`.
    pub fn positions(&self, sample: &SignalSample) -> NeedlePositions {
        let mut needle_px = self.raw_position(sample.strength_db);
        let mut peak_px = self.raw_position(sample.peak_db);

        if self.floor_interpolation_active(sample.frequency_mhz) {
            let s_rep = s_rep_px(self.noise_floor_dbm.unwrap_or_default());
            needle_px = self.interpolate_low(needle_px, s_rep);
            peak_px = self.interpolate_low(peak_px, s_rep);
        }

        NeedlePositions {
            needle_px: needle_px.max(self.geometry.start_px as f32),
            peak_px: peak_px.max(self.geometry.start_px as f32),
        }
    }

    /// Paint one frame. The caller has already rejected NaN samples.
    /// Returns the computed positions so the squelch tick can reuse the
    /// most recently drawn needle.
    pub fn draw(
        &self,
        canvas: &mut WidgetCanvas,
        sample: &SignalSample,
        palette: &MeterPalette,
        invert: bool,
    ) -> NeedlePositions {
        let positions = self.positions(sample);
        let geo = &self.geometry;
        let meter_width = geo.active_width() as i32;

        canvas.clear_color(Rgb888::new(0, 0, 0));
        self.draw_scale(canvas, palette);

        // Background reference line across the full scale, then the peak
        // line over it, then the live needle in its two segments.
        let _ = fill_hbar(
            canvas,
            geo.left_inset,
            meter_width,
            METER_BAR_HEIGHT,
            palette.reference_line,
        );
        let _ = fill_hbar(
            canvas,
            geo.left_inset,
            (positions.peak_px as i32).min(geo.width as i32),
            METER_BAR_HEIGHT,
            palette.peak_line,
        );
        let _ = fill_hbar(
            canvas,
            geo.left_inset,
            (positions.needle_px as i32).min(geo.midpoint_px),
            METER_BAR_HEIGHT,
            COLOR_NEEDLE_NORMAL,
        );
        let _ = fill_hbar(
            canvas,
            geo.midpoint_px,
            (positions.needle_px as i32).max(geo.midpoint_px),
            METER_BAR_HEIGHT,
            COLOR_NEEDLE_OVERLOAD,
        );

        if invert {
            canvas.invert_channels();
        }

        debug!(
            "needle {:.1}px peak {:.1}px from {:.1} dB",
            positions.needle_px, positions.peak_px, sample.strength_db
        );

        positions
    }

    /// Background bar, legend, tick marks, and printed labels.
    fn draw_scale(&self, canvas: &mut WidgetCanvas, palette: &MeterPalette) {
        let geo = &self.geometry;
        let meter_width = geo.active_width() as i32;

        let _ = fill_hbar(
            canvas,
            geo.left_inset,
            meter_width,
            METER_BAR_HEIGHT,
            palette.scale_background,
        );

        let _ = draw_text(canvas, "S", 4, 0, &FONT_5X8, COLOR_LABEL);

        for (index, &pos) in TICK_POSITIONS.iter().enumerate() {
            if pos >= meter_width {
                continue;
            }
            let color = if index < TICK_GREEN_COUNT {
                COLOR_TICK_GREEN
            } else {
                COLOR_TICK_RED
            };
            let _ = draw_tick(canvas, pos, 3, 5, 2, color);
        }

        for (index, &pos) in LABEL_POSITIONS.iter().enumerate() {
            if pos >= meter_width {
                continue;
            }
            let _ = draw_label_centered(canvas, SCALE_LABELS[index], pos, 20, &FONT_4X6, COLOR_LABEL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sample(db: f32) -> SignalSample {
        SignalSample {
            strength_db: db,
            peak_db: db,
            frequency_mhz: 98.1,
            at: Instant::now(),
        }
    }

    #[test]
    fn test_s_rep_increases_with_floor() {
        let mut prev = f32::MIN;
        let mut dbm = -150.0f32;
        while dbm <= -114.0 {
            let rep = s_rep_px(dbm);
            assert!(rep > prev, "s_rep not increasing at {dbm}");
            prev = rep;
            dbm += 0.5;
        }
        // Outside the plausible calibration range: fixed fallback
        assert_eq!(s_rep_px(-160.0), S_REP_FALLBACK_PX);
        assert_eq!(s_rep_px(-100.0), S_REP_FALLBACK_PX);
    }

    #[test]
    fn test_s9_reference_lands_on_nine_tick() {
        // -93 dBm in the canonical unit (+120) is the S9 reference; with
        // the noise floor disabled the percentage formula alone places it
        // on the "9" tick.
        let renderer = MeterRenderer::new(None, false);
        let positions = renderer.positions(&sample(-93.0 + 120.0));
        assert!((positions.needle_px - 124.0).abs() < 0.01);
    }

    #[test]
    fn test_noise_floor_collapses_to_anchor() {
        // A reading exactly at the calibrated floor lands on the anchor
        // pixel instead of the raw formula's 64 px.
        let renderer = MeterRenderer::new(Some(-123.0), false);
        let positions = renderer.positions(&sample(-123.0 + 120.0));
        assert!((positions.needle_px - 18.0).abs() < 0.01);

        let raw_only = MeterRenderer::new(None, false);
        assert!((raw_only.positions(&sample(-123.0 + 120.0)).needle_px - 64.0).abs() < 0.01);
    }

    #[test]
    fn test_needle_monotonic_and_bounded() {
        for floor in [None, Some(-123.0), Some(-118.5)] {
            let renderer = MeterRenderer::new(floor, false);
            let mut prev = f32::MIN;
            let mut db = -80.0f32;
            while db <= 100.0 {
                let pos = renderer.positions(&sample(db)).needle_px;
                assert!(pos >= prev - 1e-3, "needle regressed at {db} (floor {floor:?})");
                assert!(pos >= METER_START_PX as f32 && pos <= renderer.geometry().active_width());
                prev = pos;
                db += 0.25;
            }
        }
    }

    #[test]
    fn test_am_mode_suppresses_interpolation_below_cutoff() {
        let renderer = MeterRenderer::new(Some(-123.0), true);
        let mut am = sample(-3.0);
        am.frequency_mhz = 7.2;
        // Raw position 64 survives: AM mode overrides the floor below the
        // cutoff frequency.
        assert!((renderer.positions(&am).needle_px - 64.0).abs() < 0.01);

        let mut fm = sample(-3.0);
        fm.frequency_mhz = 98.1;
        assert!((renderer.positions(&fm).needle_px - 18.0).abs() < 0.01);
    }

    #[test]
    fn test_peak_transform_is_independent() {
        let renderer = MeterRenderer::new(Some(-123.0), false);
        let mixed = SignalSample {
            strength_db: -3.0,
            peak_db: 40.0,
            frequency_mhz: 98.1,
            at: Instant::now(),
        };
        let positions = renderer.positions(&mixed);
        assert!((positions.needle_px - 18.0).abs() < 0.01);
        // 40 dB raw position: (40+35)/132*100*2.64 = 150 -> above the
        // breakpoint, untouched.
        assert!((positions.peak_px - 150.0).abs() < 0.01);
    }

    #[test]
    fn test_draw_paints_needle_segments() {
        let renderer = MeterRenderer::new(None, false);
        let mut canvas = WidgetCanvas::new(CANVAS_WIDTH, CANVAS_HEIGHT);
        let palette = MeterPalette::default();

        // Strong signal: needle well past the midpoint
        let positions = renderer.draw(&mut canvas, &sample(60.0), &palette, false);
        assert!(positions.needle_px > METER_MIDPOINT_PX as f32);
        let px = |x: usize, y: usize| canvas.as_slice()[y * CANVAS_WIDTH as usize + x];
        assert_eq!(px(40, 1), COLOR_NEEDLE_NORMAL);
        assert_eq!(px(METER_MIDPOINT_PX as usize + 4, 1), COLOR_NEEDLE_OVERLOAD);
    }

    #[test]
    fn test_inversion_applies_to_whole_frame() {
        let renderer = MeterRenderer::new(None, false);
        let mut plain = WidgetCanvas::new(CANVAS_WIDTH, CANVAS_HEIGHT);
        let mut inverted = WidgetCanvas::new(CANVAS_WIDTH, CANVAS_HEIGHT);
        let palette = MeterPalette::default();
        renderer.draw(&mut plain, &sample(10.0), &palette, false);
        renderer.draw(&mut inverted, &sample(10.0), &palette, true);
        plain.invert_channels();
        assert_eq!(plain.snapshot(), inverted.snapshot());
    }
}
