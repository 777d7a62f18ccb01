//! This module contains global constants used across the meter and other modules.

use std::time::Duration;
use embedded_graphics::pixelcolor::Rgb888;

/// The total width of the meter canvas in logical pixels.
pub const CANVAS_WIDTH: u32 = 256;
/// The total height of the meter canvas in logical pixels.
pub const CANVAS_HEIGHT: u32 = 13;

/// Unused pixels at the right edge of the canvas; the active scale ends here.
pub const METER_RIGHT_INSET: u32 = 11;
/// Pixels reserved at the left edge for the "S" legend before the scale begins.
pub const METER_LEFT_INSET: i32 = 15;
/// First active pixel of the scale; needle and marker never fall below this.
pub const METER_START_PX: i32 = METER_LEFT_INSET + 1;
/// Width in pixels of the active meter area.
pub const METER_ACTIVE_WIDTH: i32 = (CANVAS_WIDTH - METER_RIGHT_INSET) as i32;
/// Pixel where the needle switches from the normal to the overload segment.
pub const METER_MIDPOINT_PX: i32 = (CANVAS_WIDTH / 2) as i32 - 4;
/// Height of the horizontal bar the needle and peak lines are drawn in.
pub const METER_BAR_HEIGHT: u32 = 4;

/// Tick x positions; the first ten mark S1..S9 (odd units labelled), the rest +10..+60 dB.
pub const TICK_POSITIONS: [i32; 16] = [
    16, 28, 40, 52, 64, 76, 88, 100, 112, 124, 144, 164, 184, 204, 224, 244,
];
/// Number of ticks belonging to the S-unit (green) region.
pub const TICK_GREEN_COUNT: usize = 10;
/// Label x positions, paired with `SCALE_LABELS`. The +dB entries sit 3 px
/// left of their ticks so the "+" does not unbalance the centering.
pub const LABEL_POSITIONS: [i32; 11] = [28, 52, 76, 100, 124, 141, 161, 181, 201, 221, 241];
/// Printed scale labels.
pub const SCALE_LABELS: [&str; 11] = [
    "1", "3", "5", "7", "9", "+10", "+20", "+30", "+40", "+50", "+60",
];

/// dB offset added before normalizing a reading onto the percentage scale.
pub const NORM_OFFSET_DB: f32 = 35.0;
/// dB span the percentage scale covers.
pub const NORM_RANGE_DB: f32 = 132.0;
/// Margin constant folded into the percent-to-pixel scale factor.
pub const POSITION_MARGIN_PX: f32 = 8.0;

/// Pixel the interpolated noise floor maps to.
pub const FLOOR_ANCHOR_PX: f32 = 18.0;
/// Pixel below which the low-signal interpolation takes over.
pub const FLOOR_BREAKPOINT_PX: f32 = 86.0;
/// Noise-floor dBm readings outside this range use `S_REP_FALLBACK_PX`.
pub const NOISE_FLOOR_VALID_DBM: std::ops::RangeInclusive<f32> = -150.0..=-114.0;
/// Reference pixel used when the configured noise floor is implausible.
pub const S_REP_FALLBACK_PX: f32 = 64.0;

/// Additive offset for hosts reporting in dBm.
pub const DBM_UNIT_OFFSET: f32 = 120.0;
/// Additive offset for hosts reporting in dBµV.
pub const DBUV_UNIT_OFFSET: f32 = 11.25;

/// Frequencies at or below this get the AM correction (MHz).
pub const AM_CUTOFF_MHZ: f32 = 27.0;
/// Frequencies at or below this get the full AM correction (MHz).
pub const AM_FULL_MHZ: f32 = 10.0;
/// AM correction at and below `AM_FULL_MHZ` (dB).
pub const AM_OFFSET_MAX_DB: f32 = 40.0;
/// AM correction at the cutoff frequency (dB).
pub const AM_OFFSET_MIN_DB: f32 = 20.0;

/// Marker movement per wheel notch (px).
pub const WHEEL_STEP_PX: f32 = 2.0;
/// Marker stroke width (px).
pub const MARKER_WIDTH: u32 = 2;
/// Double-clicks at or left of this x toggle meter visibility.
pub const TOGGLE_REGION_MAX_X: f32 = (METER_LEFT_INSET - 1) as f32;
/// Opacity while hovering a hidden meter.
pub const HIDDEN_HOVER_OPACITY: f32 = 0.2;
/// Fraction of the cached volume output is set to while squelched.
pub const SQUELCH_MUTE_FRACTION: f32 = 0.01;

/// Render tick period: sample + draw.
pub const RENDER_TICK: Duration = Duration::from_millis(125);
/// Squelch evaluation period; intentionally slower than the render tick.
pub const SQUELCH_TICK: Duration = Duration::from_millis(1000);
/// Minimum spacing between placement mount flips.
pub const PLACEMENT_DEBOUNCE: Duration = Duration::from_millis(400);
/// Left-edge difference below which two panels count as stacked (px).
pub const ALIGN_TOLERANCE_PX: f32 = 1.0;
/// Overlay opacity below this counts as hidden even when displayed.
pub const OVERLAY_OPACITY_FLOOR: f32 = 0.5;

/// Absolute top offset of the canvases while overlay-mounted (px).
pub const OVERLAY_TOP_PX: i32 = 10;
/// Absolute left offset of the canvases while overlay-mounted (px).
pub const OVERLAY_LEFT_PX: i32 = 172;
/// Extra left offset when the auto-rotator location is selected (px).
pub const ROTATOR_OFFSET_PX: i32 = 200;
/// Delay before reparenting back inline, letting the fade-out land first.
pub const INLINE_RESTORE_DELAY: Duration = Duration::from_millis(250);

/// Top offset while mounted inside a peak-meter panel (px).
pub const PEAKMETER_TOP_PX: i32 = -50;
/// Top offset for the narrow-host peak-meter fallback (px).
pub const PEAKMETER_NARROW_TOP_PX: i32 = -28;
/// Hosts wider than this use the percent-width responsive layout (px).
pub const WIDE_HOST_WIDTH_PX: u32 = 768;
/// Host height granting the roomier top margin (px).
pub const FULL_HEIGHT_PX: u32 = 720;
/// `FULL_HEIGHT_PX` for hosts without a plugin dashboard list.
pub const FULL_HEIGHT_LEGACY_PX: u32 = 860;
/// Canvas percent width on wide hosts.
pub const RESPONSIVE_WIDTH_PCT: f32 = 76.655;
/// Canvas percent left margin on wide hosts while outside the field.
pub const RESPONSIVE_MARGIN_PCT: f32 = -38.333;
/// Fixed left margin while outside the field on narrow hosts (px).
pub const OUTSIDE_MARGIN_PX: i32 = -128;

/// Text luminance below this triggers the light-theme inversion pass.
pub const LUMINANCE_THRESHOLD: f32 = 0.5;

// Fixed palette, used verbatim when theme colors are off.
pub const COLOR_TICK_GREEN: Rgb888 = Rgb888::new(0x08, 0xC8, 0x18);
pub const COLOR_TICK_RED: Rgb888 = Rgb888::new(0xE8, 0x18, 0x08);
pub const COLOR_NEEDLE_NORMAL: Rgb888 = Rgb888::new(0x08, 0xB8, 0x18);
pub const COLOR_NEEDLE_OVERLOAD: Rgb888 = Rgb888::new(0xE0, 0x18, 0x08);
pub const COLOR_SCALE_BACKGROUND: Rgb888 = Rgb888::new(0x0F, 0x0F, 0x0F);
pub const COLOR_REFERENCE_LINE: Rgb888 = Rgb888::new(0x21, 0x22, 0x23);
pub const COLOR_PEAK_LINE: Rgb888 = Rgb888::new(0x35, 0x37, 0x3A);
pub const COLOR_MARKER: Rgb888 = Rgb888::new(0xFE, 0xEE, 0x33);
pub const COLOR_LABEL: Rgb888 = Rgb888::new(0xFF, 0xFF, 0xFF);

/// Preference key for the persisted meter/marker opacity.
pub const PREF_METER_VISIBILITY: &str = "SignalMeterVisibility";
/// Preference key for the host's "show peak meter" toggle.
pub const PREF_SHOW_PEAKMETER: &str = "showPeakmeter";
/// Preference key selecting the reported signal unit.
pub const PREF_SIGNAL_UNIT: &str = "signalUnit";
