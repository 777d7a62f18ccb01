/*
 *  host.rs
 *
 *  SMeterS - every dB counts
 *	(c) 2024-26 SMeterS contributors
 *
 *	Boundary between the widget and the dashboard that embeds it. The
 *	widget only ever sees the host through these traits: telemetry text
 *	fields, a volume handle, a string preference store, and the panel
 *	surface the canvases are mounted on. Everything behind them is host
 *	property and out of scope here.
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

use std::time::Duration;

use crate::layout::CanvasStyle;

/// The numeric telemetry fields the host exposes as text, read once per
/// render tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryField {
    /// Whole part of the instantaneous signal level.
    Signal,
    /// Sub-unit fraction of the instantaneous signal level.
    SignalFraction,
    /// Peak signal level.
    Peak,
    /// Currently tuned frequency, MHz.
    Frequency,
}

/// Read-only numeric telemetry, host-owned.
pub trait Telemetry {
    /// Current text content of a telemetry field, or None when the field
    /// is not present in the host document.
    fn read(&self, field: TelemetryField) -> Option<String>;
}

/// The host volume handle. `desired_volume` tracks what the listener last
/// asked for, independently of what squelch may have set, and is how
/// manual overrides are detected.
pub trait AudioControl {
    fn volume(&self) -> f32;
    fn set_volume(&mut self, value: f32);
    fn desired_volume(&self) -> Option<f32>;
    /// True while playback is still spinning up and the host may clobber
    /// volume on its own.
    fn playback_starting(&self) -> bool;
}

/// Persisted string preferences, host-owned.
pub trait PrefStore {
    fn get_pref(&self, key: &str) -> Option<String>;
    fn set_pref(&mut self, key: &str, value: &str);
}

/// Theme custom-property colors read (never written) from the host, raw
/// CSS strings as the host reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeColors {
    pub text: Option<String>,
    pub scale_background: Option<String>,
    pub reference_line: Option<String>,
    pub peak_line: Option<String>,
    pub marker: Option<String>,
}

/// Which host panels exist, discovered once at widget initialization by
/// heading text or fixed identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelInventory {
    /// The inline "signal" panel, the widget's native home.
    pub signal: bool,
    /// An optional "peak meter" panel.
    pub peakmeter: bool,
    /// The alternate live-graph panel the overlay mount stacks above.
    pub graph: bool,
    /// Pre-plugin-dashboard host generation; affects the layout cutoffs.
    pub legacy: bool,
}

/// Host document queries that are not per-tick telemetry.
pub trait HostPanels {
    fn inventory(&self) -> PanelInventory;
    fn window_size(&self) -> (u32, u32);
    /// CSS pixel width the marker canvas currently renders at, for the
    /// backing-store pointer translation.
    fn canvas_css_width(&self) -> f32;
    fn theme(&self) -> ThemeColors;
    /// Surface a one-time informational notice in the host settings panel.
    fn notice(&mut self, text: &str);
}

/// Mount-side effects the placement machine asks the host to perform.
/// Fade/scale durations are presentation detail the host owns; the widget
/// only sequences them.
pub trait MountSurface {
    fn fade_out(&mut self);
    /// Reparent the canvas pair above the graph panel at an absolute
    /// offset.
    fn mount_overlay(&mut self, top_px: i32, left_px: i32);
    /// Reparent the canvas pair back into the inline container after
    /// `restore_delay`, clearing absolute positioning and backdrop.
    fn mount_inline(&mut self, restore_delay: Duration);
    fn fade_in(&mut self, scale_up: bool);
    fn set_backdrop(&mut self, on: bool);
    fn set_opacity(&mut self, opacity: f32);
    fn apply_style(&mut self, style: &CanvasStyle);
}

/// The whole host seam in one bound, so the widget can hold a single
/// handle.
pub trait Host:
    Telemetry + AudioControl + PrefStore + HostPanels + MountSurface
{
}

impl<T> Host for T where
    T: Telemetry + AudioControl + PrefStore + HostPanels + MountSurface
{
}

/// Pointer device button, post device-unification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Other,
}

/// Device-agnostic pointer input over the marker canvas. `x_css` is the
/// x-coordinate relative to the canvas left edge in CSS pixels; the
/// controller translates it through the backing-store scale exactly once.
/// The host suppresses its default page scroll while the pointer is over
/// the widget, so wheel notches arrive here and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x_css: f32, button: PointerButton, touches: u8 },
    Move { x_css: f32 },
    Up,
    Wheel { delta_y: f32 },
    Over,
    Out,
    DoubleClick { x_css: f32 },
}

/// One DOM-change notification's worth of observed panel state. Opacities
/// and left edges are None when the element is missing or not yet laid
/// out.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PanelObservation {
    pub graph_opacity: Option<f32>,
    pub alt_canvas_opacity: Option<f32>,
    pub graph_left: Option<f32>,
    pub alt_canvas_left: Option<f32>,
    /// Whether the graph panel's display state is block.
    pub graph_displayed: bool,
}

/// Everything the host pushes at the widget asynchronously.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Pointer(PointerEvent),
    Mutation(PanelObservation),
    WindowResized { width: u32, height: u32 },
}
