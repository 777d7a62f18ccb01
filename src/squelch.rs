/*
 *  squelch.rs
 *
 *  SMeterS - every dB counts
 *	(c) 2024-26 SMeterS contributors
 *
 *	The draggable squelch threshold marker and the mute/unmute state
 *	machine that compares it against the needle on a slow tick.
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

use log::{debug, info};

use crate::canvas::WidgetCanvas;
use crate::constants::{
    HIDDEN_HOVER_OPACITY, MARKER_WIDTH, PREF_METER_VISIBILITY, SQUELCH_MUTE_FRACTION,
    TOGGLE_REGION_MAX_X, WHEEL_STEP_PX,
};
use crate::draw::draw_marker_line;
use crate::host::{AudioControl, MountSurface, PointerButton, PointerEvent, PrefStore};
use crate::meter::MeterGeometry;
use crate::theme::MeterPalette;

/// The marker's pixel position and bounds. Mutated only here; the clamp
/// invariant `min_px <= position_px <= max_px` holds after every mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerState {
    pub position_px: f32,
    pub min_px: f32,
    pub max_px: f32,
    pub visible: bool,
}

impl MarkerState {
    fn clamp(&self, x: f32) -> f32 {
        x.max(self.min_px).min(self.max_px)
    }
}

/// Mute state mirroring the host volume. `active` is true exactly while
/// output is muted due to squelch; `prior_volume` is the baseline restored
/// on deactivation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SquelchState {
    pub active: bool,
    pub prior_volume: f32,
}

pub struct SquelchController {
    enabled: bool,
    /// Set while playback is starting; evaluation pauses to avoid racing
    /// the host's own volume initialization.
    suspended: bool,
    marker: MarkerState,
    state: SquelchState,
    dragging: bool,
    grab_offset: f32,
    /// Backing-store width over CSS width; pointer coordinates cross this
    /// boundary exactly once.
    backing_width: f32,
    css_width: f32,
    /// Persisted meter/marker opacity; 1.0 visible, 0.0 hidden.
    opacity: f32,
    /// Raised opacity while hovering a hidden meter.
    peeking: bool,
}

impl SquelchController {
    pub fn new(enabled: bool, geometry: &MeterGeometry) -> Self {
        Self {
            enabled,
            suspended: false,
            marker: MarkerState {
                position_px: geometry.marker_min(),
                min_px: geometry.marker_min(),
                max_px: geometry.marker_max(),
                visible: true,
            },
            state: SquelchState { active: false, prior_volume: 1.0 },
            dragging: false,
            grab_offset: 0.0,
            backing_width: geometry.width as f32,
            css_width: geometry.width as f32,
            opacity: 1.0,
            peeking: false,
        }
    }

    /// Restore the persisted visibility preference after (re)initialization.
    pub fn restore_visibility<H: PrefStore + MountSurface>(&mut self, host: &mut H) {
        let saved = host
            .get_pref(PREF_METER_VISIBILITY)
            .and_then(|v| v.trim().parse::<f32>().ok())
            .unwrap_or(1.0);
        self.opacity = saved;
        self.marker.visible = saved == 1.0;
        host.set_opacity(saved);
    }

    pub fn marker(&self) -> &MarkerState {
        &self.marker
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn state(&self) -> &SquelchState {
        &self.state
    }

    /// The host resized the canvas; subsequent pointer coordinates arrive
    /// in the new CSS width.
    pub fn set_css_width(&mut self, css_width: f32) {
        if css_width > 0.0 {
            self.css_width = css_width;
        }
    }

    fn canvas_x(&self, x_css: f32) -> f32 {
        x_css * self.backing_width / self.css_width
    }

    /// Handle one pointer event. Returns true when the marker overlay
    /// needs a redraw.
    pub fn pointer<H: PrefStore + MountSurface>(
        &mut self,
        event: PointerEvent,
        host: &mut H,
    ) -> bool {
        if !self.enabled {
            return false;
        }
        match event {
            PointerEvent::Down { x_css, button, touches } => {
                if self.opacity != 1.0 {
                    // Hidden meter: refuse the drag and park the marker.
                    self.marker.visible = false;
                    self.marker.position_px = self.marker.min_px;
                    return false;
                }
                self.marker.visible = true;
                if button == PointerButton::Middle || touches > 1 {
                    return false;
                }
                let x = self.canvas_x(x_css);
                self.marker.position_px = self.marker.clamp(x);
                self.grab_offset = x - self.marker.position_px;
                self.dragging = true;
                debug!("squelch drag start at {:.1}px", self.marker.position_px);
                true
            }
            PointerEvent::Move { x_css } => {
                if !self.dragging {
                    return false;
                }
                let x = self.canvas_x(x_css) - self.grab_offset;
                self.marker.position_px = self.marker.clamp(x);
                true
            }
            PointerEvent::Up => {
                if self.dragging {
                    self.dragging = false;
                    debug!("squelch drag end at {:.1}px", self.marker.position_px);
                }
                false
            }
            PointerEvent::Wheel { delta_y } => {
                let step = if delta_y > 0.0 { -WHEEL_STEP_PX } else { WHEEL_STEP_PX };
                self.marker.position_px = self.marker.clamp(self.marker.position_px + step);
                true
            }
            PointerEvent::Over => {
                if self.opacity == 0.0 && !self.peeking {
                    self.peeking = true;
                    host.set_opacity(HIDDEN_HOVER_OPACITY);
                }
                false
            }
            PointerEvent::Out => {
                if self.peeking {
                    self.peeking = false;
                    host.set_opacity(0.0);
                }
                false
            }
            PointerEvent::DoubleClick { x_css } => {
                if self.canvas_x(x_css) > TOGGLE_REGION_MAX_X {
                    return false;
                }
                self.opacity = if self.opacity == 1.0 { 0.0 } else { 1.0 };
                self.peeking = false;
                self.marker.visible = true;
                host.set_opacity(self.opacity);
                host.set_pref(PREF_METER_VISIBILITY, &format!("{}", self.opacity));
                info!("meter visibility toggled to {}", self.opacity);
                true
            }
        }
    }

    /// Slow-tick squelch evaluation against the most recently drawn needle
    /// position (up to one render tick stale, acceptable).
    pub fn evaluate<H: AudioControl>(&mut self, needle_px: f32, host: &mut H) {
        if !self.enabled {
            return;
        }

        // Playback spin-up: the host may still be initializing volume, so
        // stand down entirely until the transient clears.
        if host.playback_starting() {
            self.suspended = true;
            self.marker.position_px = self.marker.min_px;
            return;
        }
        self.suspended = false;

        // A desired volume that differs from our cached baseline means the
        // listener changed volume manually: drop squelch state without
        // restoring anything stale, and protect the new baseline instead.
        // An unset or zero desired volume protects full volume.
        let desired = host
            .desired_volume()
            .filter(|v| *v != 0.0)
            .unwrap_or(1.0);
        if desired != self.state.prior_volume && self.state.active {
            info!("manual volume override detected, squelch released");
            self.state.active = false;
        }
        self.state.prior_volume = desired;

        if self.marker.position_px > needle_px && !self.state.active {
            host.set_volume(self.state.prior_volume * SQUELCH_MUTE_FRACTION);
            self.state.active = true;
            debug!(
                "squelch engaged: marker {:.1}px > needle {:.1}px",
                self.marker.position_px, needle_px
            );
        } else if self.marker.position_px <= needle_px && self.state.active {
            host.set_volume(self.state.prior_volume);
            self.state.active = false;
            debug!(
                "squelch released: marker {:.1}px <= needle {:.1}px",
                self.marker.position_px, needle_px
            );
        }
    }

    /// Redraw the marker overlay layer only.
    pub fn draw_marker(&self, canvas: &mut WidgetCanvas, palette: &MeterPalette) {
        canvas.clear_color(embedded_graphics::pixelcolor::Rgb888::new(0, 0, 0));
        if !self.enabled || self.suspended || !self.marker.visible {
            return;
        }
        let _ = draw_marker_line(
            canvas,
            self.marker.position_px as i32,
            MARKER_WIDTH,
            palette.marker,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostPanels, PanelInventory, ThemeColors};
    use crate::layout::CanvasStyle;
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeHost {
        prefs: HashMap<String, String>,
        opacity: f32,
        volume: f32,
        desired: Option<f32>,
        starting: bool,
    }

    impl PrefStore for FakeHost {
        fn get_pref(&self, key: &str) -> Option<String> {
            self.prefs.get(key).cloned()
        }
        fn set_pref(&mut self, key: &str, value: &str) {
            self.prefs.insert(key.to_string(), value.to_string());
        }
    }

    impl AudioControl for FakeHost {
        fn volume(&self) -> f32 {
            self.volume
        }
        fn set_volume(&mut self, value: f32) {
            self.volume = value;
        }
        fn desired_volume(&self) -> Option<f32> {
            self.desired
        }
        fn playback_starting(&self) -> bool {
            self.starting
        }
    }

    impl HostPanels for FakeHost {
        fn inventory(&self) -> PanelInventory {
            PanelInventory::default()
        }
        fn window_size(&self) -> (u32, u32) {
            (1280, 800)
        }
        fn canvas_css_width(&self) -> f32 {
            256.0
        }
        fn theme(&self) -> ThemeColors {
            ThemeColors::default()
        }
        fn notice(&mut self, _text: &str) {}
    }

    impl MountSurface for FakeHost {
        fn fade_out(&mut self) {}
        fn mount_overlay(&mut self, _top_px: i32, _left_px: i32) {}
        fn mount_inline(&mut self, _restore_delay: Duration) {}
        fn fade_in(&mut self, _scale_up: bool) {}
        fn set_backdrop(&mut self, _on: bool) {}
        fn set_opacity(&mut self, opacity: f32) {
            self.opacity = opacity;
        }
        fn apply_style(&mut self, _style: &CanvasStyle) {}
    }

    fn controller() -> SquelchController {
        SquelchController::new(true, &MeterGeometry::default())
    }

    fn down(x: f32) -> PointerEvent {
        PointerEvent::Down { x_css: x, button: PointerButton::Primary, touches: 1 }
    }

    #[test]
    fn test_pointer_positions_are_clamped() {
        let mut ctl = controller();
        let mut host = FakeHost::default();
        ctl.pointer(down(1000.0), &mut host);
        assert_eq!(ctl.marker().position_px, ctl.marker().max_px);
        ctl.pointer(PointerEvent::Move { x_css: -50.0 }, &mut host);
        assert_eq!(ctl.marker().position_px, ctl.marker().min_px);
        ctl.pointer(PointerEvent::Up, &mut host);
        // Moves after pointer-up are ignored
        ctl.pointer(PointerEvent::Move { x_css: 120.0 }, &mut host);
        assert_eq!(ctl.marker().position_px, ctl.marker().min_px);
    }

    #[test]
    fn test_wheel_steps_without_drag() {
        let mut ctl = controller();
        let mut host = FakeHost::default();
        ctl.pointer(down(100.0), &mut host);
        ctl.pointer(PointerEvent::Up, &mut host);
        let start = ctl.marker().position_px;
        ctl.pointer(PointerEvent::Wheel { delta_y: -1.0 }, &mut host);
        assert_eq!(ctl.marker().position_px, start + WHEEL_STEP_PX);
        ctl.pointer(PointerEvent::Wheel { delta_y: 1.0 }, &mut host);
        ctl.pointer(PointerEvent::Wheel { delta_y: 1.0 }, &mut host);
        assert_eq!(ctl.marker().position_px, start - WHEEL_STEP_PX);
    }

    #[test]
    fn test_css_scale_translation() {
        let mut ctl = controller();
        let mut host = FakeHost::default();
        // Canvas rendered at half size: CSS x 50 is backing-store x 100
        ctl.set_css_width(128.0);
        ctl.pointer(down(50.0), &mut host);
        assert_eq!(ctl.marker().position_px, 100.0);
    }

    #[test]
    fn test_squelch_activation_and_exact_restore() {
        let mut ctl = controller();
        let mut host = FakeHost { volume: 0.8, desired: Some(0.8), ..Default::default() };
        ctl.pointer(down(200.0), &mut host);
        ctl.pointer(PointerEvent::Up, &mut host);

        // Needle below the marker: engage, volume drops to 1/100 of cached
        ctl.evaluate(150.0, &mut host);
        assert!(ctl.is_active());
        assert!((host.volume - 0.008).abs() < 1e-6);

        // Needle rises past the marker: exact restore
        ctl.evaluate(210.0, &mut host);
        assert!(!ctl.is_active());
        assert_eq!(host.volume, 0.8);
    }

    #[test]
    fn test_manual_override_clears_without_restore() {
        let mut ctl = controller();
        let mut host = FakeHost { volume: 0.8, desired: Some(0.8), ..Default::default() };
        ctl.pointer(down(200.0), &mut host);
        ctl.evaluate(150.0, &mut host);
        assert!(ctl.is_active());

        // Listener drags the volume slider while squelched. The override
        // releases the old state; with the marker still above the needle
        // the same tick re-engages against the new baseline. The stale
        // 0.8 is never written back.
        host.desired = Some(0.3);
        host.volume = 0.3;
        ctl.evaluate(150.0, &mut host);
        assert!(ctl.is_active());
        assert!((host.volume - 0.003).abs() < 1e-6);

        // Deactivation restores the new baseline exactly
        ctl.evaluate(210.0, &mut host);
        assert!(!ctl.is_active());
        assert_eq!(host.volume, 0.3);
    }

    #[test]
    fn test_playback_start_suspends_evaluation() {
        let mut ctl = controller();
        let mut host = FakeHost {
            volume: 0.8,
            desired: Some(0.8),
            starting: true,
            ..Default::default()
        };
        ctl.pointer(down(200.0), &mut host);
        ctl.evaluate(150.0, &mut host);
        // No mute while playback is spinning up; marker parks at start
        assert!(!ctl.is_active());
        assert_eq!(host.volume, 0.8);
        assert_eq!(ctl.marker().position_px, ctl.marker().min_px);

        host.starting = false;
        ctl.pointer(down(200.0), &mut host);
        ctl.evaluate(150.0, &mut host);
        assert!(ctl.is_active());
    }

    #[test]
    fn test_double_click_toggles_and_persists() {
        let mut ctl = controller();
        let mut host = FakeHost::default();
        // Outside the legend region: ignored
        ctl.pointer(PointerEvent::DoubleClick { x_css: 40.0 }, &mut host);
        assert_eq!(host.prefs.get(PREF_METER_VISIBILITY), None);

        ctl.pointer(PointerEvent::DoubleClick { x_css: 5.0 }, &mut host);
        assert_eq!(host.opacity, 0.0);
        assert_eq!(host.prefs.get(PREF_METER_VISIBILITY).map(String::as_str), Some("0"));

        ctl.pointer(PointerEvent::DoubleClick { x_css: 5.0 }, &mut host);
        assert_eq!(host.opacity, 1.0);
        assert_eq!(host.prefs.get(PREF_METER_VISIBILITY).map(String::as_str), Some("1"));
    }

    #[test]
    fn test_hidden_meter_refuses_drag_and_peeks() {
        let mut ctl = controller();
        let mut host = FakeHost::default();
        ctl.pointer(PointerEvent::DoubleClick { x_css: 5.0 }, &mut host);
        assert_eq!(host.opacity, 0.0);

        assert!(!ctl.pointer(down(200.0), &mut host));
        assert_eq!(ctl.marker().position_px, ctl.marker().min_px);
        assert!(!ctl.marker().visible);

        ctl.pointer(PointerEvent::Over, &mut host);
        assert_eq!(host.opacity, HIDDEN_HOVER_OPACITY);
        ctl.pointer(PointerEvent::Out, &mut host);
        assert_eq!(host.opacity, 0.0);
    }
}
