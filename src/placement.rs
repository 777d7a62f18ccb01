/*
 *  placement.rs
 *
 *  SMeterS - every dB counts
 *	(c) 2024-26 SMeterS contributors
 *
 *	Decides which of the two mutually exclusive host containers owns the
 *	canvas pair, from observed panel visibility and geometry, and drives
 *	the animated reparenting through the host surface. Only the canvases
 *	move; numeric meter state is never touched from here.
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

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::constants::{
    ALIGN_TOLERANCE_PX, INLINE_RESTORE_DELAY, OVERLAY_LEFT_PX, OVERLAY_OPACITY_FLOOR,
    OVERLAY_TOP_PX, PEAKMETER_TOP_PX, PLACEMENT_DEBOUNCE, PREF_SHOW_PEAKMETER, ROTATOR_OFFSET_PX,
};
use crate::host::{MountSurface, PanelInventory, PanelObservation};

/// Which host container currently owns the canvas pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mount {
    /// Inside the native signal (or peak-meter) panel.
    Inline,
    /// Absolutely positioned above the alternate live-graph panel.
    Overlay,
}

/// The configured meter location mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeterLocation {
    #[default]
    Auto,
    Signal,
    SdrGraph,
    SdrGraphOnly,
    Peakmeter,
    AutoRotator,
}

/// Where and how the widget mounts, resolved once at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPlacement {
    /// Mount inside the peak-meter panel instead of the signal panel.
    pub use_peakmeter: bool,
    /// Whether the canvases sit outside the panel's field area.
    pub outside_field: bool,
    /// Whether observation-driven relocation runs at all.
    pub relocation: bool,
    /// Extra overlay left offset (auto-rotator hosts).
    pub rotator_offset_px: i32,
    /// Keep the canvases hidden until the first overlay transition.
    pub hide_until_overlay: bool,
    /// Inline top offset inside the peak-meter panel.
    pub top_offset_px: i32,
}

/// Collapse the configured location against what the host actually has.
/// Mirrors the precedence the widget has always used: a graph-only mode
/// degrades to auto on narrow portrait hosts, the persisted peak-meter
/// toggle can demote auto to graph placement, and a present peak-meter
/// panel captures the widget entirely (relocation off).
pub fn resolve_location(
    mode: MeterLocation,
    outside_field: bool,
    inventory: PanelInventory,
    window: (u32, u32),
    show_peakmeter_pref: Option<&str>,
) -> ResolvedPlacement {
    let rotator_offset_px = if mode == MeterLocation::AutoRotator {
        ROTATOR_OFFSET_PX
    } else {
        0
    };
    let mut mode = match mode {
        MeterLocation::AutoRotator => MeterLocation::Auto,
        other => other,
    };

    let (width, height) = window;
    if mode == MeterLocation::SdrGraphOnly && width < 480 && height > width {
        mode = MeterLocation::Auto;
    }

    if let Some(pref) = show_peakmeter_pref {
        let show = pref == "true";
        if mode == MeterLocation::Auto && !show {
            mode = MeterLocation::SdrGraph;
        } else if mode == MeterLocation::SdrGraphOnly && show {
            mode = MeterLocation::Auto;
        }
    }

    // The peak-meter panel only matters outside the graph modes.
    let peakmeter_present = inventory.peakmeter
        && mode != MeterLocation::SdrGraph
        && mode != MeterLocation::SdrGraphOnly;

    let use_peakmeter = peakmeter_present
        && (mode == MeterLocation::Auto || mode == MeterLocation::Peakmeter);

    let outside_field = outside_field && !use_peakmeter;

    let relocation = !peakmeter_present
        && outside_field
        && matches!(
            mode,
            MeterLocation::Auto | MeterLocation::SdrGraph | MeterLocation::SdrGraphOnly
        );

    ResolvedPlacement {
        use_peakmeter,
        outside_field,
        relocation,
        rotator_offset_px,
        hide_until_overlay: mode == MeterLocation::SdrGraphOnly,
        top_offset_px: if use_peakmeter { PEAKMETER_TOP_PX } else { 0 },
    }
}

/// Read the persisted peak-meter toggle, if the mode consults it at all.
pub fn peakmeter_pref<P: crate::host::PrefStore>(store: &P, mode: MeterLocation) -> Option<String> {
    match mode {
        MeterLocation::Auto | MeterLocation::SdrGraphOnly | MeterLocation::AutoRotator => {
            store.get_pref(PREF_SHOW_PEAKMETER)
        }
        _ => None,
    }
}

/// The reactive mount state machine. Fed one `PanelObservation` per host
/// mutation notification; flips between inline and overlay mounts with a
/// debounce window so noisy visibility signals cannot flap the canvases.
pub struct PlacementStateMachine {
    placement: ResolvedPlacement,
    debounce: Duration,
    align_tolerance: f32,
    /// Target state derived from observations; true means overlay.
    overlay_wanted: bool,
    last_observed: Option<bool>,
    /// Cleared when an unaligned both-visible toggle fires; restored once
    /// the debounce window after the last state change expires.
    can_change: bool,
    debounce_started: Option<Instant>,
    /// Latched once the graph panel has been seen absent while the signal
    /// canvas was up; overlay forcing waits for it.
    graph_ready: bool,
    /// Last complete geometry verdict; reused while geometry is missing.
    aligned: bool,
    mounted: Mount,
    /// Times of effected mount flips, for flap diagnostics.
    last_flip: Option<Instant>,
}

impl PlacementStateMachine {
    pub fn new(placement: ResolvedPlacement) -> Self {
        Self::with_timing(placement, PLACEMENT_DEBOUNCE, ALIGN_TOLERANCE_PX)
    }

    /// The debounce interval and alignment tolerance are empirically tuned
    /// against one host layout; both stay overridable.
    pub fn with_timing(
        placement: ResolvedPlacement,
        debounce: Duration,
        align_tolerance: f32,
    ) -> Self {
        Self {
            placement,
            debounce,
            align_tolerance,
            overlay_wanted: false,
            last_observed: None,
            can_change: true,
            debounce_started: None,
            graph_ready: false,
            aligned: false,
            mounted: Mount::Inline,
            last_flip: None,
        }
    }

    pub fn mounted(&self) -> Mount {
        self.mounted
    }

    pub fn resolved(&self) -> &ResolvedPlacement {
        &self.placement
    }

    pub fn last_flip(&self) -> Option<Instant> {
        self.last_flip
    }

    /// Process one mutation notification. All state advances happen here;
    /// the host surface receives the resulting reparent sequence, if any.
    pub fn observe<H: MountSurface>(
        &mut self,
        obs: &PanelObservation,
        now: Instant,
        host: &mut H,
    ) {
        if !self.placement.relocation {
            return;
        }

        // Re-arm the toggle once the debounce window has fully elapsed.
        if let Some(started) = self.debounce_started {
            if now.duration_since(started) >= self.debounce {
                self.can_change = true;
                self.debounce_started = None;
            }
        }

        let graph_visible = obs.graph_opacity.map(|o| o > 0.0).unwrap_or(false);
        let alt_visible = obs.alt_canvas_opacity.map(|o| o > 0.0).unwrap_or(false);

        if !self.graph_ready && !graph_visible && alt_visible {
            self.graph_ready = true;
            debug!("graph panel ready latch set");
        }

        // Stacked-panel check; incomplete geometry keeps the last verdict.
        if let (Some(graph_left), Some(alt_left)) = (obs.graph_left, obs.alt_canvas_left) {
            self.aligned = (graph_left - alt_left).abs() < self.align_tolerance;
        }

        if self.aligned {
            // Visually stacked: mirror the graph panel's own state, no
            // independent toggle logic needed.
            self.overlay_wanted = obs.graph_displayed
                && obs.graph_opacity.map(|o| o >= OVERLAY_OPACITY_FLOOR).unwrap_or(true);
        } else {
            if graph_visible && alt_visible && self.can_change {
                self.overlay_wanted = !self.overlay_wanted;
                self.can_change = false;
            }
            if !graph_visible && alt_visible && self.overlay_wanted {
                self.overlay_wanted = false;
            } else if graph_visible && !alt_visible && !self.overlay_wanted {
                self.overlay_wanted = true;
            }
        }

        if self.last_observed != Some(self.overlay_wanted) {
            self.last_observed = Some(self.overlay_wanted);
            // Every state change restarts the debounce clock.
            self.debounce_started = Some(now);

            let target = if self.overlay_wanted && self.graph_ready {
                Mount::Overlay
            } else {
                Mount::Inline
            };
            self.transition(target, now, host);
        }
    }

    /// Perform the animated reparent; a no-op when already mounted there.
    fn transition<H: MountSurface>(&mut self, target: Mount, now: Instant, host: &mut H) {
        if target == self.mounted {
            return;
        }

        if let Some(prev) = self.last_flip {
            debug!(
                "mount flip after {:?} in previous state",
                now.duration_since(prev)
            );
        }
        self.last_flip = Some(now);
        self.mounted = target;
        info!("meter mount -> {:?}", target);

        match target {
            Mount::Overlay => {
                host.fade_out();
                host.mount_overlay(
                    OVERLAY_TOP_PX,
                    OVERLAY_LEFT_PX + self.placement.rotator_offset_px,
                );
                host.fade_in(true);
                host.set_backdrop(true);
            }
            Mount::Inline => {
                host.fade_out();
                host.mount_inline(INLINE_RESTORE_DELAY);
                host.set_backdrop(false);
                if !self.placement.hide_until_overlay {
                    host.fade_in(false);
                }
            }
        }
    }
}

/// Log the one-time diagnostic for a missing inline anchor. The caller
/// leaves the widget unmounted afterwards.
pub fn report_missing_anchor() {
    warn!("no signal panel found; meter stays unmounted");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::CanvasStyle;

    #[derive(Default)]
    struct RecordingHost {
        mounts: Vec<&'static str>,
    }

    impl MountSurface for RecordingHost {
        fn fade_out(&mut self) {
            self.mounts.push("fade_out");
        }
        fn mount_overlay(&mut self, _top_px: i32, _left_px: i32) {
            self.mounts.push("overlay");
        }
        fn mount_inline(&mut self, _restore_delay: Duration) {
            self.mounts.push("inline");
        }
        fn fade_in(&mut self, _scale_up: bool) {
            self.mounts.push("fade_in");
        }
        fn set_backdrop(&mut self, _on: bool) {}
        fn set_opacity(&mut self, _opacity: f32) {}
        fn apply_style(&mut self, _style: &CanvasStyle) {}
    }

    fn relocating() -> ResolvedPlacement {
        ResolvedPlacement {
            use_peakmeter: false,
            outside_field: true,
            relocation: true,
            rotator_offset_px: 0,
            hide_until_overlay: false,
            top_offset_px: 0,
        }
    }

    fn obs(graph: f32, alt: f32, graph_left: f32, alt_left: f32) -> PanelObservation {
        PanelObservation {
            graph_opacity: Some(graph),
            alt_canvas_opacity: Some(alt),
            graph_left: Some(graph_left),
            alt_canvas_left: Some(alt_left),
            graph_displayed: graph > 0.0,
        }
    }

    fn ready_machine(now: Instant) -> (PlacementStateMachine, RecordingHost) {
        let mut machine = PlacementStateMachine::new(relocating());
        let mut host = RecordingHost::default();
        // Graph hidden while the signal canvas shows: sets the ready latch
        machine.observe(&obs(0.0, 1.0, 0.0, 400.0), now, &mut host);
        (machine, host)
    }

    #[test]
    fn test_unaligned_burst_toggles_once() {
        let t0 = Instant::now();
        let (mut machine, mut host) = ready_machine(t0);
        host.mounts.clear();

        // Both panels visible, unaligned: exactly one toggle
        machine.observe(&obs(1.0, 1.0, 0.0, 400.0), t0, &mut host);
        assert_eq!(machine.mounted(), Mount::Overlay);
        let flips = host.mounts.iter().filter(|m| **m == "overlay").count();
        assert_eq!(flips, 1);

        // 100 ms later, another qualifying notification: no further toggle
        machine.observe(&obs(1.0, 1.0, 0.0, 400.0), t0 + Duration::from_millis(100), &mut host);
        assert_eq!(machine.mounted(), Mount::Overlay);
        assert_eq!(host.mounts.iter().filter(|m| **m == "inline").count(), 0);

        // 500 ms later the window has passed and a toggle may occur again
        machine.observe(&obs(1.0, 1.0, 0.0, 400.0), t0 + Duration::from_millis(500), &mut host);
        assert_eq!(machine.mounted(), Mount::Inline);
    }

    #[test]
    fn test_flips_respect_debounce_spacing() {
        let t0 = Instant::now();
        let (mut machine, mut host) = ready_machine(t0);

        let mut flip_times = Vec::new();
        for ms in (0..2000).step_by(50) {
            let now = t0 + Duration::from_millis(ms);
            let before = machine.mounted();
            machine.observe(&obs(1.0, 1.0, 0.0, 400.0), now, &mut host);
            if machine.mounted() != before {
                flip_times.push(now);
            }
        }
        assert!(flip_times.len() >= 2);
        for pair in flip_times.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= PLACEMENT_DEBOUNCE);
        }
    }

    #[test]
    fn test_single_visible_forces_deterministically() {
        let t0 = Instant::now();
        let (mut machine, mut host) = ready_machine(t0);

        // Graph alone visible with the ready latch set: overlay
        machine.observe(&obs(1.0, 0.0, 0.0, 400.0), t0 + Duration::from_secs(1), &mut host);
        assert_eq!(machine.mounted(), Mount::Overlay);

        // Signal canvas alone visible: inline
        machine.observe(&obs(0.0, 1.0, 0.0, 400.0), t0 + Duration::from_secs(2), &mut host);
        assert_eq!(machine.mounted(), Mount::Inline);
    }

    #[test]
    fn test_overlay_waits_for_ready_latch() {
        let t0 = Instant::now();
        let mut machine = PlacementStateMachine::new(relocating());
        let mut host = RecordingHost::default();

        // Graph visible from the very first observation: latch never set,
        // so the mount stays inline even though overlay is wanted.
        machine.observe(&obs(1.0, 0.0, 0.0, 400.0), t0, &mut host);
        assert_eq!(machine.mounted(), Mount::Inline);
    }

    #[test]
    fn test_aligned_mirrors_graph_state() {
        let t0 = Instant::now();
        let (mut machine, mut host) = ready_machine(t0);

        // Stacked panels (left edges within tolerance): mirror directly
        machine.observe(&obs(1.0, 1.0, 100.0, 100.4), t0 + Duration::from_secs(1), &mut host);
        assert_eq!(machine.mounted(), Mount::Overlay);

        // Graph dims below the opacity floor: hidden even while displayed
        machine.observe(&obs(0.3, 1.0, 100.0, 100.4), t0 + Duration::from_secs(2), &mut host);
        assert_eq!(machine.mounted(), Mount::Inline);
    }

    #[test]
    fn test_missing_geometry_keeps_last_verdict() {
        let t0 = Instant::now();
        let (mut machine, mut host) = ready_machine(t0);

        machine.observe(&obs(1.0, 1.0, 100.0, 100.4), t0 + Duration::from_secs(1), &mut host);
        assert_eq!(machine.mounted(), Mount::Overlay);

        // Geometry briefly unavailable: still treated as aligned, so the
        // mount keeps mirroring instead of toggling
        let partial = PanelObservation {
            graph_opacity: Some(1.0),
            alt_canvas_opacity: Some(1.0),
            graph_left: None,
            alt_canvas_left: None,
            graph_displayed: true,
        };
        machine.observe(&partial, t0 + Duration::from_secs(2), &mut host);
        assert_eq!(machine.mounted(), Mount::Overlay);
    }

    #[test]
    fn test_relocation_disabled_ignores_observations() {
        let t0 = Instant::now();
        let placement = ResolvedPlacement { relocation: false, ..relocating() };
        let mut machine = PlacementStateMachine::new(placement);
        let mut host = RecordingHost::default();
        machine.observe(&obs(0.0, 1.0, 0.0, 400.0), t0, &mut host);
        machine.observe(&obs(1.0, 1.0, 0.0, 400.0), t0 + Duration::from_secs(1), &mut host);
        assert_eq!(machine.mounted(), Mount::Inline);
        assert!(host.mounts.is_empty());
    }

    #[test]
    fn test_resolve_location_precedence() {
        let both = PanelInventory { signal: true, peakmeter: true, graph: true, legacy: false };
        let no_peak = PanelInventory { signal: true, peakmeter: false, graph: true, legacy: false };

        // Peak-meter panel captures auto placement and disables relocation
        let captured = resolve_location(MeterLocation::Auto, true, both, (1280, 800), None);
        assert!(captured.use_peakmeter);
        assert!(!captured.relocation);
        assert_eq!(captured.top_offset_px, PEAKMETER_TOP_PX);

        // Graph modes never consult the peak-meter panel
        let graph = resolve_location(MeterLocation::SdrGraph, true, both, (1280, 800), None);
        assert!(!graph.use_peakmeter);
        assert!(graph.relocation);

        // The persisted toggle demotes auto to graph placement
        let demoted = resolve_location(MeterLocation::Auto, true, no_peak, (1280, 800), Some("false"));
        assert!(demoted.relocation);
        assert!(!demoted.hide_until_overlay);

        // Narrow portrait host degrades graph-only to auto
        let narrow =
            resolve_location(MeterLocation::SdrGraphOnly, true, no_peak, (400, 700), None);
        assert!(!narrow.hide_until_overlay);

        // Auto-rotator is auto plus the overlay offset
        let rotator = resolve_location(MeterLocation::AutoRotator, true, no_peak, (1280, 800), None);
        assert_eq!(rotator.rotator_offset_px, ROTATOR_OFFSET_PX);
        assert!(rotator.relocation);

        // Forced signal placement never relocates
        let fixed = resolve_location(MeterLocation::Signal, true, no_peak, (1280, 800), None);
        assert!(!fixed.relocation);
    }
}
