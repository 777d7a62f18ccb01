/*
 *  widget.rs
 *
 *  SMeterS - every dB counts
 *	(c) 2024-26 SMeterS contributors
 *
 *	The widget context: one object owning sampler, renderer, squelch
 *	controller, placement machine, and the canvas pair, with the tick
 *	entry points and the async run loop that multiplexes them.
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

use std::time::Instant;

use log::{debug, info};
use tokio::sync::mpsc::Receiver;

use crate::canvas::WidgetCanvas;
use crate::config::Config;
use crate::constants::{CANVAS_HEIGHT, CANVAS_WIDTH, RENDER_TICK, SQUELCH_TICK};
use crate::host::{Host, HostEvent, PanelObservation, PointerEvent};
use crate::layout::compute_style;
use crate::meter::{MeterRenderer, NeedlePositions};
use crate::placement::{
    peakmeter_pref, report_missing_anchor, resolve_location, Mount, MeterLocation,
    PlacementStateMachine,
};
use crate::sampler::SignalSampler;
use crate::squelch::SquelchController;
use crate::theme::{needs_inversion, parse_css_color, MeterPalette};

/// The widget tunables, snapshotted from config at construction so
/// `reset()` can re-initialize without re-reading anything.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetOptions {
    pub outside_field: bool,
    pub enable_squelch: bool,
    pub use_theme_colors: bool,
    pub noise_floor_dbm: Option<f32>,
    pub am_offset: bool,
    pub location: MeterLocation,
}

impl From<&Config> for WidgetOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            outside_field: cfg.outside_field(),
            enable_squelch: cfg.enable_squelch(),
            use_theme_colors: cfg.use_theme_colors(),
            noise_floor_dbm: cfg.noise_floor(),
            am_offset: cfg.am_offset(),
            location: cfg.location(),
        }
    }
}

/// The widget-lifetime context. Each component owns disjoint state; the
/// only cross-component value is the last drawn needle position, handed
/// from the render tick to the squelch tick.
pub struct SMeter<H: Host> {
    host: H,
    options: WidgetOptions,
    sampler: SignalSampler,
    renderer: MeterRenderer,
    squelch: SquelchController,
    placement: PlacementStateMachine,
    meter_canvas: WidgetCanvas,
    marker_canvas: WidgetCanvas,
    palette: MeterPalette,
    last_positions: Option<NeedlePositions>,
    /// Latest observed graph-panel visibility, for the responsive layout.
    graph_visible: bool,
    /// False when the inline anchor panel was never found: the widget
    /// stays unmounted and every entry point is a no-op.
    anchored: bool,
    legacy_host: bool,
}

impl<H: Host> SMeter<H> {
    pub fn new(options: WidgetOptions, host: H) -> Self {
        let renderer = MeterRenderer::new(options.noise_floor_dbm, options.am_offset);
        let squelch = SquelchController::new(options.enable_squelch, renderer.geometry());
        let placement = PlacementStateMachine::new(resolve_location(
            options.location,
            options.outside_field,
            Default::default(),
            (0, 0),
            None,
        ));
        let mut widget = Self {
            host,
            options,
            sampler: SignalSampler::new(options.am_offset),
            renderer,
            squelch,
            placement,
            meter_canvas: WidgetCanvas::new(CANVAS_WIDTH, CANVAS_HEIGHT),
            marker_canvas: WidgetCanvas::new(CANVAS_WIDTH, CANVAS_HEIGHT),
            palette: MeterPalette::default(),
            last_positions: None,
            graph_visible: false,
            anchored: false,
            legacy_host: false,
        };
        widget.initialize();
        widget
    }

    /// (Re-)initialize against the current host document. Also the body
    /// of `reset()`.
    fn initialize(&mut self) {
        let inventory = self.host.inventory();
        self.legacy_host = inventory.legacy;

        // The graph element stands in for the signal panel in graph-only
        // mode; with neither present there is nowhere to mount.
        self.anchored = inventory.signal
            || (self.options.location == MeterLocation::SdrGraphOnly && inventory.graph);
        if !self.anchored {
            report_missing_anchor();
            return;
        }

        let pref = peakmeter_pref(&self.host, self.options.location);
        let resolved = resolve_location(
            self.options.location,
            self.options.outside_field,
            inventory,
            self.host.window_size(),
            pref.as_deref(),
        );
        debug!("placement resolved: {:?}", resolved);

        self.sampler = SignalSampler::new(self.options.am_offset);
        self.renderer = MeterRenderer::new(self.options.noise_floor_dbm, self.options.am_offset);
        self.placement = PlacementStateMachine::new(resolved);
        self.squelch = SquelchController::new(self.options.enable_squelch, self.renderer.geometry());
        self.squelch.restore_visibility(&mut self.host);
        if resolved.hide_until_overlay {
            self.host.set_opacity(0.0);
        }
        self.last_positions = None;
        self.graph_visible = false;

        info!(
            "meter initialized ({}x{}, squelch {})",
            CANVAS_WIDTH,
            CANVAS_HEIGHT,
            if self.options.enable_squelch { "on" } else { "off" }
        );
    }

    /// Tear down per-session state and re-run initialization, instead of
    /// relying on a host page reload.
    pub fn reset(&mut self) {
        info!("meter reset requested");
        self.initialize();
    }

    /// Render tick: sample fully, then draw. A NaN sample skips the draw
    /// and the previous frame persists.
    pub fn render_tick(&mut self) {
        if !self.anchored {
            return;
        }

        // Responsive layout first, so this tick draws into a correctly
        // sized canvas footprint.
        let style = compute_style(
            self.host.window_size(),
            self.graph_visible,
            self.placement.resolved(),
            self.legacy_host,
        );
        self.host.apply_style(&style);
        self.squelch.set_css_width(self.host.canvas_css_width());

        let mut invert = false;
        if self.options.use_theme_colors {
            let theme = self.host.theme();
            self.palette = MeterPalette::from_theme(&theme);
            invert = theme
                .text
                .as_deref()
                .and_then(parse_css_color)
                .map(needs_inversion)
                .unwrap_or(false);
        }

        let sample = self.sampler.sample(&self.host);
        if !sample.is_drawable() {
            debug!("non-numeric telemetry, frame kept");
            return;
        }

        let positions = self
            .renderer
            .draw(&mut self.meter_canvas, &sample, &self.palette, invert);
        self.last_positions = Some(positions);
        self.squelch.draw_marker(&mut self.marker_canvas, &self.palette);
    }

    /// Squelch tick: evaluates against the most recently drawn needle,
    /// which may be up to one render tick stale.
    pub fn squelch_tick(&mut self) {
        if !self.anchored {
            return;
        }
        let needle_px = self
            .last_positions
            .map(|p| p.needle_px)
            .unwrap_or(self.renderer.geometry().marker_min());
        self.squelch.evaluate(needle_px, &mut self.host);
    }

    /// One host mutation notification.
    pub fn observe(&mut self, obs: PanelObservation) {
        self.observe_at(obs, Instant::now());
    }

    pub fn observe_at(&mut self, obs: PanelObservation, now: Instant) {
        if !self.anchored {
            return;
        }
        self.graph_visible = obs.graph_opacity.map(|o| o > 0.0).unwrap_or(false);
        self.placement.observe(&obs, now, &mut self.host);
    }

    /// One pointer event over the marker canvas.
    pub fn pointer(&mut self, event: PointerEvent) {
        if !self.anchored {
            return;
        }
        if self.squelch.pointer(event, &mut self.host) {
            self.squelch.draw_marker(&mut self.marker_canvas, &self.palette);
        }
    }

    pub fn mounted(&self) -> Mount {
        self.placement.mounted()
    }

    pub fn squelch_active(&self) -> bool {
        self.squelch.is_active()
    }

    pub fn marker_position_px(&self) -> f32 {
        self.squelch.marker().position_px
    }

    pub fn last_needle_px(&self) -> Option<f32> {
        self.last_positions.map(|p| p.needle_px)
    }

    pub fn meter_canvas(&self) -> &WidgetCanvas {
        &self.meter_canvas
    }

    pub fn marker_canvas(&self) -> &WidgetCanvas {
        &self.marker_canvas
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Drive the widget until the host event channel closes. Single
    /// threaded and cooperative: ticks and events interleave, nothing
    /// blocks, and each arm runs to completion before the next.
    pub async fn run(mut self, mut events: Receiver<HostEvent>) {
        let mut render = tokio::time::interval(RENDER_TICK);
        let mut squelch = tokio::time::interval(SQUELCH_TICK);

        loop {
            tokio::select! {
                _ = render.tick() => self.render_tick(),
                _ = squelch.tick() => self.squelch_tick(),
                event = events.recv() => match event {
                    Some(HostEvent::Pointer(p)) => self.pointer(p),
                    Some(HostEvent::Mutation(o)) => self.observe(o),
                    Some(HostEvent::WindowResized { width, height }) => {
                        debug!("host window resized to {}x{}", width, height);
                        // The next render tick re-applies the layout.
                    }
                    None => {
                        info!("host event channel closed, meter loop ending");
                        break;
                    }
                },
            }
        }
    }
}
