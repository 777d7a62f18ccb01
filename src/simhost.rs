/*
 *  simhost.rs
 *
 *  SMeterS - every dB counts
 *	(c) 2024-26 SMeterS contributors
 *
 *	A simulated dashboard implementing the host boundary, for desktop
 *	runs and integration tests. Telemetry, panels, and volume are all
 *	scriptable; preferences can persist to a JSON file so visibility
 *	survives re-initialization like it would in a real host.
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

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};

use crate::constants::{CANVAS_WIDTH, PREF_SIGNAL_UNIT};
use crate::host::{
    AudioControl, HostPanels, MountSurface, PanelInventory, PanelObservation, PrefStore,
    Telemetry, TelemetryField, ThemeColors,
};
use crate::layout::CanvasStyle;

#[derive(Debug, Default)]
struct SimState {
    // telemetry text fields, exactly as a host document would render them
    signal: Option<String>,
    fraction: Option<String>,
    peak: Option<String>,
    frequency: Option<String>,

    prefs: HashMap<String, String>,
    prefs_path: Option<PathBuf>,

    volume: f32,
    desired_volume: Option<f32>,
    playback_starting: bool,

    inventory: PanelInventory,
    theme: ThemeColors,
    window: (u32, u32),

    // panel state the placement machine observes
    graph_opacity: Option<f32>,
    alt_canvas_opacity: Option<f32>,
    graph_left: Option<f32>,
    alt_canvas_left: Option<f32>,
    graph_displayed: bool,

    // applied widget output, inspectable by tests
    style: Option<CanvasStyle>,
    opacity: f32,
    backdrop: bool,
    mount_log: Vec<String>,
    notices: Vec<String>,
}

/// Shared-handle simulated host. Clones share one state so a driver task
/// can script the dashboard while the widget consumes it.
#[derive(Clone)]
pub struct SimHost {
    state: Arc<Mutex<SimState>>,
}

impl SimHost {
    pub fn new() -> Self {
        let state = SimState {
            signal: Some("0".to_string()),
            fraction: Some("0".to_string()),
            peak: Some("0".to_string()),
            frequency: Some("98.1".to_string()),
            volume: 1.0,
            desired_volume: Some(1.0),
            inventory: PanelInventory { signal: true, peakmeter: false, graph: true, legacy: false },
            theme: ThemeColors {
                text: Some("rgb(255, 255, 255)".to_string()),
                ..ThemeColors::default()
            },
            window: (1280, 800),
            graph_opacity: Some(0.0),
            alt_canvas_opacity: Some(1.0),
            graph_left: Some(0.0),
            alt_canvas_left: Some(400.0),
            opacity: 1.0,
            ..SimState::default()
        };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // a panicked scripting task must not take the whole host down
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Persist preferences at `path`, loading whatever is already there.
    pub fn with_pref_file(self, path: PathBuf) -> Self {
        {
            let mut state = self.lock();
            if let Ok(text) = std::fs::read_to_string(&path) {
                match serde_json::from_str::<HashMap<String, String>>(&text) {
                    Ok(saved) => state.prefs.extend(saved),
                    Err(e) => warn!("ignoring unreadable preference file: {}", e),
                }
            }
            state.prefs_path = Some(path);
        }
        self
    }

    // --- scripting surface -------------------------------------------------

    pub fn set_signal(&self, whole: &str, fraction: &str, peak: &str) {
        let mut state = self.lock();
        state.signal = Some(whole.to_string());
        state.fraction = Some(fraction.to_string());
        state.peak = Some(peak.to_string());
    }

    pub fn set_frequency(&self, mhz: &str) {
        self.lock().frequency = Some(mhz.to_string());
    }

    pub fn set_unit(&self, unit: &str) {
        self.lock().prefs.insert(PREF_SIGNAL_UNIT.to_string(), unit.to_string());
    }

    pub fn set_inventory(&self, inventory: PanelInventory) {
        self.lock().inventory = inventory;
    }

    pub fn set_window(&self, width: u32, height: u32) {
        self.lock().window = (width, height);
    }

    pub fn set_theme(&self, theme: ThemeColors) {
        self.lock().theme = theme;
    }

    pub fn set_playback_starting(&self, starting: bool) {
        self.lock().playback_starting = starting;
    }

    pub fn set_desired_volume(&self, desired: f32) {
        let mut state = self.lock();
        state.desired_volume = Some(desired);
        state.volume = desired;
    }

    pub fn set_graph_panel(&self, opacity: f32, displayed: bool) {
        let mut state = self.lock();
        state.graph_opacity = Some(opacity);
        state.graph_displayed = displayed;
    }

    pub fn set_alt_canvas(&self, opacity: f32) {
        self.lock().alt_canvas_opacity = Some(opacity);
    }

    pub fn set_panel_lefts(&self, graph: Option<f32>, alt: Option<f32>) {
        let mut state = self.lock();
        state.graph_left = graph;
        state.alt_canvas_left = alt;
    }

    /// Snapshot the current panel state as one mutation notification.
    pub fn observation(&self) -> PanelObservation {
        let state = self.lock();
        PanelObservation {
            graph_opacity: state.graph_opacity,
            alt_canvas_opacity: state.alt_canvas_opacity,
            graph_left: state.graph_left,
            alt_canvas_left: state.alt_canvas_left,
            graph_displayed: state.graph_displayed,
        }
    }

    // --- inspection --------------------------------------------------------

    pub fn current_volume(&self) -> f32 {
        self.lock().volume
    }

    pub fn applied_style(&self) -> Option<CanvasStyle> {
        self.lock().style
    }

    pub fn opacity(&self) -> f32 {
        self.lock().opacity
    }

    pub fn backdrop(&self) -> bool {
        self.lock().backdrop
    }

    pub fn mount_log(&self) -> Vec<String> {
        self.lock().mount_log.clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.lock().notices.clone()
    }

    fn persist_prefs(state: &SimState) {
        let Some(path) = state.prefs_path.as_ref() else { return };
        match serde_json::to_string_pretty(&state.prefs) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    warn!("preference write failed: {}", e);
                }
            }
            Err(e) => warn!("preference serialization failed: {}", e),
        }
    }
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry for SimHost {
    fn read(&self, field: TelemetryField) -> Option<String> {
        let state = self.lock();
        match field {
            TelemetryField::Signal => state.signal.clone(),
            TelemetryField::SignalFraction => state.fraction.clone(),
            TelemetryField::Peak => state.peak.clone(),
            TelemetryField::Frequency => state.frequency.clone(),
        }
    }
}

impl AudioControl for SimHost {
    fn volume(&self) -> f32 {
        self.lock().volume
    }

    fn set_volume(&mut self, value: f32) {
        self.lock().volume = value;
    }

    fn desired_volume(&self) -> Option<f32> {
        self.lock().desired_volume
    }

    fn playback_starting(&self) -> bool {
        self.lock().playback_starting
    }
}

impl PrefStore for SimHost {
    fn get_pref(&self, key: &str) -> Option<String> {
        self.lock().prefs.get(key).cloned()
    }

    fn set_pref(&mut self, key: &str, value: &str) {
        let mut state = self.lock();
        state.prefs.insert(key.to_string(), value.to_string());
        Self::persist_prefs(&state);
    }
}

impl HostPanels for SimHost {
    fn inventory(&self) -> PanelInventory {
        self.lock().inventory
    }

    fn window_size(&self) -> (u32, u32) {
        self.lock().window
    }

    fn canvas_css_width(&self) -> f32 {
        let state = self.lock();
        let container = state.window.0 as f32 / 3.0;
        state
            .style
            .map(|s| s.css_width_px(container))
            .unwrap_or(CANVAS_WIDTH as f32)
    }

    fn theme(&self) -> ThemeColors {
        self.lock().theme.clone()
    }

    fn notice(&mut self, text: &str) {
        self.lock().notices.push(text.to_string());
    }
}

impl MountSurface for SimHost {
    fn fade_out(&mut self) {
        self.lock().mount_log.push("fade_out".to_string());
    }

    fn mount_overlay(&mut self, top_px: i32, left_px: i32) {
        let mut state = self.lock();
        debug!("sim: overlay mount at {},{}", top_px, left_px);
        state.mount_log.push(format!("overlay@{top_px},{left_px}"));
    }

    fn mount_inline(&mut self, _restore_delay: Duration) {
        self.lock().mount_log.push("inline".to_string());
    }

    fn fade_in(&mut self, scale_up: bool) {
        self.lock().mount_log.push(format!("fade_in(scale={scale_up})"));
    }

    fn set_backdrop(&mut self, on: bool) {
        self.lock().backdrop = on;
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.lock().opacity = opacity;
    }

    fn apply_style(&mut self, style: &CanvasStyle) {
        self.lock().style = Some(*style);
    }
}
