/*
 *  lib.rs
 *
 *  SMeterS - every dB counts
 *	(c) 2024-26 SMeterS contributors
 *
 *	Compact S-meter widget for FM-DX dashboards: a 256x13 bitmap scale
 *	with peak and needle, a draggable squelch threshold, and reactive
 *	placement between the host's signal panel and its graph overlay.
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

pub mod canvas;
pub mod config;
pub mod constants;
pub mod draw;
pub mod host;
pub mod layout;
pub mod meter;
pub mod placement;
pub mod sampler;
pub mod simhost;
pub mod squelch;
pub mod theme;
pub mod updates;
pub mod widget;

pub use canvas::WidgetCanvas;
pub use config::{Config, ConfigError, Overrides};
pub use host::{Host, HostEvent, PanelObservation, PointerEvent};
pub use meter::{MeterGeometry, MeterRenderer};
pub use placement::{MeterLocation, Mount, PlacementStateMachine};
pub use sampler::{SignalSample, SignalSampler};
pub use simhost::SimHost;
pub use squelch::SquelchController;
pub use widget::{SMeter, WidgetOptions};
