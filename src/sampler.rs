/*
 *  sampler.rs
 *
 *  SMeterS - every dB counts
 *	(c) 2024-26 SMeterS contributors
 *
 *	Reads host telemetry text once per render tick and normalizes it
 *	into a unit-consistent signal sample.
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

use crate::constants::{
    AM_CUTOFF_MHZ, AM_FULL_MHZ, AM_OFFSET_MAX_DB, AM_OFFSET_MIN_DB, DBM_UNIT_OFFSET,
    DBUV_UNIT_OFFSET, PREF_SIGNAL_UNIT,
};
use crate::host::{PrefStore, Telemetry, TelemetryField};

/// Frequency assumed when the host has no frequency field yet.
const DEFAULT_FREQUENCY_MHZ: f32 = 87.5;

/// Which unit the host reports signal levels in, from the persisted
/// `signalUnit` preference. Anything unrecognized reads as the canonical
/// unit and gets no offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalUnit {
    Dbm,
    Dbuv,
    #[default]
    Dbf,
}

impl SignalUnit {
    pub fn from_pref(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("dbm") => SignalUnit::Dbm,
            Some("dbuv") => SignalUnit::Dbuv,
            _ => SignalUnit::Dbf,
        }
    }

    /// Additive correction bringing a reading into the canonical unit.
    pub fn offset_db(self) -> f32 {
        match self {
            SignalUnit::Dbm => DBM_UNIT_OFFSET,
            SignalUnit::Dbuv => DBUV_UNIT_OFFSET,
            SignalUnit::Dbf => 0.0,
        }
    }
}

/// One render tick's worth of normalized telemetry. Ephemeral; rebuilt
/// every tick, never persisted.
#[derive(Debug, Clone, Copy)]
pub struct SignalSample {
    /// Instantaneous level in the canonical unit. NaN when telemetry was
    /// non-numeric this tick.
    pub strength_db: f32,
    /// Peak level in the canonical unit; NaN under the same conditions.
    pub peak_db: f32,
    pub frequency_mhz: f32,
    pub at: Instant,
}

impl SignalSample {
    /// A NaN sample must not be drawn; the previous frame persists.
    pub fn is_drawable(&self) -> bool {
        !self.strength_db.is_nan() && !self.peak_db.is_nan()
    }
}

/// Parse a telemetry text field the way the host renders them: optional
/// sign, leading numeric prefix, trailing junk ignored. Yields NaN rather
/// than an error; NaN is this module's "not a reading" value.
fn parse_telemetry(text: &str) -> f32 {
    let text = text.trim();
    let mut end = 0usize;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, ch) in text.char_indices() {
        match ch {
            '+' | '-' if i == 0 => end = i + 1,
            '0'..='9' => {
                seen_digit = true;
                end = i + 1;
            }
            '.' if !seen_dot => {
                seen_dot = true;
                end = i + 1;
            }
            _ => break,
        }
    }
    if !seen_digit {
        return f32::NAN;
    }
    text[..end].parse::<f32>().unwrap_or(f32::NAN)
}

/// Piecewise-linear AM correction: full offset at and below `AM_FULL_MHZ`,
/// tapering linearly to the minimum at the cutoff.
fn am_offset_db(frequency_mhz: f32) -> f32 {
    if frequency_mhz <= AM_FULL_MHZ {
        AM_OFFSET_MAX_DB
    } else {
        let t = (frequency_mhz - AM_FULL_MHZ) / (AM_CUTOFF_MHZ - AM_FULL_MHZ);
        AM_OFFSET_MAX_DB - t * (AM_OFFSET_MAX_DB - AM_OFFSET_MIN_DB)
    }
}

/// Per-tick telemetry reader.
#[derive(Debug, Clone, Copy)]
pub struct SignalSampler {
    /// Apply the below-cutoff AM correction to both readings.
    pub am_offset: bool,
}

impl SignalSampler {
    pub fn new(am_offset: bool) -> Self {
        Self { am_offset }
    }

    /// Read and normalize the current telemetry. Missing fields read as
    /// zero (the host simply has not populated them yet); non-numeric
    /// fields poison the sample with NaN.
    pub fn sample<H>(&self, host: &H) -> SignalSample
    where
        H: Telemetry + PrefStore,
    {
        let unit = SignalUnit::from_pref(host.get_pref(PREF_SIGNAL_UNIT).as_deref());

        let whole_text = host
            .read(TelemetryField::Signal)
            .unwrap_or_else(|| "0".to_string());
        let fraction_text = host
            .read(TelemetryField::SignalFraction)
            .unwrap_or_else(|| "0".to_string());
        let peak_text = host
            .read(TelemetryField::Peak)
            .unwrap_or_else(|| "0".to_string());

        let whole = parse_telemetry(&whole_text);
        let fraction = parse_telemetry(&fraction_text);
        // The fraction field is unsigned; it extends the whole part away
        // from zero.
        let mut strength_db = if whole >= 0.0 { whole + fraction } else { whole - fraction };
        strength_db += unit.offset_db();

        let mut peak_db = parse_telemetry(&peak_text) + unit.offset_db();

        let frequency_mhz = host
            .read(TelemetryField::Frequency)
            .map(|t| parse_telemetry(&t))
            .filter(|f| !f.is_nan())
            .unwrap_or(DEFAULT_FREQUENCY_MHZ);

        if self.am_offset && frequency_mhz <= AM_CUTOFF_MHZ {
            let offset = am_offset_db(frequency_mhz);
            strength_db -= offset;
            peak_db -= offset;
        }

        SignalSample {
            strength_db,
            peak_db,
            frequency_mhz,
            at: Instant::now(),
        }
    }
}
