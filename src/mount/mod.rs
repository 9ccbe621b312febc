// SkyTrack — aiming a telescope at aircraft and celestial targets
// Copyright (C) 2025 SkyTrack developers
//
// This file is part of SkyTrack
//
// SkyTrack is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License version 3
// as published by the Free Software Foundation.
//
// SkyTrack is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with SkyTrack.  If not, see <http://www.gnu.org/licenses/>.
//

mod simulator;
mod webscope;

use std::error::Error;

pub use simulator::SimScope;
pub use webscope::WebScope;

/// Interface to the motorized mount. All angles and rates are degrees and
/// degrees per second.
pub trait ScopeDriver {
    fn get_info(&self) -> String;

    #[must_use]
    fn slew_to_altaz_deg(&mut self, alt: f64, az: f64) -> Result<(), Box<dyn Error>>;

    /// Returns the currently driven (altitude, azimuth) motor angles.
    #[must_use]
    fn get_altaz_deg(&mut self) -> Result<(f64, f64), Box<dyn Error>>;

    #[must_use]
    fn slew_rate_alt_deg(&mut self, rate: f64) -> Result<(), Box<dyn Error>>;

    #[must_use]
    fn slew_rate_az_deg(&mut self, rate: f64) -> Result<(), Box<dyn Error>>;

    #[must_use]
    fn slew_rate_deg(&mut self, alt_rate: f64, az_rate: f64) -> Result<(), Box<dyn Error>>;

    #[must_use]
    fn is_slewing(&mut self) -> Result<bool, Box<dyn Error>>;
}
