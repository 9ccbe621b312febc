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

use super::ScopeDriver;
use std::error::Error;

/// In-process mount that is always exactly where it was told to go; stands
/// in for the real scope in tests and dry runs.
pub struct SimScope {
    alt: f64,
    az: f64,
    alt_rate: f64,
    az_rate: f64,
}

impl SimScope {
    pub fn new() -> SimScope {
        SimScope { alt: 0.0, az: 0.0, alt_rate: 0.0, az_rate: 0.0 }
    }

    pub fn rates(&self) -> (f64, f64) {
        (self.alt_rate, self.az_rate)
    }
}

impl Default for SimScope {
    fn default() -> SimScope {
        SimScope::new()
    }
}

impl ScopeDriver for SimScope {
    fn get_info(&self) -> String {
        "simulated mount".to_string()
    }

    fn slew_to_altaz_deg(&mut self, alt: f64, az: f64) -> Result<(), Box<dyn Error>> {
        log::debug!("simulated slew to alt {:.3}°, az {:.3}°", alt, az);
        self.alt = alt;
        self.az = az;
        Ok(())
    }

    fn get_altaz_deg(&mut self) -> Result<(f64, f64), Box<dyn Error>> {
        Ok((self.alt, self.az))
    }

    fn slew_rate_alt_deg(&mut self, rate: f64) -> Result<(), Box<dyn Error>> {
        self.alt_rate = rate;
        Ok(())
    }

    fn slew_rate_az_deg(&mut self, rate: f64) -> Result<(), Box<dyn Error>> {
        self.az_rate = rate;
        Ok(())
    }

    fn slew_rate_deg(&mut self, alt_rate: f64, az_rate: f64) -> Result<(), Box<dyn Error>> {
        self.alt_rate = alt_rate;
        self.az_rate = az_rate;
        Ok(())
    }

    fn is_slewing(&mut self) -> Result<bool, Box<dyn Error>> {
        Ok(false)
    }
}
