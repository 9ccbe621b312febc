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
use std::time::Duration;

/// ASCOM-Alpaca telescope over HTTP.
///
/// `compliant` selects the standard per-axis position endpoints; some
/// bridges expose a combined non-standard `altaz` resource instead.
pub struct WebScope {
    endpoint: String,
    compliant: bool,
    client: reqwest::blocking::Client,
}

fn value_of(json: &serde_json::Value, key: &str) -> Result<f64, Box<dyn Error>> {
    json.get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| format!("mount response has no numeric {}", key).into())
}

impl WebScope {
    pub fn new(endpoint: &str, compliant: bool) -> Result<WebScope, Box<dyn Error>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;
        Ok(WebScope {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            compliant,
            client,
        })
    }

    fn put(&self, resource: &str, form: &[(&str, String)]) -> Result<(), Box<dyn Error>> {
        self.client
            .put(format!("{}/{}", self.endpoint, resource))
            .form(form)
            .send()?
            .error_for_status()?;
        Ok(())
    }

    fn get_json(&self, resource: &str) -> Result<serde_json::Value, Box<dyn Error>> {
        Ok(self
            .client
            .get(format!("{}/{}", self.endpoint, resource))
            .send()?
            .error_for_status()?
            .json()?)
    }
}

impl ScopeDriver for WebScope {
    fn get_info(&self) -> String {
        format!("Alpaca telescope at {}", self.endpoint)
    }

    fn slew_to_altaz_deg(&mut self, alt: f64, az: f64) -> Result<(), Box<dyn Error>> {
        self.put(
            "slewtoaltazasync",
            &[("Altitude", alt.to_string()), ("Azimuth", az.to_string())],
        )
    }

    fn get_altaz_deg(&mut self) -> Result<(f64, f64), Box<dyn Error>> {
        if self.compliant {
            let alt = value_of(&self.get_json("altitude")?, "Value")?;
            let az = value_of(&self.get_json("azimuth")?, "Value")?;
            Ok((alt, az))
        } else {
            let both = self.get_json("altaz")?;
            Ok((value_of(&both, "Altitude")?, value_of(&both, "Azimuth")?))
        }
    }

    fn slew_rate_alt_deg(&mut self, rate: f64) -> Result<(), Box<dyn Error>> {
        self.put("altrate", &[("AltitudeRate", rate.to_string())])
    }

    fn slew_rate_az_deg(&mut self, rate: f64) -> Result<(), Box<dyn Error>> {
        self.put("azrate", &[("AzimuthRate", rate.to_string())])
    }

    fn slew_rate_deg(&mut self, alt_rate: f64, az_rate: f64) -> Result<(), Box<dyn Error>> {
        self.put(
            "altazrate",
            &[("AltitudeRate", alt_rate.to_string()), ("AzimuthRate", az_rate.to_string())],
        )
    }

    fn is_slewing(&mut self) -> Result<bool, Box<dyn Error>> {
        let json = self.get_json("slewing")?;
        json.get("Value")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| "mount response has no boolean Value".into())
    }
}
