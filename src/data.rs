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

use nalgebra::Vector3;
use std::future::Future;
use std::pin::Pin;
use std::task::Poll;

/// Target position as produced by trackables and transformers.
///
/// `LatLong` is geodetic (WGS-84 latitude/longitude in degrees, ellipsoidal
/// height in meters), `AltAz` is horizon-relative (degrees), `Cartesian` is
/// the observer-local horizon-tangent frame (meters, +x east, +y north,
/// +z up).
#[derive(Clone, Debug, PartialEq)]
pub enum Position {
    LatLong { lat: f64, lon: f64, height: f64 },
    AltAz { alt: f64, az: f64 },
    Cartesian(Vector3<f64>),
}

impl Position {
    /// Converts an `AltAz` position to a unit vector in the local Cartesian
    /// frame. Panics for the other variants.
    pub fn to_cartesian_unit(&self) -> Vector3<f64> {
        match self {
            Position::AltAz { alt, az } => {
                let (alt, az) = (alt.to_radians(), az.to_radians());
                let base = alt.cos();
                Vector3::new(base * az.sin(), base * az.cos(), alt.sin())
            }
            _ => panic!("only alt/az positions can be converted to a unit vector"),
        }
    }
}

/// 24-bit Mode S transponder address.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct IcaoAddress(u32);

impl IcaoAddress {
    pub fn value(&self) -> u32 { self.0 }
}

impl std::str::FromStr for IcaoAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 6 {
            Err(format!("invalid input length ({})", s.len()))
        } else if s.chars().any(|c| !c.is_ascii_hexdigit()) {
            Err("input contains invalid character(s)".to_string())
        } else {
            match u32::from_str_radix(s, 16) {
                Ok(value) => Ok(IcaoAddress(value)),
                Err(e) => Err(format!("{}", e)),
            }
        }
    }
}

impl std::fmt::Display for IcaoAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06X}", self.0)
    }
}

/// Current UTC time as fractional seconds of the Unix epoch.
pub fn epoch_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1.0e6
}

/// Reduces an angle to [0°, 360°).
pub fn wrap_360(angle: f64) -> f64 {
    angle.rem_euclid(360.0)
}

/// Reduces an angle to (−180°, +180°].
pub fn wrap_180(angle: f64) -> f64 {
    let a = wrap_360(angle);
    if a > 180.0 { a - 360.0 } else { a }
}

/// Shortest signed difference `a2 − a1` in degrees, in (−180°, +180°].
pub fn angle_diff(a1: f64, a2: f64) -> f64 {
    let d = wrap_360(a2) - wrap_360(a1);
    if d > 180.0 {
        d - 360.0
    } else if d <= -180.0 {
        d + 360.0
    } else {
        d
    }
}

/// Mean of two angles respecting the ±180° wrap (e.g. 350° and 10° → 0°).
pub fn avg_angle(a: f64, b: f64) -> f64 {
    let mut a = a;
    if (a - b).abs() > 180.0 {
        a += 360.0;
    }
    wrap_360((a + b) / 2.0)
}

/// Circular mean of a set of angles in degrees, in [0°, 360°).
pub fn circular_mean(angles: impl IntoIterator<Item = f64>) -> f64 {
    let (mut sin_sum, mut cos_sum) = (0.0, 0.0);
    for a in angles {
        sin_sum += a.to_radians().sin();
        cos_sum += a.to_radians().cos();
    }
    wrap_360(sin_sum.atan2(cos_sum).to_degrees())
}

/// Periodic activities of the headless main loop; with no operator UI the
/// event loop owns the cadence the UI timers otherwise would.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Tick {
    /// Solve-and-slew pass of the object tracker.
    Tracking,
    /// Status summary written to the log.
    Status,
}

/// Repeating timer yielding its `Tick` tag; re-arms itself on every expiry.
pub struct TickTimer {
    tick: Tick,
    interval: std::time::Duration,
    sleep: Pin<Box<dyn Future<Output = ()>>>,
}

impl TickTimer {
    pub fn new(tick: Tick, interval: std::time::Duration) -> TickTimer {
        TickTimer {
            tick,
            interval,
            sleep: Box::pin(async_std::task::sleep(interval)),
        }
    }
}

impl pasts::notify::Notify for TickTimer {
    type Event = Tick;

    fn poll_next(self: Pin<&mut Self>, ctx: &mut std::task::Context<'_>) -> Poll<Self::Event> {
        let timer = self.get_mut();
        if timer.sleep.as_mut().poll(ctx).is_ready() {
            // the fresh sleep registers its waker on the loop's next poll
            timer.sleep = Box::pin(async_std::task::sleep(timer.interval));
            Poll::Ready(timer.tick)
        } else {
            Poll::Pending
        }
    }
}
