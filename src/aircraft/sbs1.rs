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

//! SBS-1 ("BaseStation") text feed: the line-oriented output of dump1090
//! and compatible ADS-B decoders.

use super::{Aircraft, AircraftSource, ClearRequest};
use crate::data::IcaoAddress;
use async_std::io::prelude::BufReadExt;
use async_std::stream::StreamExt;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::time::Duration;

const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// One decoded SBS-1 record, reduced to the fields the tracker consumes.
#[derive(Debug, PartialEq)]
pub enum Sbs1Message {
    Identification { id: IcaoAddress, callsign: String },
    /// Type 2: position fix with the velocity vector attached.
    SurfacePosition {
        id: IcaoAddress,
        time: f64,
        altitude: f64,
        lat: f64,
        lon: f64,
        ground_speed: f64,
        track: f64,
    },
    /// Type 3.
    AirbornePosition { id: IcaoAddress, time: f64, altitude: f64, lat: f64, lon: f64 },
    /// Type 4.
    AirborneVelocity {
        id: IcaoAddress,
        ground_speed: f64,
        track: f64,
        vertical_rate: Option<f64>,
    },
    /// Types 5–7 carry at most a new altitude.
    SurveillanceAltitude { id: IcaoAddress, altitude: Option<f64> },
}

fn decode_date_time(date: &str, time: &str) -> Option<f64> {
    let naive = chrono::NaiveDateTime::parse_from_str(
        &format!("{} {}", date, time),
        "%Y/%m/%d %H:%M:%S%.f",
    )
    .ok()?;
    Some(Utc.from_utc_datetime(&naive).timestamp_millis() as f64 / 1000.0)
}

/// Decodes one feed line. Non-`MSG` lines, unknown message types and records
/// with malformed mandatory fields all yield `None` (and must not mutate any
/// state downstream).
pub fn parse_line(line: &str) -> Option<Sbs1Message> {
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(',').collect();
    if fields.first() != Some(&"MSG") {
        return None;
    }

    let field = |idx: usize| fields.get(idx).copied();
    let num = |idx: usize| field(idx).and_then(|f| f.parse::<f64>().ok());

    let id: IcaoAddress = field(4)?.parse().ok()?;

    match field(1)? {
        "1" => Some(Sbs1Message::Identification {
            id,
            callsign: field(10)?.trim().to_string(),
        }),
        "2" => Some(Sbs1Message::SurfacePosition {
            id,
            time: decode_date_time(field(6)?, field(7)?)?,
            altitude: num(11)?,
            lat: num(14)?,
            lon: num(15)?,
            ground_speed: num(12)?,
            track: num(13)?,
        }),
        "3" => Some(Sbs1Message::AirbornePosition {
            id,
            time: decode_date_time(field(6)?, field(7)?)?,
            altitude: num(11)?,
            lat: num(14)?,
            lon: num(15)?,
        }),
        "4" => Some(Sbs1Message::AirborneVelocity {
            id,
            ground_speed: num(12)?,
            track: num(13)?,
            vertical_rate: num(16),
        }),
        "5" | "6" | "7" => Some(Sbs1Message::SurveillanceAltitude { id, altitude: num(11) }),
        _ => None,
    }
}

type FeedLines = async_std::io::Lines<async_std::io::BufReader<async_std::net::TcpStream>>;

/// TCP client for an SBS-1 feed, accumulating per-aircraft state in its own
/// table for the manager to merge from.
pub struct Sbs1Source {
    address: String,
    reader: Option<FeedLines>,
    aircraft: HashMap<IcaoAddress, Aircraft>,
    clear_requests: ClearRequest,
    poll_interval: Duration,
}

impl Sbs1Source {
    pub fn new(address: &str) -> Sbs1Source {
        Sbs1Source {
            address: address.to_string(),
            reader: None,
            aircraft: HashMap::new(),
            clear_requests: ClearRequest::default(),
            // a feed line is available almost continuously
            poll_interval: Duration::from_millis(0),
        }
    }

    fn apply(&mut self, msg: Sbs1Message) {
        let id = match &msg {
            Sbs1Message::Identification { id, .. }
            | Sbs1Message::SurfacePosition { id, .. }
            | Sbs1Message::AirbornePosition { id, .. }
            | Sbs1Message::AirborneVelocity { id, .. }
            | Sbs1Message::SurveillanceAltitude { id, .. } => *id,
        };
        let entry = self.aircraft.entry(id).or_insert_with(|| Aircraft::new(id));

        match msg {
            Sbs1Message::Identification { callsign, .. } => {
                if !callsign.is_empty() {
                    entry.callsign = Some(callsign);
                }
            }
            Sbs1Message::SurfacePosition { time, altitude, lat, lon, ground_speed, track, .. } => {
                entry.altitude = Some(altitude);
                entry.position = Some((lat, lon));
                entry.last_pos_update = Some(time);
                entry.last_vector_update = Some(time);
                entry.ground_speed = Some(ground_speed);
                entry.ground_heading = Some(track);
            }
            Sbs1Message::AirbornePosition { time, altitude, lat, lon, .. } => {
                entry.altitude = Some(altitude);
                entry.position = Some((lat, lon));
                entry.last_pos_update = Some(time);
                entry.last_vector_update = Some(time);
            }
            Sbs1Message::AirborneVelocity { ground_speed, track, vertical_rate, .. } => {
                entry.ground_speed = Some(ground_speed);
                entry.ground_heading = Some(track);
                if vertical_rate.is_some() {
                    entry.vertical_speed = vertical_rate;
                }
            }
            Sbs1Message::SurveillanceAltitude { altitude, .. } => {
                if altitude.is_some() {
                    entry.altitude = altitude;
                }
            }
        }
    }
}

impl AircraftSource for Sbs1Source {
    async fn message_loop(&mut self) {
        if self.clear_requests.take() {
            log::info!("clearing SBS-1 source table");
            self.aircraft.clear();
        }

        if self.reader.is_none() {
            match async_std::net::TcpStream::connect(&self.address).await {
                Ok(stream) => {
                    log::info!("connected to SBS-1 feed at {}", self.address);
                    self.reader = Some(async_std::io::BufReader::new(stream).lines());
                }
                Err(e) => {
                    log::warn!("SBS-1 feed connection to {} failed: {}", self.address, e);
                    async_std::task::sleep(RECONNECT_DELAY).await;
                    return;
                }
            }
        }

        let next_line = self.reader.as_mut().unwrap().next();
        match async_std::future::timeout(READ_TIMEOUT, next_line).await {
            // nothing arrived within the timeout; stay connected
            Err(_) => (),
            Ok(None) => {
                log::info!("SBS-1 feed closed the connection");
                self.reader = None;
            }
            Ok(Some(Err(e))) => {
                log::warn!("SBS-1 feed read failed: {}", e);
                self.reader = None;
            }
            Ok(Some(Ok(line))) => {
                if let Some(msg) = parse_line(&line) {
                    self.apply(msg);
                } else {
                    log::debug!("ignoring feed line: {}", line);
                }
            }
        }
    }

    fn aircraft(&self) -> &HashMap<IcaoAddress, Aircraft> {
        &self.aircraft
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn clear_requests(&self) -> ClearRequest {
        self.clear_requests.clone()
    }
}
