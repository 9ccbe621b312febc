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

//! Minimal local ASCOM-Alpaca telescope surface.
//!
//! Planetarium software slews "the telescope" to apparent coordinates over
//! this endpoint; the stored RA/Dec then drive the celestial trackable.

use axum::extract::{Form, Path, Query, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

struct ServerState {
    /// Commanded apparent coordinates, both in degrees.
    ra_dec: Mutex<(f64, f64)>,
    connected: Mutex<bool>,
    server_transaction_id: AtomicU32,
}

/// Handle to the Alpaca surface; cheap to clone, readable from any thread.
#[derive(Clone)]
pub struct AlpacaServer {
    state: Arc<ServerState>,
}

#[derive(Serialize)]
struct AlpacaResponse {
    #[serde(rename = "ClientTransactionID")]
    client_transaction_id: u32,
    #[serde(rename = "ServerTransactionID")]
    server_transaction_id: u32,
    #[serde(rename = "ErrorNumber")]
    error_number: i32,
    #[serde(rename = "ErrorMessage")]
    error_message: String,
    #[serde(rename = "Value", skip_serializing_if = "Option::is_none")]
    value: Option<serde_json::Value>,
}

impl ServerState {
    fn response(&self, client_tid: Option<u32>, value: Option<serde_json::Value>) -> AlpacaResponse {
        AlpacaResponse {
            client_transaction_id: client_tid.unwrap_or(0),
            server_transaction_id: self.server_transaction_id.fetch_add(1, Ordering::Relaxed),
            error_number: 0,
            error_message: String::new(),
            value,
        }
    }
}

fn client_tid(params: &HashMap<String, String>) -> Option<u32> {
    params.get("ClientTransactionID").and_then(|v| v.parse().ok())
}

#[derive(Deserialize)]
struct SlewToCoordinates {
    #[serde(rename = "RightAscension")]
    right_ascension: f64,
    #[serde(rename = "Declination")]
    declination: f64,
    #[serde(rename = "ClientTransactionID")]
    client_transaction_id: Option<u32>,
}

async fn slew_to_coordinates(
    State(state): State<Arc<ServerState>>,
    Path(_scope_id): Path<u32>,
    Form(form): Form<SlewToCoordinates>,
) -> Json<AlpacaResponse> {
    // wire right ascension is in hours
    let ra_deg = form.right_ascension * 360.0 / 24.0;
    log::info!("alpaca slew to RA {:.4}h, dec {:.4}°", form.right_ascension, form.declination);
    *state.ra_dec.lock().unwrap() = (ra_deg, form.declination);
    Json(state.response(form.client_transaction_id, None))
}

async fn right_ascension(
    State(state): State<Arc<ServerState>>,
    Path(_scope_id): Path<u32>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<AlpacaResponse> {
    let ra_hours = state.ra_dec.lock().unwrap().0 * 24.0 / 360.0;
    Json(state.response(client_tid(&params), Some(ra_hours.into())))
}

async fn declination(
    State(state): State<Arc<ServerState>>,
    Path(_scope_id): Path<u32>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<AlpacaResponse> {
    let dec = state.ra_dec.lock().unwrap().1;
    Json(state.response(client_tid(&params), Some(dec.into())))
}

async fn get_connected(
    State(state): State<Arc<ServerState>>,
    Path(_scope_id): Path<u32>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<AlpacaResponse> {
    let connected = *state.connected.lock().unwrap();
    Json(state.response(client_tid(&params), Some(connected.into())))
}

#[derive(Deserialize)]
struct SetConnected {
    #[serde(rename = "Connected")]
    connected: bool,
    #[serde(rename = "ClientTransactionID")]
    client_transaction_id: Option<u32>,
}

async fn put_connected(
    State(state): State<Arc<ServerState>>,
    Path(_scope_id): Path<u32>,
    Form(form): Form<SetConnected>,
) -> Json<AlpacaResponse> {
    *state.connected.lock().unwrap() = form.connected;
    Json(state.response(form.client_transaction_id, None))
}

impl AlpacaServer {
    /// Starts serving on a dedicated thread; returns the in-process handle.
    pub fn start(bind: SocketAddr) -> AlpacaServer {
        let state = Arc::new(ServerState {
            ra_dec: Mutex::new((0.0, 0.0)),
            connected: Mutex::new(false),
            server_transaction_id: AtomicU32::new(1),
        });

        let router_state = state.clone();
        std::thread::Builder::new()
            .name("alpaca-server".into())
            .spawn(move || {
                let app = Router::new()
                    .route("/api/v1/telescope/:scope_id/slewtocoordinatesasync", put(slew_to_coordinates))
                    .route("/api/v1/telescope/:scope_id/rightascension", get(right_ascension))
                    .route("/api/v1/telescope/:scope_id/declination", get(declination))
                    .route("/api/v1/telescope/:scope_id/connected", get(get_connected).put(put_connected))
                    .with_state(router_state);

                let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(rt) => rt,
                    Err(e) => {
                        log::error!("failed to create Alpaca server runtime: {}", e);
                        return;
                    }
                };
                runtime.block_on(async move {
                    let listener = match tokio::net::TcpListener::bind(bind).await {
                        Ok(l) => l,
                        Err(e) => {
                            log::error!("failed to bind Alpaca server to {}: {}", bind, e);
                            return;
                        }
                    };
                    log::info!("Alpaca surface listening on {}", bind);
                    if let Err(e) = axum::serve(listener, app).await {
                        log::error!("Alpaca server terminated: {}", e);
                    }
                });
            })
            .expect("failed to spawn the Alpaca server thread");

        AlpacaServer { state }
    }

    /// Last commanded apparent coordinates, both in degrees.
    pub fn get_ra_dec(&self) -> (f64, f64) {
        *self.state.ra_dec.lock().unwrap()
    }

    /// In-process equivalent of the slew endpoint; RA in degrees.
    pub fn set_ra_dec(&self, ra_deg: f64, dec_deg: f64) {
        *self.state.ra_dec.lock().unwrap() = (ra_deg, dec_deg);
    }
}
