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

use super::Aircraft;
use crate::data::{epoch_now, IcaoAddress};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const MOTION_MODEL_RATE: Duration = Duration::from_millis(10);

/// Cross-thread request for a feed source to drop its cached table at the
/// next opportunity.
#[derive(Clone, Default)]
pub struct ClearRequest(Arc<AtomicBool>);

impl ClearRequest {
    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Consumes a pending request, if any.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::Relaxed)
    }
}

/// A feed of aircraft reports, polled cooperatively by the manager.
///
/// `message_loop` consumes whatever input is available (suspending only on
/// I/O or its back-off sleeps) and folds it into the source's own table,
/// which the manager then merges from between calls.
pub trait AircraftSource {
    fn message_loop(&mut self) -> impl std::future::Future<Output = ()>;

    fn aircraft(&self) -> &HashMap<IcaoAddress, Aircraft>;

    /// Pause between `message_loop` invocations.
    fn poll_interval(&self) -> Duration;

    fn clear_requests(&self) -> ClearRequest;
}

struct Shared {
    aircraft: Mutex<HashMap<IcaoAddress, Aircraft>>,
    running: AtomicBool,
}

/// Owner of the aircraft table.
///
/// The table lives on a dedicated thread hosting two cooperative activities
/// (source polling and dead reckoning) that serialize on one lock; readers
/// on other threads receive deep copies, never references into the table.
#[derive(Clone)]
pub struct AircraftManager {
    shared: Arc<Shared>,
    clear_request: ClearRequest,
    worker: Arc<Mutex<Option<std::thread::JoinHandle<()>>>>,
}

impl AircraftManager {
    /// Spawns the update thread and enters the polling/propagation loops on
    /// it.
    pub fn start<S: AircraftSource + Send + 'static>(source: S) -> AircraftManager {
        let shared = Arc::new(Shared {
            aircraft: Mutex::new(HashMap::new()),
            running: AtomicBool::new(true),
        });
        let clear_request = source.clear_requests();

        let loop_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name("aircraft-manager".into())
            .spawn(move || {
                log::info!("aircraft manager loop starting");
                async_std::task::block_on(update_loop(source, loop_shared));
                log::info!("aircraft manager loop finished");
            })
            .expect("failed to spawn the aircraft manager thread");

        AircraftManager {
            shared,
            clear_request,
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }

    pub fn get_plane(&self, icao_address: IcaoAddress) -> Option<Aircraft> {
        self.shared.aircraft.lock().unwrap().get(&icao_address).cloned()
    }

    pub fn get_planes(&self) -> HashMap<IcaoAddress, Aircraft> {
        self.shared.aircraft.lock().unwrap().clone()
    }

    pub fn get_plane_list(&self) -> Vec<IcaoAddress> {
        let mut list: Vec<IcaoAddress> = self.shared.aircraft.lock().unwrap().keys().copied().collect();
        list.sort();
        list
    }

    /// Atomically empties the table; the source drops its own cache at its
    /// next poll.
    pub fn clear_plane_list(&self) {
        self.shared.aircraft.lock().unwrap().clear();
        self.clear_request.request();
    }

    /// Asks the loops to finish and joins the update thread.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Relaxed);
        if let Some(worker) = self.worker.lock().unwrap().take() {
            if worker.join().is_err() {
                log::error!("aircraft manager thread panicked");
            }
        }
    }
}

async fn update_loop<S: AircraftSource>(mut source: S, shared: Arc<Shared>) {
    futures::join!(source_poll_loop(&mut source, &shared), motion_model_loop(&shared));
}

/// Lets the source consume its input, then merges the source's table into
/// ours under the table lock.
async fn source_poll_loop<S: AircraftSource>(source: &mut S, shared: &Shared) {
    while shared.running.load(Ordering::Relaxed) {
        source.message_loop().await;

        {
            let mut table = shared.aircraft.lock().unwrap();
            let now = epoch_now();
            for (icao_address, report) in source.aircraft() {
                match table.get_mut(icao_address) {
                    Some(plane) => plane.merge(report, now),
                    None => {
                        // only adopt new aircraft once they have a position
                        if report.last_pos_update.is_some() {
                            log::info!("new aircraft: {}", report);
                            table.insert(*icao_address, report.clone());
                        }
                    }
                }
            }
        }

        async_std::task::sleep(source.poll_interval()).await;
    }
}

async fn motion_model_loop(shared: &Shared) {
    while shared.running.load(Ordering::Relaxed) {
        {
            let mut table = shared.aircraft.lock().unwrap();
            let now = epoch_now();
            for plane in table.values_mut() {
                if plane.can_calc_update() {
                    plane.update(now);
                }
            }
        }

        async_std::task::sleep(MOTION_MODEL_RATE).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Source that serves one scripted report batch.
    struct ScriptedSource {
        reports: Vec<Aircraft>,
        table: HashMap<IcaoAddress, Aircraft>,
        clear: ClearRequest,
    }

    impl ScriptedSource {
        fn new(reports: Vec<Aircraft>) -> ScriptedSource {
            ScriptedSource { reports, table: HashMap::new(), clear: ClearRequest::default() }
        }
    }

    impl AircraftSource for ScriptedSource {
        async fn message_loop(&mut self) {
            if self.clear.take() {
                self.table.clear();
            }
            for report in &self.reports {
                self.table.insert(report.icao_address, report.clone());
            }
            async_std::task::sleep(Duration::from_millis(1)).await;
        }

        fn aircraft(&self) -> &HashMap<IcaoAddress, Aircraft> {
            &self.table
        }

        fn poll_interval(&self) -> Duration {
            Duration::from_millis(5)
        }

        fn clear_requests(&self) -> ClearRequest {
            self.clear.clone()
        }
    }

    fn report(icao: &str, with_position: bool) -> Aircraft {
        let mut a = Aircraft::new(icao.parse().unwrap());
        if with_position {
            let now = epoch_now();
            a.position = Some((51.5, 0.0));
            a.altitude = Some(10000.0);
            a.ground_speed = Some(300.0);
            a.ground_heading = Some(90.0);
            a.vertical_speed = Some(0.0);
            a.last_pos_update = Some(now);
            a.last_vector_update = Some(now);
        }
        a
    }

    #[test]
    fn adopts_and_propagates_reported_aircraft() {
        let source = ScriptedSource::new(vec![report("ABC123", true), report("DEF456", false)]);
        let manager = AircraftManager::start(source);

        std::thread::sleep(Duration::from_millis(150));

        let planes = manager.get_planes();
        // the position-less report must not be adopted
        assert_eq!(planes.len(), 1);
        let plane = manager.get_plane("ABC123".parse().unwrap()).unwrap();
        assert!(plane.can_calc_update());
        // eastbound at 300 kt; dead reckoning has to have moved it by now
        let (_, lon) = plane.position.unwrap();
        assert!(lon > 0.0);

        assert_eq!(manager.get_plane_list(), vec!["ABC123".parse().unwrap()]);
        manager.stop();
    }

    #[test]
    fn clear_empties_both_tables() {
        let source = ScriptedSource::new(vec![report("ABC123", true)]);
        let clear = source.clear_requests();
        let manager = AircraftManager::start(source);

        std::thread::sleep(Duration::from_millis(50));
        assert!(!manager.get_planes().is_empty());

        manager.clear_plane_list();
        // the scripted source re-reports the aircraft immediately afterwards,
        // so only observe that the request flag was consumed by the source
        std::thread::sleep(Duration::from_millis(50));
        assert!(!clear.take());

        manager.stop();
    }

    #[test]
    fn stop_joins_the_worker() {
        let manager = AircraftManager::start(ScriptedSource::new(vec![]));
        std::thread::sleep(Duration::from_millis(20));
        manager.stop();
        // a second stop is a no-op
        manager.stop();
    }
}
