use std::{collections::HashMap, sync::Arc};

use chrono::Local;
use tokio::sync::Mutex;
use tracing::{info, warn};
use wgc_core::{
    config::{Config, UpdateInterval},
    coordinator::ScheduleCoordinator,
    garbage_client::{FetchError, GarbageClient},
    translation::TranslationTable,
};

use crate::route::{bad_gateway, ApiError};

type SharedCoordinator = Arc<Mutex<ScheduleCoordinator<GarbageClient>>>;

/// The coordinators of all addresses requested so far.
///
/// Each address has its own lock, so a slow poll only holds up requests for that address.
#[derive(Clone)]
pub struct AppState {
    client: GarbageClient,
    translations: Arc<TranslationTable>,
    coordinators: Arc<Mutex<HashMap<u64, SharedCoordinator>>>,
}

impl AppState {
    pub fn new(client: GarbageClient, translations: TranslationTable) -> Self {
        Self {
            client,
            translations: Arc::new(translations),
            coordinators: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn client(&self) -> &GarbageClient {
        &self.client
    }

    async fn coordinator(&self, address_point_id: u64) -> SharedCoordinator {
        let mut coordinators = self.coordinators.lock().await;
        let coordinator = coordinators.entry(address_point_id).or_insert_with(|| {
            info!(address_point_id, "tracking new address");
            let coordinator =
                ScheduleCoordinator::new(self.client.clone(), Config::new(address_point_id))
                    .with_translations(TranslationTable::clone(&self.translations));
            Arc::new(Mutex::new(coordinator))
        });
        Arc::clone(coordinator)
    }

    /// Run `f` on the coordinator of an address after refreshing it if due.
    ///
    /// A failed refresh is only an error when there is no earlier snapshot to fall back to.
    pub async fn with_coordinator<T>(
        &self,
        address_point_id: u64,
        update_interval: Option<UpdateInterval>,
        f: impl FnOnce(&ScheduleCoordinator<GarbageClient>) -> T,
    ) -> Result<T, ApiError> {
        let coordinator = self.coordinator(address_point_id).await;
        let mut coordinator = coordinator.lock().await;
        if let Some(update_interval) = update_interval {
            coordinator.set_update_interval(update_interval);
        }
        let refreshed = coordinator.refresh_if_due(Local::now().naive_local()).await;
        match refreshed {
            Ok(_) => {}
            Err(err) if coordinator.data().is_some() => {
                warn!(address_point_id, %err, "serving the previous schedule");
            }
            Err(err) => return Err(bad_gateway(err)),
        }
        if coordinator.data().is_none() {
            let err = coordinator
                .last_error()
                .cloned()
                .unwrap_or(FetchError::NoScheduleFound { address_point_id });
            return Err(bad_gateway(err));
        }
        Ok(f(&*coordinator))
    }
}
