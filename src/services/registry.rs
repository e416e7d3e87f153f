use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;

use crate::services::lifecycle::{load_booking_history, BookingController, EngineContext};

/// One controller per booking, each behind its own lock so operations on the same booking
/// run one at a time while different bookings proceed independently.
pub type SharedController = Arc<Mutex<BookingController>>;

#[derive(Default)]
pub struct BookingRegistry {
    controllers: RwLock<HashMap<String, SharedController>>,
}

impl BookingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, controller: BookingController) -> SharedController {
        let id = controller.booking().id.clone();
        let shared = Arc::new(Mutex::new(controller));
        self.controllers
            .write()
            .unwrap()
            .insert(id, Arc::clone(&shared));
        shared
    }

    pub fn get(&self, id: &str) -> Option<SharedController> {
        self.controllers.read().unwrap().get(id).cloned()
    }

    pub fn all(&self) -> Vec<SharedController> {
        self.controllers.read().unwrap().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.controllers.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Id and controller for every booking, without taking any booking lock.
    pub fn entries(&self) -> Vec<(String, SharedController)> {
        self.controllers
            .read()
            .unwrap()
            .iter()
            .map(|(id, shared)| (id.clone(), Arc::clone(shared)))
            .collect()
    }

    /// Loads every stored booking into the registry and reconciles the appointment
    /// repository with it: slots held by stored bookings are re-registered, and slots
    /// whose booking has no matching stored appointment are released.
    pub async fn restore(&self, ctx: &Arc<EngineContext>) -> anyhow::Result<usize> {
        let history = load_booking_history(ctx.store.as_ref()).await?;
        let count = history.len();

        let mut holders = HashSet::new();
        for booking in history {
            if let Some(appointment) = booking.active_appointment() {
                holders.insert(booking.id.clone());
                if let Err(e) = ctx.appointments.upsert(appointment).await {
                    tracing::warn!(booking_id = %booking.id, error = %e, "failed to restore appointment");
                }
            }
            self.insert(BookingController::from_booking(Arc::clone(ctx), booking));
        }

        let mut released = 0;
        for orphan in ctx.appointments.list_active().await? {
            if holders.contains(&orphan.booking_id) {
                continue;
            }
            tracing::warn!(
                booking_id = %orphan.booking_id,
                appointment_id = %orphan.id,
                "releasing slot with no matching stored booking"
            );
            if ctx.appointments.release(&orphan.booking_id).await? {
                released += 1;
            }
        }

        tracing::info!(count, released, "restored bookings from store");
        Ok(count)
    }
}
