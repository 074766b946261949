//! Entity descriptions and the generic entity adapter
//!
//! Entities are described by static tables rather than one type per
//! entity. A single [`Entity`] type reads its value from the coordinator's
//! snapshot and, for buttons and switches, forwards actions to the
//! coordinator.

pub mod descriptions;

use std::sync::Arc;

use crate::coordinator::{ServerCoordinator, Subscription};
use crate::coordinator::state::CoordinatorData;
use crate::error::{Error, Result};
use crate::models::PowerAction;
use crate::setup::ConfigEntry;
use crate::snapshot::{keys, MetricValue};

pub use descriptions::{
    EntityDescription, Platform, Unit, BINARY_SENSORS, BUTTONS, POWER_SWITCH, SENSORS,
};

/// Manufacturer shown on every device
pub const PROPER_NAME: &str = "Pterodactyl Panel";

/// Device grouping the entities of one server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: &'static str,
    pub sw_version: Option<String>,
    pub configuration_url: String,
}

/// What an entity currently shows
#[derive(Debug, Clone, PartialEq)]
pub struct EntityState {
    /// Value from the snapshot; `None` when the key is missing
    pub value: Option<MetricValue>,

    /// Whether the last refresh succeeded
    pub available: bool,
}

/// One entity bound to a coordinator
pub struct Entity {
    coordinator: Arc<ServerCoordinator>,
    description: &'static EntityDescription,
    unique_id: String,
    device: DeviceInfo,
}

impl Entity {
    pub fn new(
        entry: &ConfigEntry,
        coordinator: Arc<ServerCoordinator>,
        description: &'static EntityDescription,
    ) -> Self {
        let server = coordinator.server();
        let unique_id = format!(
            "{}_{}_{}",
            entry.entry_id, server.identifier, description.key
        );
        let device = DeviceInfo {
            identifier: format!("{}_server_{}", entry.entry_id, server.identifier),
            name: format!("Server {}", server.name),
            manufacturer: PROPER_NAME,
            sw_version: server.docker_image.clone(),
            configuration_url: entry.host.clone(),
        };

        Self {
            coordinator,
            description,
            unique_id,
            device,
        }
    }

    pub fn key(&self) -> &'static str {
        self.description.key
    }

    pub fn description(&self) -> &'static EntityDescription {
        self.description
    }

    pub fn platform(&self) -> Platform {
        self.description.platform
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn coordinator(&self) -> &Arc<ServerCoordinator> {
        &self.coordinator
    }

    /// Current value and availability
    ///
    /// Buttons have no value; the power switch reads `is_running`.
    pub fn state(&self) -> EntityState {
        let data = self.coordinator.data();
        EntityState {
            value: self.value_from(&data),
            available: data.last_update_success,
        }
    }

    fn value_from(&self, data: &CoordinatorData) -> Option<MetricValue> {
        let key = match self.description.platform {
            Platform::Button => return None,
            Platform::Switch => keys::IS_RUNNING,
            Platform::Sensor | Platform::BinarySensor => self.description.key,
        };
        data.snapshot.as_ref()?.get(key).cloned()
    }

    /// On/off state for binary sensors and the power switch
    pub fn is_on(&self) -> Option<bool> {
        self.state().value.as_ref().and_then(MetricValue::as_bool)
    }

    /// Press a button entity
    pub async fn press(&self) -> Result<()> {
        match self.description.action {
            Some(action) if self.description.platform == Platform::Button => {
                self.coordinator.send_power_action(action).await
            }
            _ => Err(Error::validation(self.description.key)),
        }
    }

    /// Turn the power switch on (start the server)
    pub async fn turn_on(&self) -> Result<()> {
        self.switch(PowerAction::Start).await
    }

    /// Turn the power switch off (stop the server)
    pub async fn turn_off(&self) -> Result<()> {
        self.switch(PowerAction::Stop).await
    }

    async fn switch(&self, action: PowerAction) -> Result<()> {
        if self.description.platform != Platform::Switch {
            return Err(Error::validation(self.description.key));
        }
        self.coordinator.send_power_action(action).await
    }

    /// Re-render when the coordinator's data changes
    pub fn subscribe<F>(&self, on_change: F) -> Subscription
    where
        F: Fn(&CoordinatorData) + Send + Sync + 'static,
    {
        self.coordinator.subscribe(on_change)
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("unique_id", &self.unique_id)
            .field("platform", &self.description.platform)
            .finish()
    }
}

/// All entities for one coordinator
///
/// Sensors and binary sensors are only created for keys present in the
/// snapshot at the time of the call. Buttons and the power switch are
/// always created.
pub fn build_entities(entry: &ConfigEntry, coordinator: &Arc<ServerCoordinator>) -> Vec<Entity> {
    let snapshot = coordinator.snapshot();
    let has_key = |key: &str| snapshot.as_ref().is_some_and(|s| s.contains(key));

    let readable = BINARY_SENSORS
        .iter()
        .chain(SENSORS.iter())
        .filter(|d| has_key(d.key));

    readable
        .chain(BUTTONS.iter())
        .chain(std::iter::once(&POWER_SWITCH))
        .map(|d| Entity::new(entry, Arc::clone(coordinator), d))
        .collect()
}
