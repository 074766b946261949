//! Static entity description tables

use serde::Serialize;

use crate::models::PowerAction;
use crate::snapshot::keys;

/// Kind of entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Sensor,
    BinarySensor,
    Button,
    Switch,
}

/// Unit of a sensor value, as stored in the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Percentage,
    Bytes,
    Gigabytes,
    Milliseconds,
    Hours,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Percentage => "%",
            Self::Bytes => "B",
            Self::Gigabytes => "GB",
            Self::Milliseconds => "ms",
            Self::Hours => "h",
        }
    }
}

const MEASUREMENT: &str = "measurement";

/// Declarative description of one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityDescription {
    /// Snapshot key (sensors) or entity key (buttons, switch)
    pub key: &'static str,
    pub platform: Platform,
    pub translation_key: &'static str,
    pub icon: Option<&'static str>,
    /// Device class hint for the presentation layer
    pub device_class: Option<&'static str>,
    /// State class hint; `measurement` for instantaneous readings
    pub state_class: Option<&'static str>,
    pub native_unit: Option<Unit>,
    pub suggested_unit: Option<Unit>,
    pub display_precision: Option<u8>,
    pub enabled_by_default: bool,
    /// Power action bound to a button
    pub action: Option<PowerAction>,
}

impl EntityDescription {
    const fn base(key: &'static str, platform: Platform, translation_key: &'static str) -> Self {
        Self {
            key,
            platform,
            translation_key,
            icon: None,
            device_class: None,
            state_class: None,
            native_unit: None,
            suggested_unit: None,
            display_precision: None,
            enabled_by_default: true,
            action: None,
        }
    }

    const fn data_size(key: &'static str, translation_key: &'static str, icon: &'static str) -> Self {
        Self {
            icon: Some(icon),
            device_class: Some("data_size"),
            state_class: Some(MEASUREMENT),
            native_unit: Some(Unit::Bytes),
            suggested_unit: Some(Unit::Gigabytes),
            display_precision: Some(2),
            ..Self::base(key, Platform::Sensor, translation_key)
        }
    }

    const fn button(key: &'static str, translation_key: &'static str, action: PowerAction) -> Self {
        Self {
            action: Some(action),
            ..Self::base(key, Platform::Button, translation_key)
        }
    }
}

pub static SENSORS: [EntityDescription; 8] = [
    EntityDescription {
        icon: Some("mdi:cpu-64-bit"),
        state_class: Some(MEASUREMENT),
        native_unit: Some(Unit::Percentage),
        display_precision: Some(0),
        ..EntityDescription::base(keys::CPU, Platform::Sensor, "pterodactyl_cpu")
    },
    EntityDescription::base(
        keys::CURRENT_STATE,
        Platform::Sensor,
        "pterodactyl_current_state",
    ),
    EntityDescription::data_size(keys::DISK, "pterodactyl_disk", "mdi:harddisk"),
    EntityDescription::data_size(keys::MEMORY, "pterodactyl_memory", "mdi:memory"),
    EntityDescription::data_size(
        keys::NETWORK_RX,
        "pterodactyl_network_rx",
        "mdi:download-network-outline",
    ),
    EntityDescription::data_size(
        keys::NETWORK_TX,
        "pterodactyl_network_tx",
        "mdi:upload-network-outline",
    ),
    EntityDescription::base(keys::NODE, Platform::Sensor, "pterodactyl_node"),
    EntityDescription {
        icon: Some("mdi:memory"),
        device_class: Some("duration"),
        state_class: Some(MEASUREMENT),
        native_unit: Some(Unit::Milliseconds),
        suggested_unit: Some(Unit::Hours),
        enabled_by_default: false,
        ..EntityDescription::base(keys::UPTIME, Platform::Sensor, "pterodactyl_uptime")
    },
];

pub static BINARY_SENSORS: [EntityDescription; 2] = [
    EntityDescription::base(
        keys::IS_NODE_UNDER_MAINTENANCE,
        Platform::BinarySensor,
        "pterodactyl_is_node_under_maintenance",
    ),
    EntityDescription {
        device_class: Some("running"),
        ..EntityDescription::base(
            keys::IS_RUNNING,
            Platform::BinarySensor,
            "pterodactyl_is_running",
        )
    },
];

pub static BUTTONS: [EntityDescription; 3] = [
    EntityDescription::button(
        "server_restart",
        "pterodactyl_server_restart",
        PowerAction::Restart,
    ),
    EntityDescription::button("server_start", "pterodactyl_server_start", PowerAction::Start),
    EntityDescription::button("server_stop", "pterodactyl_server_stop", PowerAction::Stop),
];

pub static POWER_SWITCH: EntityDescription = EntityDescription {
    icon: Some("mdi:power"),
    ..EntityDescription::base(
        "power_switch",
        Platform::Switch,
        "pterodactyl_server_power_switch",
    )
};

/// Look up a description by key across all tables
pub fn find(key: &str) -> Option<&'static EntityDescription> {
    SENSORS
        .iter()
        .chain(BINARY_SENSORS.iter())
        .chain(BUTTONS.iter())
        .chain(std::iter::once(&POWER_SWITCH))
        .find(|d| d.key == key)
}
