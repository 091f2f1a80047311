use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Identifier of a customer segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub u64);

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a customer segment relates to the grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum PowerType {
    Consumption,
    InterruptibleConsumption,
    ThermalStorageConsumption,
    ElectricVehicle,
    Production,
    SolarProduction,
    WindProduction,
    RunOfRiverProduction,
    ChpProduction,
    FossilProduction,
    Storage,
    BatteryStorage,
    PumpedStorageProduction,
}

impl PowerType {
    /// True for every producer type, including pumped storage.
    pub fn is_production(&self) -> bool {
        matches!(
            self,
            Self::Production
                | Self::SolarProduction
                | Self::WindProduction
                | Self::RunOfRiverProduction
                | Self::ChpProduction
                | Self::FossilProduction
                | Self::PumpedStorageProduction
        )
    }

    pub fn is_consumption(&self) -> bool {
        matches!(
            self,
            Self::Consumption
                | Self::InterruptibleConsumption
                | Self::ThermalStorageConsumption
                | Self::ElectricVehicle
        )
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage | Self::BatteryStorage)
    }

    /// Loads that a broker may curtail.
    pub fn is_interruptible(&self) -> bool {
        matches!(
            self,
            Self::InterruptibleConsumption
                | Self::ThermalStorageConsumption
                | Self::ElectricVehicle
                | Self::BatteryStorage
        )
    }

    /// The generic type a specialised type falls back to.
    pub fn generic_type(&self) -> PowerType {
        if self.is_production() {
            Self::Production
        } else if self.is_storage() {
            Self::Storage
        } else {
            Self::Consumption
        }
    }

    /// Every tariff power type a segment of this type may subscribe to,
    /// most generic first, without duplicates.
    pub fn applicable_types(&self) -> Vec<PowerType> {
        let mut types = vec![self.generic_type()];
        if self.is_interruptible() && self.is_consumption() {
            types.push(Self::InterruptibleConsumption);
        }
        if !types.contains(self) {
            types.push(*self);
        }
        types
    }
}

/// A population unit that decides on tariffs together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub id: CustomerId,
    pub name: String,
    pub power_type: PowerType,
    pub population: u32,
    /// Sub-populations may hold different tariffs and decide independently.
    pub multi_contracting: bool,
}

impl CustomerInfo {
    pub fn new(id: u64, name: impl Into<String>, power_type: PowerType, population: u32) -> Self {
        Self {
            id: CustomerId(id),
            name: name.into(),
            power_type,
            population,
            multi_contracting: false,
        }
    }

    pub fn with_multi_contracting(mut self, multi_contracting: bool) -> Self {
        self.multi_contracting = multi_contracting;
        self
    }
}
