//! Unit registry - derived physical units for the campaign.
//!
//! The toolkit resolves unit symbols by table lookup when commands are
//! parsed, so every campaign unit must be defined before the table is built.
//! `UnitRegistry` is the mutable, pre-build stage; `build_table` consumes it
//! and yields an immutable `UnitTable`. Nothing can be defined afterwards.
//!
//! Values are expressed in the internal base system:
//! millimeter, nanosecond, MeV and positron charge.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

// Base system
pub const MILLIMETER: f64 = 1.0;
pub const NANOSECOND: f64 = 1.0;
pub const MEGAVOLT: f64 = 1.0;

pub const CENTIMETER: f64 = 10.0 * MILLIMETER;
pub const METER: f64 = 1000.0 * MILLIMETER;
pub const KILOMETER: f64 = 1000.0 * METER;

pub const MILLISECOND: f64 = 1.0e6 * NANOSECOND;
pub const SECOND: f64 = 1.0e9 * NANOSECOND;

pub const KILOVOLT: f64 = 1.0e-3 * MEGAVOLT;
pub const VOLT: f64 = 1.0e-6 * MEGAVOLT;

pub const TESLA: f64 = VOLT * SECOND / (METER * METER);
pub const GAUSS: f64 = 1.0e-4 * TESLA;
pub const KILOGAUSS: f64 = 1.0e-1 * TESLA;

/// Earth radius used by the campaign geometry (IGRF reference radius).
pub const EARTH_RADIUS: f64 = 6371.2 * KILOMETER;
pub const NANOTESLA: f64 = 1.0e-9 * TESLA;
pub const GIGAVOLT: f64 = 1000.0 * MEGAVOLT;

pub const LENGTH: &str = "Length";
pub const TIME: &str = "Time";
pub const MAGNETIC_FLUX_DENSITY: &str = "Magnetic flux density";
pub const ELECTRIC_POTENTIAL: &str = "Electric potential";

/// Unit table errors.
#[derive(Debug, Error, PartialEq)]
pub enum UnitError {
    #[error("Unit symbol '{symbol}' already defined in category '{category}'")]
    Duplicate { category: String, symbol: String },
    
    #[error("Unknown unit symbol: {0}")]
    UnknownUnit(String),
    
    #[error("Malformed quantity: '{0}'")]
    Malformed(String),
}

/// One unit entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitDefinition {
    /// Display name, e.g. "earth radii"
    pub name: String,
    
    /// Symbol used in commands, e.g. "re"
    pub symbol: String,
    
    /// Physical category, e.g. "Length"
    pub category: String,
    
    /// Conversion factor to the internal base unit
    pub value: f64,
}

/// Pre-build stage of the unit table.
#[derive(Debug, Default)]
pub struct UnitRegistry {
    definitions: Vec<UnitDefinition>,
}

impl UnitRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Creates a registry holding the toolkit's default units for the
    /// categories the campaign extends.
    pub fn with_toolkit_defaults() -> Self {
        let mut registry = Self::new();
        let defaults = [
            ("millimeter", "mm", LENGTH, MILLIMETER),
            ("centimeter", "cm", LENGTH, CENTIMETER),
            ("meter", "m", LENGTH, METER),
            ("kilometer", "km", LENGTH, KILOMETER),
            ("nanosecond", "ns", TIME, NANOSECOND),
            ("millisecond", "ms", TIME, MILLISECOND),
            ("second", "s", TIME, SECOND),
            ("tesla", "T", MAGNETIC_FLUX_DENSITY, TESLA),
            ("gauss", "G", MAGNETIC_FLUX_DENSITY, GAUSS),
            ("kilogauss", "kG", MAGNETIC_FLUX_DENSITY, KILOGAUSS),
            ("volt", "V", ELECTRIC_POTENTIAL, VOLT),
            ("kilovolt", "kV", ELECTRIC_POTENTIAL, KILOVOLT),
            ("megavolt", "MV", ELECTRIC_POTENTIAL, MEGAVOLT),
        ];
        for (name, symbol, category, value) in defaults {
            registry.definitions.push(UnitDefinition {
                name: name.to_string(),
                symbol: symbol.to_string(),
                category: category.to_string(),
                value,
            });
        }
        registry
    }
    
    /// Registers one derived unit.
    ///
    /// Category + symbol must be unique.
    pub fn define_unit(
        &mut self,
        name: &str,
        symbol: &str,
        category: &str,
        value: f64,
    ) -> Result<(), UnitError> {
        if self.definitions.iter().any(|d| d.category == category && d.symbol == symbol) {
            return Err(UnitError::Duplicate {
                category: category.to_string(),
                symbol: symbol.to_string(),
            });
        }
        
        debug!("Defining unit {} [{}] in {} = {}", name, symbol, category, value);
        self.definitions.push(UnitDefinition {
            name: name.to_string(),
            symbol: symbol.to_string(),
            category: category.to_string(),
            value,
        });
        Ok(())
    }
    
    /// Number of units defined so far.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }
    
    /// Returns true if nothing has been defined.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
    
    /// Finalizes the registry for lookup.
    pub fn build_table(self) -> UnitTable {
        info!("Unit table built with {} units", self.definitions.len());
        UnitTable {
            definitions: self.definitions,
        }
    }
}

/// Registers the campaign's derived units.
pub fn register_campaign_units(registry: &mut UnitRegistry) -> Result<(), UnitError> {
    info!("Building our own units ...");
    registry.define_unit("earth radii", "re", LENGTH, EARTH_RADIUS)?;
    registry.define_unit("earth radii 1", "Re", LENGTH, EARTH_RADIUS)?;
    registry.define_unit("earth radii 2", "RE", LENGTH, EARTH_RADIUS)?;
    registry.define_unit("hour", "hour", TIME, 3600.0 * SECOND)?;
    registry.define_unit("minute", "minute", TIME, 60.0 * SECOND)?;
    registry.define_unit("day", "day", TIME, 24.0 * 3600.0 * SECOND)?;
    registry.define_unit("nanotesla", "nT", MAGNETIC_FLUX_DENSITY, NANOTESLA)?;
    registry.define_unit("gigavolt", "GV", ELECTRIC_POTENTIAL, GIGAVOLT)?;
    Ok(())
}

/// Immutable, built unit table.
#[derive(Debug, Clone)]
pub struct UnitTable {
    definitions: Vec<UnitDefinition>,
}

impl UnitTable {
    /// Builds the table the campaign runs with: toolkit defaults plus the
    /// campaign units.
    pub fn campaign() -> Result<Self, UnitError> {
        let mut registry = UnitRegistry::with_toolkit_defaults();
        register_campaign_units(&mut registry)?;
        Ok(registry.build_table())
    }
    
    /// Looks up a unit by symbol.
    pub fn get(&self, symbol: &str) -> Option<&UnitDefinition> {
        self.definitions.iter().find(|d| d.symbol == symbol)
    }
    
    /// Conversion factor of a symbol.
    pub fn value_of(&self, symbol: &str) -> Result<f64, UnitError> {
        self.get(symbol)
            .map(|d| d.value)
            .ok_or_else(|| UnitError::UnknownUnit(symbol.to_string()))
    }
    
    /// Units of one category, in definition order.
    pub fn category(&self, category: &str) -> Vec<&UnitDefinition> {
        self.definitions.iter().filter(|d| d.category == category).collect()
    }
    
    /// Parses "<number> <symbol>" into internal units.
    pub fn parse_quantity(&self, text: &str) -> Result<f64, UnitError> {
        let mut parts = text.split_whitespace();
        let (Some(number), Some(symbol), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(UnitError::Malformed(text.to_string()));
        };
        let number: f64 = number
            .parse()
            .map_err(|_| UnitError::Malformed(text.to_string()))?;
        Ok(number * self.value_of(symbol)?)
    }
    
    /// Picks the unit that prints `value` most naturally.
    ///
    /// The largest unit not exceeding |value| wins; values smaller than every
    /// unit fall back to the smallest one. Returns the value in that unit.
    pub fn best_unit(&self, value: f64, category: &str) -> Option<(f64, &UnitDefinition)> {
        let units = self.category(category);
        let magnitude = value.abs();
        
        let fitting = units
            .iter()
            .copied()
            .filter(|u| magnitude >= u.value)
            .fold(None::<&UnitDefinition>, |best, u| match best {
                Some(b) if b.value >= u.value => Some(b),
                _ => Some(u),
            });
        
        let chosen = match fitting {
            Some(u) => u,
            None => units.iter().copied().fold(None::<&UnitDefinition>, |best, u| match best {
                Some(b) if b.value <= u.value => Some(b),
                _ => Some(u),
            })?,
        };
        
        Some((value / chosen.value, chosen))
    }
    
    /// Number of units.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }
    
    /// Returns true if the table holds no units.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
