//! Data module - spec sheet loading and preprocessing

mod loader;
mod processor;

pub use loader::{DataLoader, LoaderError};
pub use processor::{
    canonicalize_makes, parse_mileage, parse_msrp, split_identifier, strip_specs, DataProcessor,
    ProcessorError, CITY_MPG, GAS_MILEAGE, HIGHWAY_MPG, MAKE, MODEL, MSRP, YEAR,
};
