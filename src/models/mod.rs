pub mod measurement;

pub use measurement::{Measurement, MeasurementPatch, MeasurementUnit, Point, UnitPreference};
