//! Object detection behind the capture flow.
//!
//! `SimulatedDetector` stands in for real image-based measurement: it picks a
//! reference object at random and reports one of its dimensions with up to 10%
//! noise. A production detector implements `MeasurementDetector` instead.

use std::{future::Future, sync::Mutex, time::Duration};

use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::models::Point;

const ENABLE_LOGS: bool = false;

use crate::log_debug;

pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_millis(1500);

const DETECTED_DETAILS: &str = "Detected with AI assistance";

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRequest {
    pub image_uri: String,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub object_name: String,
    pub object_details: String,
    pub value: f64,
}

pub trait MeasurementDetector: Send + Sync + 'static {
    fn detect(&self, request: DetectionRequest) -> impl Future<Output = Result<Detection>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceObject {
    pub name: &'static str,
    pub width: f64,
    pub height: f64,
}

/// Known objects and their dimensions in centimetres.
pub const REFERENCE_OBJECTS: [ReferenceObject; 8] = [
    ReferenceObject { name: "Smartphone", width: 7.5, height: 15.0 },
    ReferenceObject { name: "Book", width: 15.0, height: 21.0 },
    ReferenceObject { name: "Coffee Cup", width: 8.0, height: 12.0 },
    ReferenceObject { name: "Laptop", width: 35.0, height: 24.0 },
    ReferenceObject { name: "Credit Card", width: 8.5, height: 5.4 },
    ReferenceObject { name: "A4 Paper", width: 21.0, height: 29.7 },
    ReferenceObject { name: "Water Bottle", width: 7.0, height: 23.0 },
    ReferenceObject { name: "Desk", width: 120.0, height: 60.0 },
];

pub fn reference_object(name: &str) -> Option<&'static ReferenceObject> {
    REFERENCE_OBJECTS.iter().find(|object| object.name == name)
}

pub struct SimulatedDetector {
    latency: Duration,
    rng: Mutex<StdRng>,
}

impl Default for SimulatedDetector {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESSING_DELAY)
    }
}

impl SimulatedDetector {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(latency: Duration, seed: u64) -> Self {
        Self {
            latency,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    fn next_detection(&self) -> Detection {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        synthesize(&mut *rng)
    }
}

impl MeasurementDetector for SimulatedDetector {
    fn detect(&self, request: DetectionRequest) -> impl Future<Output = Result<Detection>> + Send {
        async move {
            log_debug!(
                "simulating detection for {} with {} points",
                request.image_uri,
                request.points.len()
            );
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            Ok(self.next_detection())
        }
    }
}

/// One random reading: uniform object, width or height with equal odds,
/// scaled by a factor in [0.9, 1.1] and rounded to one decimal.
pub fn synthesize<R: Rng + ?Sized>(rng: &mut R) -> Detection {
    let object = &REFERENCE_OBJECTS[rng.gen_range(0..REFERENCE_OBJECTS.len())];
    let dimension = if rng.gen_bool(0.5) {
        object.width
    } else {
        object.height
    };
    let factor: f64 = rng.gen_range(0.9..=1.1);

    Detection {
        object_name: object.name.to_string(),
        object_details: DETECTED_DETAILS.to_string(),
        value: round_to_tenth(dimension * factor),
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
