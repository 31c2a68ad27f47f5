use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const TEMPERATURE_MIN: f64 = 15.0; // °C
pub const TEMPERATURE_SPAN: f64 = 15.0;
pub const HUMIDITY_MIN: f64 = 20.0; // % RH
pub const HUMIDITY_SPAN: f64 = 60.0;

/// One synthetic environment sample. Field order is the wire order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Reading {
    pub temperature: f64,
    pub humidity: f64,
}

impl Reading {
    /// Draws both values independently and uniformly from their ranges.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Reading {
        Reading {
            temperature: TEMPERATURE_MIN + rng.gen::<f64>() * TEMPERATURE_SPAN,
            humidity: HUMIDITY_MIN + rng.gen::<f64>() * HUMIDITY_SPAN,
        }
    }

    /// Compact JSON body, e.g. `{"temperature":22.37,"humidity":55.1}`.
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Generator seeded from the wall clock, so runs are not reproducible.
pub fn seeded_rng() -> StdRng {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default();
    StdRng::seed_from_u64(seed)
}
