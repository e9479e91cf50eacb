use rand::Rng;
use serde::{Deserialize, Serialize};

pub const PLACES: [&str; 10] = [
    "guatemala",
    "mexico",
    "panama",
    "inglaterra",
    "francia",
    "italia",
    "españa",
    "argentina",
    "chile",
    "colombia",
];

pub const CONDITIONS: [&str; 3] = ["soleado", "nublado", "lluvioso"];

/// One synthetic weather reading, generated fresh per request and discarded
/// after send. Field names match the wire format the receiving API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub name: String,
    pub temperatura: i32,
    pub humedad: i32,
    pub clima: String,
}

impl WeatherReading {
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            name: PLACES[rng.gen_range(0..PLACES.len())].to_string(),
            temperatura: rng.gen_range(18..=28),
            humedad: rng.gen_range(40..=80),
            clima: CONDITIONS[rng.gen_range(0..CONDITIONS.len())].to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn sampled_readings_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let r = WeatherReading::sample(&mut rng);
            assert!((18..=28).contains(&r.temperatura), "temperatura {}", r.temperatura);
            assert!((40..=80).contains(&r.humedad), "humedad {}", r.humedad);
            assert!(PLACES.contains(&r.name.as_str()), "name {}", r.name);
            assert!(CONDITIONS.contains(&r.clima.as_str()), "clima {}", r.clima);
        }
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let mut rng = StdRng::seed_from_u64(1);
        let r = WeatherReading::sample(&mut rng);
        let v: serde_json::Value = serde_json::to_value(&r).expect("serialize");
        for key in ["name", "temperatura", "humedad", "clima"] {
            assert!(v.get(key).is_some(), "missing field {}", key);
        }
    }
}
