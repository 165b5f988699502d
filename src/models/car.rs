use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    pub id: Uuid,
    pub model: String,
    pub year: String,
    #[serde(rename = "SPZ")]
    pub spz: String,
    #[serde(rename = "serviceBook", default)]
    pub service_book: Vec<Service>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCar {
    pub model: String,
    pub year: String,
    #[serde(rename = "SPZ")]
    pub spz: String,
}

impl NewCar {
    pub fn into_car(self) -> Car {
        Car {
            id: Uuid::new_v4(),
            model: self.model,
            year: self.year,
            spz: self.spz,
            service_book: Vec::new(),
        }
    }
}

/// A partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarPatch {
    pub model: Option<String>,
    pub year: Option<String>,
    #[serde(rename = "SPZ")]
    pub spz: Option<String>,
}

impl CarPatch {
    pub fn apply(self, car: &mut Car) {
        if let Some(model) = self.model {
            car.model = model;
        }
        if let Some(year) = self.year {
            car.year = year;
        }
        if let Some(spz) = self.spz {
            car.spz = spz;
        }
    }
}

/// Scanned receipt attached to a service entry, stored as supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub data: Value,
    #[serde(rename = "contentType")]
    pub content_type: String,
}

/// One service-book entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub cost: String,
    pub description: String,
    #[serde(rename = "vendorID")]
    pub vendor_id: Uuid,
    pub receipt: Receipt,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewService {
    pub date: DateTime<Utc>,
    pub cost: String,
    pub description: String,
    pub receipt: Receipt,
}

impl NewService {
    pub fn into_service(self, vendor_id: Uuid) -> Service {
        Service {
            id: Uuid::new_v4(),
            date: self.date,
            cost: self.cost,
            description: self.description,
            vendor_id,
            receipt: self.receipt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn car() -> Car {
        serde_json::from_value::<NewCar>(json!({ "model": "Skoda Fabia", "year": "2008", "SPZ": "1AB2345" }))
            .unwrap()
            .into_car()
    }

    #[test]
    fn test_car_uses_wire_names() {
        let json = serde_json::to_value(car()).unwrap();
        assert_eq!(json["SPZ"], "1AB2345");
        assert_eq!(json["serviceBook"], json!([]));
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut car = car();
        let patch: CarPatch = serde_json::from_value(json!({ "year": "2009" })).unwrap();
        patch.apply(&mut car);

        assert_eq!(car.year, "2009");
        assert_eq!(car.model, "Skoda Fabia");
        assert_eq!(car.spz, "1AB2345");
    }

    #[test]
    fn test_new_service_takes_vendor_from_caller() {
        let vendor = Uuid::new_v4();
        let service = serde_json::from_value::<NewService>(json!({
            "date": "2024-05-01T10:00:00Z",
            "cost": "120 EUR",
            "description": "Oil change",
            "receipt": { "data": "aGVsbG8=", "contentType": "image/png" }
        }))
        .unwrap()
        .into_service(vendor);

        assert_eq!(service.vendor_id, vendor);
        let json = serde_json::to_value(&service).unwrap();
        assert_eq!(json["vendorID"], vendor.to_string());
        assert_eq!(json["receipt"]["contentType"], "image/png");
    }
}
