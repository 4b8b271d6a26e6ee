//! Rider data models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Rider entity from database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Rider {
    pub rider_id: i64,
    pub team_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub nationality: String,
    /// ISO 8601 date.
    pub birthday: String,
    pub points: i64,
    pub monthly_wage: f64,
}

/// List response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiderList {
    pub items: Vec<Rider>,
    pub count: usize,
}

/// Editable rider attributes, shared by create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiderFields {
    pub team_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub nationality: String,
    pub birthday: NaiveDate,
    #[serde(default)]
    pub points: i64,
    pub monthly_wage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_parse_iso_birthday() {
        let fields: RiderFields = serde_json::from_str(
            r#"{
                "team_id": 1, "first_name": "Lotte", "last_name": "Kopecky",
                "nationality": "Belgium", "birthday": "1995-11-10", "monthly_wage": 25000
            }"#,
        )
        .unwrap();
        assert_eq!(fields.birthday, NaiveDate::from_ymd_opt(1995, 11, 10).unwrap());
        assert_eq!(fields.points, 0);

        let bad = serde_json::from_str::<RiderFields>(
            r#"{
                "team_id": 1, "first_name": "Lotte", "last_name": "Kopecky",
                "nationality": "Belgium", "birthday": "10/11/1995", "monthly_wage": 25000
            }"#,
        );
        assert!(bad.is_err());
    }
}
