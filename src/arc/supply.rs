use serde::Deserialize;

/// One entry of the supply list returned by `Arc::get_supplies`. Supply id
/// 0 always refers to the power box.
#[derive(Debug, Clone, Deserialize)]
pub struct Supply {
    pub supply_id: i64,
    pub name: String,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_deserialize() {
        let supplies: Vec<Supply> = serde_json::from_value(json!([
            { "supply_id": 0, "name": "Power Box" },
            { "supply_id": 3, "name": "CR2032", "manufacturer": "Generic", "model": "Coin cell" },
        ]))
        .unwrap();

        assert_eq!(supplies.len(), 2);
        assert_eq!(supplies[0].supply_id, 0);
        assert_eq!(supplies[0].manufacturer, None);
        assert_eq!(supplies[1].model.as_deref(), Some("Coin cell"));
    }
}
