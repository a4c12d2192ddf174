use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Floor,
    Lower,
    Upper,
    Orchestra,
    Mezzanine,
    Balcony,
    Suite,
    #[default]
    Standard,
    Pit,
    #[serde(other)]
    Other,
}

impl SectionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Floor => "floor",
            Self::Lower => "lower",
            Self::Upper => "upper",
            Self::Orchestra => "orchestra",
            Self::Mezzanine => "mezzanine",
            Self::Balcony => "balcony",
            Self::Suite => "suite",
            Self::Standard => "standard",
            Self::Pit => "pit",
            Self::Other => "other",
        }
    }
}

/// A sellable venue area. Owned by the calling application; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg_path_hint: Option<String>,
    #[serde(default)]
    pub section_type: SectionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub section_id: String,
    pub has_inventory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
}

/// One availability row as delivered by the listing backend.
///
/// Older payloads only carry `available_count`; newer ones carry an explicit flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRecord {
    pub section_id: String,
    #[serde(default)]
    pub available: Option<bool>,
    #[serde(default, alias = "available_count")]
    pub available_count: Option<i64>,
    #[serde(default)]
    pub min_price: Option<f64>,
}

impl AvailabilityRecord {
    pub fn has_inventory(&self) -> bool {
        match self.available {
            Some(flag) => flag,
            None => self.available_count.is_some_and(|n| n > 0),
        }
    }

    pub fn to_availability(&self) -> Availability {
        Availability {
            section_id: self.section_id.clone(),
            has_inventory: self.has_inventory(),
            min_price: self.min_price,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AvailabilityKind {
    Counts,
    Records,
    None,
}

/// Availability for one render pass.
///
/// When `counts` is present it decides `hasTickets` for every section (a missing entry
/// counts as zero); `records` then only contribute prices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityInput {
    #[serde(default, alias = "ticketCounts")]
    pub counts: Option<HashMap<String, i64>>,
    #[serde(default)]
    pub records: Vec<AvailabilityRecord>,
}

impl AvailabilityInput {
    pub fn from_counts(counts: impl IntoIterator<Item = (String, i64)>) -> Self {
        Self {
            counts: Some(counts.into_iter().collect()),
            records: Vec::new(),
        }
    }

    pub fn from_records(records: Vec<AvailabilityRecord>) -> Self {
        Self {
            counts: None,
            records,
        }
    }

    pub fn kind(&self) -> AvailabilityKind {
        if self.counts.is_some() {
            AvailabilityKind::Counts
        } else if !self.records.is_empty() {
            AvailabilityKind::Records
        } else {
            AvailabilityKind::None
        }
    }

    pub fn record_for(&self, section_id: &str) -> Option<&AvailabilityRecord> {
        self.records.iter().find(|r| r.section_id == section_id)
    }

    /// The availability view handed to callbacks. With a count map, inventory comes from
    /// the count and only the price is taken from a matching record.
    pub fn availability_for(&self, section_id: &str) -> Option<Availability> {
        let record = self.record_for(section_id);
        match (&self.counts, record) {
            (Some(_), record) => Some(Availability {
                section_id: section_id.to_string(),
                has_inventory: self.has_tickets(section_id),
                min_price: record.and_then(|r| r.min_price),
            }),
            (None, Some(record)) => Some(record.to_availability()),
            (None, None) => None,
        }
    }

    pub fn has_tickets(&self, section_id: &str) -> bool {
        if let Some(counts) = &self.counts {
            return counts.get(section_id).copied().unwrap_or(0) > 0;
        }
        self.record_for(section_id)
            .is_some_and(AvailabilityRecord::has_inventory)
    }
}

/// The resolved association between diagram elements and one section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub section: Section,
    pub availability: Option<Availability>,
    pub has_tickets: bool,
}

/// Catalog payload accepted by the CLI and by hosts that ship JSON.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    pub sections: Vec<Section>,
    #[serde(default)]
    pub availability: Vec<AvailabilityRecord>,
    #[serde(default)]
    pub ticket_counts: Option<HashMap<String, i64>>,
}

impl CatalogDocument {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(Error::InvalidCatalog)
    }

    pub fn availability_input(&self) -> AvailabilityInput {
        AvailabilityInput {
            counts: self.ticket_counts.clone(),
            records: self.availability.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_map_zero_beats_legacy_available_count() {
        let input = AvailabilityInput {
            counts: Some(HashMap::from([("s1".to_string(), 0)])),
            records: vec![AvailabilityRecord {
                section_id: "s1".to_string(),
                available: None,
                available_count: Some(5),
                min_price: Some(40.0),
            }],
        };
        assert_eq!(input.kind(), AvailabilityKind::Counts);
        assert!(!input.has_tickets("s1"));
    }

    #[test]
    fn records_fall_back_from_flag_to_count() {
        let input = AvailabilityInput::from_records(vec![
            AvailabilityRecord {
                section_id: "a".to_string(),
                available: Some(false),
                available_count: Some(3),
                min_price: None,
            },
            AvailabilityRecord {
                section_id: "b".to_string(),
                available: None,
                available_count: Some(2),
                min_price: None,
            },
        ]);
        assert!(!input.has_tickets("a"));
        assert!(input.has_tickets("b"));
        assert!(!input.has_tickets("missing"));
    }

    #[test]
    fn catalog_json_accepts_camel_case_and_unknown_section_types() {
        let doc = CatalogDocument::from_json_str(
            r#"{
                "sections": [
                    { "id": "s1", "name": "Section 232", "svgPathHint": "232", "sectionType": "lower" },
                    { "id": "s2", "name": "Lawn", "sectionType": "lawn" },
                    { "id": "s3", "name": "Box 4" }
                ],
                "availability": [ { "sectionId": "s1", "available_count": 4, "minPrice": 55.5 } ],
                "ticketCounts": { "s2": 1 }
            }"#,
        )
        .unwrap();
        assert_eq!(doc.sections[0].svg_path_hint.as_deref(), Some("232"));
        assert_eq!(doc.sections[0].section_type, SectionType::Lower);
        assert_eq!(doc.sections[1].section_type, SectionType::Other);
        assert_eq!(doc.sections[2].section_type, SectionType::Standard);
        assert_eq!(doc.availability[0].available_count, Some(4));
        let input = doc.availability_input();
        assert!(input.has_tickets("s2"));
        assert!(!input.has_tickets("s1"));
    }
}
