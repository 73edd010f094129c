use chrono::NaiveDate;
use serde_aux::field_attributes::deserialize_number_from_string;

pub type AllergenId = u32;
pub type LocationId = u32;
pub type MeasurementId = u32;
pub type ConcentrationId = u32;

#[derive(serde::Deserialize, Clone, Debug, PartialEq)]
pub struct Allergen {
    pub id: AllergenId,
    pub name: String,
    pub localized_name: String,
    /// Start of the "elevated" band.
    #[serde(rename = "margine_bottom")]
    pub margin_low: f64,
    /// Start of the "high" band.
    #[serde(rename = "margine_top")]
    pub margin_high: f64,
    #[serde(default)]
    pub allergenicity_display: Option<String>,
}

impl Allergen {
    /// Localized name, or the latin one when the upstream has none.
    pub fn label(&self) -> &str {
        if self.localized_name.trim().is_empty() {
            &self.name
        } else {
            &self.localized_name
        }
    }
}

#[derive(serde::Deserialize, Clone, Debug, PartialEq)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub latitude: f64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub longitude: f64,
    #[serde(default)]
    pub description: String,
}

impl Location {
    pub fn map_url(&self) -> String {
        format!(
            "https://www.google.com/maps/place/{},{}",
            self.latitude, self.longitude
        )
    }
}

/// One day of sampling at one location, as sent by the upstream.
#[derive(serde::Deserialize, Clone, Debug, PartialEq)]
pub struct RawMeasurement {
    pub id: MeasurementId,
    pub location: LocationId,
    pub date: NaiveDate,
    #[serde(default)]
    pub concentrations: Vec<ConcentrationId>,
}

#[derive(serde::Deserialize, Clone, Debug, PartialEq)]
pub struct Concentration {
    pub id: ConcentrationId,
    pub allergen: AllergenId,
    pub value: f64,
    #[serde(default)]
    pub pollen: Option<MeasurementId>,
}

/// A calendar day of the assembled series.
///
/// `measurement` is `None` for days the upstream had no record for; those
/// always carry an empty concentration list.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedDay {
    pub date: NaiveDate,
    pub measurement: Option<MeasurementId>,
    pub concentrations: Vec<Concentration>,
}

impl ResolvedDay {
    pub fn placeholder(date: NaiveDate) -> Self {
        ResolvedDay {
            date,
            measurement: None,
            concentrations: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.measurement.is_none()
    }

    pub fn concentration_for(&self, allergen: AllergenId) -> Option<&Concentration> {
        self.concentrations.iter().find(|c| c.allergen == allergen)
    }
}
