use crate::error::{Error, Result};
use crate::models::{Allergen, AllergenId, Location, LocationId};
use crate::provider::DataProvider;

/// Allergens and locations, fetched once per session.
#[derive(Clone, Debug, Default)]
pub struct ReferenceData {
    pub allergens: Vec<Allergen>,
    pub locations: Vec<Location>,
}

impl ReferenceData {
    pub fn new(allergens: Vec<Allergen>, locations: Vec<Location>) -> Self {
        ReferenceData {
            allergens,
            locations,
        }
    }

    pub async fn load<P: DataProvider + ?Sized>(provider: &P) -> Result<Self> {
        let (allergens, locations) =
            futures::try_join!(provider.fetch_allergens(), provider.fetch_locations())?;
        Ok(ReferenceData::new(allergens, locations))
    }

    pub fn allergen(&self, id: AllergenId) -> Option<&Allergen> {
        self.allergens.iter().find(|allergen| allergen.id == id)
    }

    pub fn require_allergen(&self, id: AllergenId) -> Result<&Allergen> {
        self.allergen(id).ok_or(Error::UnknownAllergen(id))
    }

    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.iter().find(|location| location.id == id)
    }
}
