use crate::models::{AllergenId, ConcentrationId, LocationId};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The upstream could not be reached, answered with a non-success status,
    /// or sent a body that does not decode.
    #[error("data provider unavailable ({endpoint}): {reason}")]
    ProviderUnavailable { endpoint: String, reason: String },

    #[error("concentration {id} could not be resolved: {reason}")]
    ResolutionFailure { id: ConcentrationId, reason: String },

    #[error("allergen {0} is not part of the loaded reference data")]
    UnknownAllergen(AllergenId),

    #[error("a window of {requested} days is not supported (at most {max})")]
    WindowTooLarge { requested: u32, max: u32 },

    /// The assembly task stopped without producing a series.
    #[error("loading measurements for location {0} stopped unexpectedly")]
    Interrupted(LocationId),
}

impl Error {
    pub fn unavailable(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Error::ProviderUnavailable {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }
}
