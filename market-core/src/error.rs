use thiserror::Error;

/// Configuration problems detected while loading the catalog or producers.
///
/// All of these are fatal: the engine refuses to construct, so a
/// misconfigured economy never starts ticking.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("producer `{producer}` declares zero output of `{resource}`")]
    ZeroOutput { producer: String, resource: String },

    #[error("{context} references unknown resource `{name}`")]
    UnknownResource { context: String, name: String },

    #[error("{owner}: `{field}` must be within [{min}, {max}], got {value}")]
    ValueOutOfRange {
        owner: String,
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{owner}: `{field}` must be positive, got {value}")]
    NotPositive {
        owner: String,
        field: &'static str,
        value: f64,
    },

    #[error("{owner}: `{field}` is not a finite number")]
    NotFinite { owner: String, field: &'static str },

    #[error("resource `{name}` has non-positive base price {price}")]
    BadBasePrice { name: String, price: f64 },

    #[error("duplicate resource `{name}`")]
    DuplicateResource { name: String },

    #[error("duplicate producer `{name}`")]
    DuplicateProducer { name: String },
}

impl ConfigError {
    pub(crate) fn check_finite(
        owner: &str,
        field: &'static str,
        value: f64,
    ) -> Result<(), ConfigError> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(ConfigError::NotFinite {
                owner: owner.to_string(),
                field,
            })
        }
    }

    pub(crate) fn check_range(
        owner: &str,
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    ) -> Result<(), ConfigError> {
        Self::check_finite(owner, field, value)?;
        if value < min || value > max {
            return Err(ConfigError::ValueOutOfRange {
                owner: owner.to_string(),
                field,
                value,
                min,
                max,
            });
        }
        Ok(())
    }

    pub(crate) fn check_non_negative(
        owner: &str,
        field: &'static str,
        value: f64,
    ) -> Result<(), ConfigError> {
        Self::check_range(owner, field, value, 0.0, f64::MAX)
    }

    pub(crate) fn check_positive(
        owner: &str,
        field: &'static str,
        value: f64,
    ) -> Result<(), ConfigError> {
        Self::check_finite(owner, field, value)?;
        if value <= 0.0 {
            return Err(ConfigError::NotPositive {
                owner: owner.to_string(),
                field,
                value,
            });
        }
        Ok(())
    }
}
