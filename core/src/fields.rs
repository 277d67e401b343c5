//! Closed, schema-validated field bags carried by tiles and entities.
//!
//! Every tile or entity type declares a static schema listing the fields it
//! understands together with the values each field may hold. A [`FieldValues`]
//! bag is always complete: omitted fields receive their declared default and
//! undeclared fields are rejected up front.

use std::{
    collections::BTreeMap,
    fmt,
    hash::{Hash, Hasher},
};

use thiserror::Error;

/// Value stored in a single field.
#[derive(Clone, Copy, Debug)]
pub enum FieldValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Symbolic name drawn from a declared set.
    Name(&'static str),
    /// Floating point quantity.
    Float(f32),
}

impl FieldValue {
    /// Returns the boolean payload, if any.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the integer payload, if any.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the symbolic name payload, if any.
    #[must_use]
    pub const fn as_name(&self) -> Option<&'static str> {
        match self {
            Self::Name(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the float payload, if any.
    #[must_use]
    pub const fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }
}

// Floats compare by bit pattern so that equality agrees with hashing.
impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Name(a), Self::Name(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Bool(value) => value.hash(state),
            Self::Int(value) => value.hash(state),
            Self::Name(value) => value.hash(state),
            Self::Float(value) => value.to_bits().hash(state),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Name(value) => write!(f, "'{value}'"),
            Self::Float(value) => write!(f, "{value}"),
        }
    }
}

/// Set of values a field may hold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldDomain {
    /// Enumerated values; the first entry is the default.
    Choices(&'static [FieldValue]),
    /// Inclusive float interval with an explicit default.
    Range {
        /// Smallest admissible value.
        min: f32,
        /// Largest admissible value.
        max: f32,
        /// Value assigned when the field is omitted.
        default: f32,
    },
}

/// Declaration of a single field inside a type schema.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldSpec {
    name: &'static str,
    domain: FieldDomain,
}

impl FieldSpec {
    /// Declares a field restricted to an enumerated set of values.
    #[must_use]
    pub const fn choices(name: &'static str, values: &'static [FieldValue]) -> Self {
        Self {
            name,
            domain: FieldDomain::Choices(values),
        }
    }

    /// Declares a float field restricted to `min..=max`.
    #[must_use]
    pub const fn range(name: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self {
            name,
            domain: FieldDomain::Range { min, max, default },
        }
    }

    /// Name of the field.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Values the field may hold.
    #[must_use]
    pub const fn domain(&self) -> FieldDomain {
        self.domain
    }

    /// Value assigned when the field is omitted, if the domain has one.
    #[must_use]
    pub fn default_value(&self) -> Option<FieldValue> {
        match self.domain {
            FieldDomain::Choices(values) => values.first().copied(),
            FieldDomain::Range { default, .. } => Some(FieldValue::Float(default)),
        }
    }

    /// Reports whether `value` belongs to the field's domain.
    #[must_use]
    pub fn admits(&self, value: &FieldValue) -> bool {
        match self.domain {
            FieldDomain::Choices(values) => values.contains(value),
            FieldDomain::Range { min, max, .. } => value
                .as_float()
                .map_or(false, |value| value >= min && value <= max),
        }
    }
}

/// Errors raised while building or mutating a field bag.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    /// The owning type does not declare the field.
    #[error("field `{field}` is not declared by `{owner}`")]
    UnknownField {
        /// Type identifier of the owner.
        owner: &'static str,
        /// Name that failed to resolve.
        field: String,
    },
    /// The value lies outside the field's declared domain.
    #[error("field `{field}` of `{owner}` cannot hold {value}")]
    InvalidValue {
        /// Type identifier of the owner.
        owner: &'static str,
        /// Field that rejected the value.
        field: &'static str,
        /// Rejected value.
        value: FieldValue,
    },
    /// The schema declares a field without any admissible value.
    #[error("field `{field}` of `{owner}` declares no allowed values")]
    EmptyDomain {
        /// Type identifier of the owner.
        owner: &'static str,
        /// Field with the empty domain.
        field: &'static str,
    },
}

/// Complete, validated mapping from declared field names to values.
#[derive(Clone, Debug)]
pub struct FieldValues {
    owner: &'static str,
    schema: &'static [FieldSpec],
    values: BTreeMap<&'static str, FieldValue>,
}

impl FieldValues {
    /// Builds a bag for `owner`, applying `provided` on top of the schema defaults.
    ///
    /// Nothing is returned unless every provided field is declared and every
    /// value is admissible.
    pub fn from_schema<'a, I>(
        owner: &'static str,
        schema: &'static [FieldSpec],
        provided: I,
    ) -> Result<Self, FieldError>
    where
        I: IntoIterator<Item = (&'a str, FieldValue)>,
    {
        let mut values = BTreeMap::new();
        for spec in schema {
            let default = spec.default_value().ok_or(FieldError::EmptyDomain {
                owner,
                field: spec.name,
            })?;
            let _ = values.insert(spec.name, default);
        }

        let mut bag = Self {
            owner,
            schema,
            values,
        };
        for (name, value) in provided {
            let _ = bag.set(name, value)?;
        }
        Ok(bag)
    }

    /// Type identifier of the owner.
    #[must_use]
    pub const fn owner(&self) -> &'static str {
        self.owner
    }

    /// Schema the bag is validated against.
    #[must_use]
    pub const fn schema(&self) -> &'static [FieldSpec] {
        self.schema
    }

    /// Current value of `name`, if declared.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.values.get(name).copied()
    }

    /// Replaces the value of `name`, returning the previous value.
    ///
    /// The bag is left untouched when validation fails.
    pub fn set(&mut self, name: &str, value: FieldValue) -> Result<FieldValue, FieldError> {
        let spec = self
            .schema
            .iter()
            .find(|spec| spec.name == name)
            .ok_or_else(|| FieldError::UnknownField {
                owner: self.owner,
                field: name.to_owned(),
            })?;
        if !spec.admits(&value) {
            return Err(FieldError::InvalidValue {
                owner: self.owner,
                field: spec.name,
                value,
            });
        }
        let previous = self.values.insert(spec.name, value);
        Ok(previous.unwrap_or(value))
    }

    /// Iterates over the fields sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, FieldValue)> + '_ {
        self.values.iter().map(|(name, value)| (*name, *value))
    }

    /// Number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Reports whether the schema declares no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for FieldValues {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.values == other.values
    }
}

impl Eq for FieldValues {}

impl Hash for FieldValues {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (name, value) in &self.values {
            name.hash(state);
            value.hash(state);
        }
    }
}

impl fmt::Display for FieldValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (index, (name, value)) in self.values.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}
