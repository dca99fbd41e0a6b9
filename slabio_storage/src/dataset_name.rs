use derive_more::Display;
use thiserror::Error;

/// A dataset name.
///
/// A dataset name is a `/` separated path of one or more non-empty components, such as `data` or `run1/energy`.
/// A leading `/` is accepted and dropped. The components `.` and `..` are not permitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub struct DatasetName(String);

/// An invalid dataset name.
#[derive(Debug, Clone, Error)]
#[error("invalid dataset name {0}")]
pub struct DatasetNameError(String);

impl DatasetName {
    /// Create a new dataset name from `name`.
    ///
    /// # Errors
    /// Returns [`DatasetNameError`] if `name` is not valid according to [`DatasetName::validate`].
    pub fn new(name: impl Into<String>) -> Result<Self, DatasetNameError> {
        let name: String = name.into();
        let trimmed = name.strip_prefix('/').unwrap_or(&name);
        if Self::validate(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(DatasetNameError(name))
        }
    }

    /// Extracts a string slice of the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a dataset name without its leading `/`.
    #[must_use]
    pub fn validate(name: &str) -> bool {
        !name.is_empty()
            && name
                .split('/')
                .all(|component| !component.is_empty() && component != "." && component != "..")
    }

    /// The path components of the name.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// The final component of the name.
    #[must_use]
    pub fn basename(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Returns true if `other` is nested below this name, e.g. `run1` is an ancestor of `run1/energy`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        other
            .0
            .strip_prefix(&self.0)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl TryFrom<&str> for DatasetName {
    type Error = DatasetNameError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

impl TryFrom<String> for DatasetName {
    type Error = DatasetNameError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_name_valid() {
        let name = DatasetName::new("data").unwrap();
        assert_eq!(name.as_str(), "data");
        assert_eq!(name.basename(), "data");

        let name = DatasetName::new("/run1/energy").unwrap();
        assert_eq!(name.as_str(), "run1/energy");
        assert_eq!(name.to_string(), "run1/energy");
        assert_eq!(name.components().collect::<Vec<_>>(), vec!["run1", "energy"]);
        assert_eq!(name.basename(), "energy");

        let run = DatasetName::new("run1").unwrap();
        assert!(run.is_ancestor_of(&name));
        assert!(!name.is_ancestor_of(&run));
        assert!(!run.is_ancestor_of(&run));
        assert!(!run.is_ancestor_of(&DatasetName::new("run10/energy").unwrap()));
    }

    #[test]
    fn dataset_name_invalid() {
        for name in ["", "/", "a//b", "a/", "../a", "a/./b", "//a"] {
            assert!(DatasetName::new(name).is_err(), "{name}");
        }
        assert!(DatasetName::try_from("a/b").is_ok());
    }
}
