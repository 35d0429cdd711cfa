//! Service addressing context handed to every handler.

/// Separator between the hierarchical segments of a service name.
pub const SERVICE_SEPARATOR: char = ':';

/// Service name that invoked a handler, with its namespace segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Space {
    service: String,
    segments: Vec<String>,
}

impl Space {
    /// Splits `service` on [`SERVICE_SEPARATOR`].
    ///
    /// Segments are not validated; a name without separators yields a single
    /// segment and an empty name yields one empty segment.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        let service = service.into();
        let segments = service.split(SERVICE_SEPARATOR).map(str::to_owned).collect();
        Self { service, segments }
    }

    /// Service name, verbatim.
    #[must_use]
    pub fn service(&self) -> &str {
        self.service.as_str()
    }

    /// Namespace segments of the service name.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::hierarchical("rest:util:net", &["rest", "util", "net"])]
    #[case::flat("util", &["util"])]
    #[case::empty("", &[""])]
    #[case::trailing("rest:", &["rest", ""])]
    fn splits_service_names(#[case] service: &str, #[case] expected: &[&str]) {
        let space = Space::new(service);
        assert_eq!(space.service(), service);
        assert_eq!(space.segments(), expected);
    }
}
