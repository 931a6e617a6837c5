use crate::error::ConfigurationError;
use crate::resolver::RepresentationResolver;

/// All adaptation sets of the period, in document order, each with the
/// resolver for its representations.
///
/// Sets are kept by position. The `id` attribute is optional in an MPD, so it
/// is only a label here and only declared ids are checked for duplicates.
#[derive(Debug, Clone, Default)]
pub struct AdaptationSetRegistry {
    adaptation_sets: Vec<(Option<String>, RepresentationResolver)>,
}

impl AdaptationSetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an adaptation set.
    ///
    /// Representation ids must be unique across the whole manifest so that a
    /// fragment request can be routed by representation id alone.
    pub fn register_adaptation_set(
        &mut self,
        id: Option<&str>,
        resolver: RepresentationResolver,
    ) -> Result<(), ConfigurationError> {
        if let Some(id) = id {
            if self.adaptation_set(id).is_some() {
                return Err(ConfigurationError::DuplicateAdaptationSet {
                    adaptation_set_id: id.to_string(),
                });
            }
        }
        if let Some(duplicate) = resolver
            .representation_ids()
            .find(|repr_id| self.find_resolver_for_representation(repr_id).is_some())
        {
            return Err(ConfigurationError::DuplicateRepresentation {
                representation_id: duplicate.to_string(),
            });
        }

        self.adaptation_sets.push((id.map(str::to_string), resolver));
        Ok(())
    }

    pub fn find_resolver_for_representation(&self, representation_id: &str) -> Option<&RepresentationResolver> {
        self.adaptation_sets
            .iter()
            .map(|(_, resolver)| resolver)
            .find(|resolver| resolver.has_representation(representation_id))
    }

    pub fn adaptation_set(&self, id: &str) -> Option<&RepresentationResolver> {
        self.adaptation_sets
            .iter()
            .find(|(existing, _)| existing.as_deref() == Some(id))
            .map(|(_, resolver)| resolver)
    }

    /// Declared ids in document order; `None` for a set without an `id`.
    pub fn all_adaptation_set_ids(&self) -> Vec<Option<&str>> {
        self.adaptation_sets.iter().map(|(id, _)| id.as_deref()).collect()
    }

    pub fn resolvers(&self) -> impl Iterator<Item = &RepresentationResolver> {
        self.adaptation_sets.iter().map(|(_, resolver)| resolver)
    }
}
