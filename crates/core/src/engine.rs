use std::collections::HashSet;

use serde::Serialize;

use crate::error::{CatalogError, EngineError};
use crate::intent::{
    builtin_catalog, catalog_from_json, normalize_utterance, IntentSpec, EMERGENCY, FALLBACK,
};
use crate::models::{Resolution, StateSnapshot};
use crate::responder::{Responder, ResponderRegistry};

#[derive(Debug, Clone)]
struct CompiledIntent {
    spec: IntentSpec,
    responder: Responder,
}

/// Which intent won an utterance and, unless it fell through, the pattern
/// that made it win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchTrace {
    pub intent: String,
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentSummary {
    pub name: String,
    pub priority: i32,
    pub pattern_count: usize,
}

/// Rule-based intent matcher over an ordered catalog.
///
/// Intents are evaluated by descending priority, ties kept in declaration
/// order. The first intent with any trigger pattern contained in the
/// lowercased utterance wins; otherwise the fallback intent answers. A built
/// engine never fails on free text.
#[derive(Debug, Clone)]
pub struct IntentEngine {
    ordered: Vec<CompiledIntent>,
    fallback: usize,
}

impl IntentEngine {
    pub fn new(
        catalog: Vec<IntentSpec>,
        responders: &ResponderRegistry,
    ) -> Result<Self, CatalogError> {
        validate_catalog(&catalog)?;

        let mut ordered = catalog
            .into_iter()
            .map(|spec| {
                let responder = responders
                    .get(&spec.name)
                    .ok_or_else(|| CatalogError::MissingResponder(spec.name.clone()))?;
                Ok(CompiledIntent { spec, responder })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        // sort_by is stable, so equal priorities keep declaration order
        ordered.sort_by(|a, b| b.spec.priority.cmp(&a.spec.priority));

        let fallback = ordered
            .iter()
            .position(|intent| intent.spec.name == FALLBACK)
            .ok_or(CatalogError::RequiredIntent {
                name: FALLBACK,
                found: 0,
            })?;

        Ok(Self { ordered, fallback })
    }

    pub fn builtin() -> Self {
        Self::new(builtin_catalog(), &ResponderRegistry::builtin())
            .unwrap_or_else(|err| panic!("builtin intent catalog is invalid: {err}"))
    }

    pub fn from_json(json: &str, responders: &ResponderRegistry) -> Result<Self, CatalogError> {
        let catalog =
            catalog_from_json(json).map_err(|err| CatalogError::InvalidJson(err.to_string()))?;
        Self::new(catalog, responders)
    }

    pub fn resolve(&self, utterance: &str, state: &StateSnapshot) -> Resolution {
        let (index, _) = self.match_index(utterance);
        let intent = &self.ordered[index];
        Resolution {
            intent: intent.spec.name.clone(),
            text: (intent.responder)(state),
        }
    }

    /// Direct lookup by name, bypassing pattern matching.
    pub fn respond_to(&self, intent: &str, state: &StateSnapshot) -> Result<String, EngineError> {
        self.ordered
            .iter()
            .find(|compiled| compiled.spec.name == intent)
            .map(|compiled| (compiled.responder)(state))
            .ok_or_else(|| EngineError::UnknownIntent(intent.to_string()))
    }

    pub fn matched_pattern(&self, utterance: &str) -> MatchTrace {
        let (index, pattern) = self.match_index(utterance);
        MatchTrace {
            intent: self.ordered[index].spec.name.clone(),
            pattern,
        }
    }

    pub fn contains(&self, intent: &str) -> bool {
        self.ordered.iter().any(|compiled| compiled.spec.name == intent)
    }

    /// Intents in evaluation order.
    pub fn intents(&self) -> Vec<IntentSummary> {
        self.ordered
            .iter()
            .map(|compiled| IntentSummary {
                name: compiled.spec.name.clone(),
                priority: compiled.spec.priority,
                pattern_count: compiled.spec.patterns.len(),
            })
            .collect()
    }

    fn match_index(&self, utterance: &str) -> (usize, Option<String>) {
        let normalized = normalize_utterance(utterance);

        self.ordered
            .iter()
            .enumerate()
            .find_map(|(index, compiled)| {
                compiled
                    .spec
                    .first_match(&normalized)
                    .map(|pattern| (index, Some(pattern.to_string())))
            })
            .unwrap_or((self.fallback, None))
    }
}

fn validate_catalog(catalog: &[IntentSpec]) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for spec in catalog {
        if !seen.insert(spec.name.as_str()) {
            return Err(CatalogError::DuplicateIntent(spec.name.clone()));
        }
    }

    for required in [FALLBACK, EMERGENCY] {
        let found = catalog.iter().filter(|spec| spec.name == required).count();
        if found != 1 {
            return Err(CatalogError::RequiredIntent {
                name: required,
                found,
            });
        }
    }

    for spec in catalog {
        if spec.name == FALLBACK {
            if !spec.patterns.is_empty() {
                return Err(CatalogError::FallbackHasPatterns);
            }
            continue;
        }

        if spec.patterns.is_empty() {
            return Err(CatalogError::NoPatterns(spec.name.clone()));
        }

        for pattern in &spec.patterns {
            if pattern.is_empty() {
                return Err(CatalogError::EmptyPattern {
                    intent: spec.name.clone(),
                });
            }
            if pattern.to_lowercase() != *pattern {
                return Err(CatalogError::PatternNotLowercase {
                    intent: spec.name.clone(),
                    pattern: pattern.clone(),
                });
            }
        }
    }

    let emergency_priority = catalog
        .iter()
        .find(|spec| spec.name == EMERGENCY)
        .map(|spec| spec.priority)
        .unwrap_or_default();
    if catalog
        .iter()
        .any(|spec| spec.name != EMERGENCY && spec.priority >= emergency_priority)
    {
        return Err(CatalogError::EmergencyNotHighestPriority);
    }

    Ok(())
}
