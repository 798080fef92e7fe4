use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::{PipelineError, PipelineResult};
use crate::interpolation::CubicSpline;
use crate::models::InterpolantKey;

/// Resolves an interpolant for a `(participant, emotion)` key.
pub trait InterpolantLookup {
    fn get(&self, key: &InterpolantKey) -> PipelineResult<Arc<CubicSpline>>;
}

/// In-memory snapshot of the store. Owns every loaded spline; callers only
/// get shared immutable handles.
#[derive(Debug, Clone, Default)]
pub struct InterpolantCache {
    splines: HashMap<InterpolantKey, Arc<CubicSpline>>,
}

impl InterpolantCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: InterpolantKey, spline: CubicSpline) {
        self.splines.insert(key, Arc::new(spline));
    }

    pub fn len(&self) -> usize {
        self.splines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splines.is_empty()
    }

    pub fn keys(&self) -> BTreeSet<InterpolantKey> {
        self.splines.keys().cloned().collect()
    }
}

impl FromIterator<(InterpolantKey, CubicSpline)> for InterpolantCache {
    fn from_iter<I: IntoIterator<Item = (InterpolantKey, CubicSpline)>>(iter: I) -> Self {
        let mut cache = Self::new();
        for (key, spline) in iter {
            cache.insert(key, spline);
        }
        cache
    }
}

impl InterpolantLookup for InterpolantCache {
    fn get(&self, key: &InterpolantKey) -> PipelineResult<Arc<CubicSpline>> {
        self.splines
            .get(key)
            .cloned()
            .ok_or_else(|| PipelineError::NotFound {
                participant: key.participant.clone(),
                emotion: key.emotion.clone(),
            })
    }
}
