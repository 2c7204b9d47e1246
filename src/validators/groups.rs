//! XSD Model Group validators
//!
//! This module implements model groups for XSD content models:
//! - xs:sequence - ordered content
//! - xs:choice - alternative content
//! - xs:all - unordered content, each child at most its declared bound
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#Model_Groups

use indexmap::IndexSet;

use crate::namespaces::QName;

use super::particles::{Occurs, Particle};

/// Model group compositor type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModelType {
    /// Ordered sequence of particles
    #[default]
    Sequence,
    /// One of multiple alternatives
    Choice,
    /// Unordered set of particles
    All,
}

impl ModelType {
    /// Parse from a local element name
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "sequence" => Some(Self::Sequence),
            "choice" => Some(Self::Choice),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequence => write!(f, "sequence"),
            Self::Choice => write!(f, "choice"),
            Self::All => write!(f, "all"),
        }
    }
}

/// A sequence, choice or all group with its particles
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelGroup {
    /// Compositor
    pub compositor: ModelType,
    /// Child particles in declaration order
    pub particles: Vec<Particle>,
    /// Occurrence bounds of the group itself
    pub occurs: Occurs,
}

impl ModelGroup {
    /// Create a group occurring once
    pub fn new(compositor: ModelType, particles: Vec<Particle>) -> Self {
        Self {
            compositor,
            particles,
            occurs: Occurs::once(),
        }
    }

    /// `xs:sequence`
    pub fn sequence(particles: Vec<Particle>) -> Self {
        Self::new(ModelType::Sequence, particles)
    }

    /// `xs:choice`
    pub fn choice(particles: Vec<Particle>) -> Self {
        Self::new(ModelType::Choice, particles)
    }

    /// `xs:all`
    pub fn all(particles: Vec<Particle>) -> Self {
        Self::new(ModelType::All, particles)
    }

    /// Replace the occurrence bounds
    pub fn with_occurs(mut self, occurs: Occurs) -> Self {
        self.occurs = occurs;
        self
    }

    /// A group with no particles matches only the empty sequence
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty() || self.occurs.is_empty()
    }

    /// True if the group can match no element at all
    pub fn is_emptiable(&self) -> bool {
        if self.occurs.is_emptiable() || self.particles.is_empty() {
            return true;
        }
        match self.compositor {
            ModelType::Choice => self.particles.iter().any(Particle::is_emptiable),
            ModelType::Sequence | ModelType::All => self.particles.iter().all(Particle::is_emptiable),
        }
    }

    /// Minimum number of elements a match of the group consumes
    pub fn effective_min_occurs(&self) -> u32 {
        let per_iteration = match self.compositor {
            ModelType::Choice => self
                .particles
                .iter()
                .map(particle_min)
                .min()
                .unwrap_or(0),
            ModelType::Sequence | ModelType::All => {
                self.particles.iter().map(particle_min).fold(0u32, u32::saturating_add)
            }
        };
        per_iteration.saturating_mul(self.occurs.min)
    }

    /// Maximum number of elements a match of the group consumes (`None` = unbounded)
    pub fn effective_max_occurs(&self) -> Option<u32> {
        if self.is_empty() {
            return Some(0);
        }
        let mut per_iteration = Some(0u32);
        for particle in &self.particles {
            let max = particle_max(particle);
            per_iteration = match (self.compositor, per_iteration, max) {
                (_, None, _) | (_, _, None) => None,
                (ModelType::Choice, Some(a), Some(b)) => Some(a.max(b)),
                (_, Some(a), Some(b)) => Some(a.saturating_add(b)),
            };
        }
        match (per_iteration, self.occurs.max) {
            (Some(0), _) => Some(0),
            (Some(a), Some(b)) => Some(a.saturating_mul(b)),
            _ => None,
        }
    }

    /// Names of every element particle in the group, nested groups included
    pub fn element_names(&self) -> IndexSet<QName> {
        let mut names = IndexSet::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, names: &mut IndexSet<QName>) {
        for particle in &self.particles {
            match particle {
                Particle::Element(e) => {
                    names.insert(e.name.clone());
                }
                Particle::Group(g) => g.collect_names(names),
                Particle::Wildcard(_) => {}
            }
        }
    }

    /// Nesting depth of model groups, this group counting as 1
    pub fn depth(&self) -> usize {
        1 + self
            .particles
            .iter()
            .map(|p| match p {
                Particle::Group(g) => g.depth(),
                _ => 0,
            })
            .max()
            .unwrap_or(0)
    }
}

fn particle_min(particle: &Particle) -> u32 {
    match particle {
        Particle::Group(g) => g.effective_min_occurs(),
        other => other.occurs().min,
    }
}

fn particle_max(particle: &Particle) -> Option<u32> {
    match particle {
        Particle::Group(g) => g.effective_max_occurs(),
        other => other.occurs().max,
    }
}
