//! XSD Content Model Validators
//!
//! This module provides the compiled content model of a complex type:
//! - [`ContentModel::compile`] checks a particle tree and binds it to its
//!   effective open content
//! - [`ModelVisitor`] matches a sequence of child names against the model
//! - [`check_restriction`] verifies that a content model is a valid
//!   restriction of its base
//!
//! Matching is deterministic and greedy: at each step the first particle
//! (in declaration order) able to accept the name is taken, and a group
//! keeps its current iteration going before starting a new one.
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#coss-particle

use indexmap::IndexSet;

use crate::error::SchemaError;
use crate::limits::Limits;
use crate::namespaces::QName;

use super::globals::XsdGlobals;
use super::groups::{ModelGroup, ModelType};
use super::open_content::{OpenContent, OpenContentMode};
use super::particles::{ElementParticle, Occurs, Particle, WildcardParticle};
use super::wildcards::{DefinedNames, NameScope, ProcessContents, Wildcard};

/// A particle tree merged with its effective open content
#[derive(Debug, Clone, PartialEq)]
pub struct ContentModel {
    root: ModelGroup,
    open_content: Option<OpenContent>,
    siblings: IndexSet<QName>,
}

impl ContentModel {
    /// Compile a model group with optional open content
    pub fn compile(
        root: ModelGroup,
        open_content: Option<OpenContent>,
        limits: &Limits,
    ) -> Result<Self, SchemaError> {
        limits
            .check_model_depth(root.depth())
            .map_err(|e| SchemaError::new(e.to_string()))?;
        check_group(&root, &root.compositor.to_string(), true)?;
        let open_content = open_content.filter(|oc| oc.mode != OpenContentMode::None);
        let siblings = root.element_names();
        tracing::debug!(
            compositor = %root.compositor,
            particles = root.particles.len(),
            open_content = ?open_content.as_ref().map(|oc| oc.mode),
            "compiled content model"
        );
        Ok(Self {
            root,
            open_content,
            siblings,
        })
    }

    /// An empty model: no particles, no open content
    pub fn empty() -> Self {
        Self {
            root: ModelGroup::sequence(Vec::new()),
            open_content: None,
            siblings: IndexSet::new(),
        }
    }

    /// Content of anyType: any element, lax, any number of times
    pub fn any_content() -> Self {
        let wildcard = Wildcard::any().with_process_contents(ProcessContents::Lax);
        Self {
            root: ModelGroup::sequence(vec![Particle::Wildcard(WildcardParticle {
                wildcard,
                occurs: Occurs::zero_or_more(),
            })]),
            open_content: None,
            siblings: IndexSet::new(),
        }
    }

    /// Root model group
    pub fn group(&self) -> &ModelGroup {
        &self.root
    }

    /// Effective open content, never of mode `none`
    pub fn open_content(&self) -> Option<&OpenContent> {
        self.open_content.as_ref()
    }

    /// Element names declared anywhere in the model
    pub fn siblings(&self) -> &IndexSet<QName> {
        &self.siblings
    }

    /// True if the model declares no particle
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// True if the model accepts no children at all
    pub fn is_emptiable(&self) -> bool {
        self.root.is_emptiable()
    }

    /// Start matching children
    pub fn visitor<'a>(&'a self, defined: &'a dyn DefinedNames) -> ModelVisitor<'a> {
        ModelVisitor::new(self, defined)
    }
}

fn check_group(group: &ModelGroup, position: &str, is_root: bool) -> Result<(), SchemaError> {
    check_occurs(group.occurs, position)?;
    if group.compositor == ModelType::All {
        if !is_root {
            return Err(SchemaError::new("an 'all' model group must be the whole content model")
                .with_position(position));
        }
        if group.occurs.max.map_or(true, |max| max > 1) {
            return Err(SchemaError::new("maxOccurs of an 'all' model group must be 0 or 1")
                .with_position(position));
        }
    }
    let mut counters = [0usize; 3];
    for particle in &group.particles {
        let (slot, tag) = match particle {
            Particle::Element(_) => (0, "element"),
            Particle::Wildcard(_) => (1, "any"),
            Particle::Group(g) => (2, match g.compositor {
                ModelType::Sequence => "sequence",
                ModelType::Choice => "choice",
                ModelType::All => "all",
            }),
        };
        let child_position = format!("{}/{}[{}]", position, tag, counters[slot]);
        counters[slot] += 1;
        match particle {
            Particle::Group(inner) => {
                if group.compositor == ModelType::All {
                    return Err(SchemaError::new("an 'all' model group can only contain elements and wildcards")
                        .with_position(child_position));
                }
                check_group(inner, &child_position, false)?;
            }
            other => check_occurs(other.occurs(), &child_position)?,
        }
    }
    Ok(())
}

fn check_occurs(occurs: Occurs, position: &str) -> Result<(), SchemaError> {
    Occurs::new(occurs.min, occurs.max)
        .map(|_| ())
        .map_err(|e| e.with_position(position))
}

// =============================================================================
// Matching
// =============================================================================

/// What accepted a child name
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelMatch<'a> {
    /// A declared element particle
    Element(&'a ElementParticle),
    /// A wildcard particle of the model
    Wildcard(&'a Wildcard),
    /// The open content wildcard
    OpenContent(&'a Wildcard),
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Leaf(u32),
    Group(GroupState),
}

#[derive(Debug, Clone, PartialEq)]
struct GroupState {
    iterations: u32,
    cursor: usize,
    branch: Option<usize>,
    children: Vec<State>,
}

impl State {
    fn fresh(particle: &Particle) -> Self {
        match particle {
            Particle::Group(g) => State::Group(GroupState::fresh(g)),
            _ => State::Leaf(0),
        }
    }
}

impl GroupState {
    fn fresh(group: &ModelGroup) -> Self {
        Self {
            iterations: 0,
            cursor: 0,
            branch: None,
            children: group.particles.iter().map(State::fresh).collect(),
        }
    }
}

fn content_emptiable(group: &ModelGroup) -> bool {
    group.particles.is_empty()
        || match group.compositor {
            ModelType::Choice => group.particles.iter().any(Particle::is_emptiable),
            ModelType::Sequence | ModelType::All => group.particles.iter().all(Particle::is_emptiable),
        }
}

fn step_particle<'a>(
    particle: &'a Particle,
    state: &State,
    name: &QName,
    scope: &NameScope<'_>,
) -> Option<(State, ModelMatch<'a>)> {
    match (particle, state) {
        (Particle::Element(e), State::Leaf(n)) => {
            (e.name == *name && e.occurs.allows(*n)).then(|| (State::Leaf(n + 1), ModelMatch::Element(e)))
        }
        (Particle::Wildcard(w), State::Leaf(n)) => (w.occurs.allows(*n) && w.wildcard.admits(name, scope))
            .then(|| (State::Leaf(n + 1), ModelMatch::Wildcard(&w.wildcard))),
        (Particle::Group(g), State::Group(gs)) => {
            step_group(g, gs, name, scope).map(|(s, m)| (State::Group(s), m))
        }
        _ => None,
    }
}

fn step_group<'a>(
    group: &'a ModelGroup,
    state: &GroupState,
    name: &QName,
    scope: &NameScope<'_>,
) -> Option<(GroupState, ModelMatch<'a>)> {
    if state.iterations > 0 {
        if let Some(result) = step_iteration(group, state, name, scope) {
            return Some(result);
        }
        if !iteration_complete(group, state) {
            return None;
        }
    }
    if !group.occurs.allows(state.iterations) {
        return None;
    }
    let mut fresh = GroupState::fresh(group);
    fresh.iterations = state.iterations + 1;
    step_iteration(group, &fresh, name, scope)
}

fn step_iteration<'a>(
    group: &'a ModelGroup,
    state: &GroupState,
    name: &QName,
    scope: &NameScope<'_>,
) -> Option<(GroupState, ModelMatch<'a>)> {
    let advance = |index: usize, child: State| {
        let mut next = state.clone();
        next.children[index] = child;
        next
    };
    match group.compositor {
        ModelType::Sequence => {
            for index in state.cursor..group.particles.len() {
                let particle = &group.particles[index];
                if let Some((child, matched)) = step_particle(particle, &state.children[index], name, scope) {
                    let mut next = advance(index, child);
                    next.cursor = index;
                    return Some((next, matched));
                }
                if !is_complete(particle, &state.children[index]) {
                    return None;
                }
            }
            None
        }
        ModelType::Choice => match state.branch {
            Some(branch) => step_particle(&group.particles[branch], &state.children[branch], name, scope)
                .map(|(child, matched)| (advance(branch, child), matched)),
            None => group.particles.iter().enumerate().find_map(|(index, particle)| {
                step_particle(particle, &state.children[index], name, scope).map(|(child, matched)| {
                    let mut next = advance(index, child);
                    next.branch = Some(index);
                    (next, matched)
                })
            }),
        },
        ModelType::All => group.particles.iter().enumerate().find_map(|(index, particle)| {
            step_particle(particle, &state.children[index], name, scope)
                .map(|(child, matched)| (advance(index, child), matched))
        }),
    }
}

fn is_complete(particle: &Particle, state: &State) -> bool {
    match (particle, state) {
        (Particle::Group(g), State::Group(gs)) => group_complete(g, gs),
        (particle, State::Leaf(n)) => particle.occurs().satisfied_by(*n),
        _ => false,
    }
}

fn group_complete(group: &ModelGroup, state: &GroupState) -> bool {
    let emptiable = content_emptiable(group);
    if state.iterations == 0 {
        return group.occurs.min == 0 || emptiable;
    }
    iteration_complete(group, state) && (group.occurs.satisfied_by(state.iterations) || emptiable)
}

fn iteration_complete(group: &ModelGroup, state: &GroupState) -> bool {
    let complete = |index: usize| is_complete(&group.particles[index], &state.children[index]);
    match group.compositor {
        ModelType::Sequence => (state.cursor..group.particles.len()).all(complete),
        ModelType::Choice => match state.branch {
            Some(branch) => complete(branch),
            None => content_emptiable(group),
        },
        ModelType::All => (0..group.particles.len()).all(complete),
    }
}

fn collect_expected(particle: &Particle, state: &State, out: &mut Vec<String>) {
    match (particle, state) {
        (Particle::Element(e), State::Leaf(n)) if e.occurs.allows(*n) => out.push(e.name.to_string()),
        (Particle::Wildcard(w), State::Leaf(n)) if w.occurs.allows(*n) => out.push(w.wildcard.to_string()),
        (Particle::Group(g), State::Group(gs)) => collect_group_expected(g, gs, out),
        _ => {}
    }
}

fn collect_group_expected(group: &ModelGroup, state: &GroupState, out: &mut Vec<String>) {
    let in_progress = state.iterations > 0;
    if in_progress {
        collect_iteration_expected(group, state, out);
    }
    if (!in_progress || iteration_complete(group, state)) && group.occurs.allows(state.iterations) {
        let fresh = GroupState::fresh(group);
        collect_iteration_expected(group, &fresh, out);
    }
}

fn collect_iteration_expected(group: &ModelGroup, state: &GroupState, out: &mut Vec<String>) {
    match (group.compositor, state.branch) {
        (ModelType::Sequence, _) => {
            for index in state.cursor..group.particles.len() {
                collect_expected(&group.particles[index], &state.children[index], out);
                if !is_complete(&group.particles[index], &state.children[index]) {
                    break;
                }
            }
        }
        (ModelType::Choice, Some(branch)) => {
            collect_expected(&group.particles[branch], &state.children[branch], out)
        }
        _ => {
            for (particle, child) in group.particles.iter().zip(&state.children) {
                collect_expected(particle, child, out);
            }
        }
    }
}

/// Incremental matcher of child names against a [`ContentModel`]
#[derive(Debug)]
pub struct ModelVisitor<'a> {
    model: &'a ContentModel,
    scope: NameScope<'a>,
    state: GroupState,
    in_suffix: bool,
}

impl<'a> ModelVisitor<'a> {
    /// Create a visitor; `defined` resolves the `##defined` wildcard marker
    pub fn new(model: &'a ContentModel, defined: &'a dyn DefinedNames) -> Self {
        Self {
            model,
            scope: NameScope::new(defined, &model.siblings),
            state: GroupState::fresh(&model.root),
            in_suffix: false,
        }
    }

    /// Match the next child name, advancing the state on success
    ///
    /// On failure the state is left unchanged, so a lax caller can drop the
    /// child and keep matching the following ones.
    pub fn consume(&mut self, name: &QName) -> Option<ModelMatch<'a>> {
        let open_content = self.model.open_content.as_ref();
        if self.in_suffix {
            return open_content
                .and_then(|oc| oc.wildcard())
                .filter(|w| w.admits(name, &self.scope))
                .map(ModelMatch::OpenContent);
        }
        if let Some((state, matched)) = step_group(&self.model.root, &self.state, name, &self.scope) {
            self.state = state;
            return Some(matched);
        }
        let oc = open_content?;
        let wildcard = oc.wildcard().filter(|w| w.admits(name, &self.scope))?;
        match oc.mode {
            OpenContentMode::Interleave => Some(ModelMatch::OpenContent(wildcard)),
            OpenContentMode::Suffix if group_complete(&self.model.root, &self.state) => {
                self.in_suffix = true;
                Some(ModelMatch::OpenContent(wildcard))
            }
            _ => None,
        }
    }

    /// True if the children consumed so far form a complete match
    pub fn is_complete(&self) -> bool {
        self.in_suffix || group_complete(&self.model.root, &self.state)
    }

    /// Descriptions of what could be matched next
    pub fn expected(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.in_suffix {
            collect_group_expected(&self.model.root, &self.state, &mut out);
        }
        let mut seen = IndexSet::new();
        out.retain(|item| seen.insert(item.clone()));
        out
    }
}

// =============================================================================
// Restriction check
// =============================================================================

/// Check that `derived` is a valid restriction of `base`
///
/// Pointless groups are removed first, then particles are compared with the
/// XSD particle derivation rules: every path accepted by `derived` must be
/// accepted by `base`.
pub fn check_restriction(
    derived: &ModelGroup,
    base: &ModelGroup,
    globals: &XsdGlobals,
) -> Result<(), SchemaError> {
    let derived_root = normalize_group(derived);
    let base_root = normalize_group(base);
    match (&derived_root, &base_root) {
        (None, _) => {
            if base.is_emptiable() {
                Ok(())
            } else {
                Err(SchemaError::new(
                    "an empty content model is not a valid restriction of a non-emptiable base",
                ))
            }
        }
        (Some(_), None) => Err(SchemaError::new(
            "the base content model is empty, so no particle can be added by restriction",
        )),
        (Some(d), Some(b)) => particle_ok(d, b, globals).map_err(|reason| {
            SchemaError::new(format!("content model is not a valid restriction of the base: {}", reason))
        }),
    }
    .map(|()| tracing::trace!("content model restriction checked"))
}

fn normalize(particle: &Particle) -> Option<Particle> {
    match particle {
        Particle::Group(g) => normalize_group(g),
        other if other.occurs().is_empty() => None,
        other => Some(other.clone()),
    }
}

fn normalize_group(group: &ModelGroup) -> Option<Particle> {
    if group.occurs.is_empty() {
        return None;
    }
    let mut particles = Vec::new();
    for particle in group.particles.iter().filter_map(normalize) {
        match particle {
            Particle::Group(inner)
                if inner.compositor == group.compositor
                    && inner.occurs == Occurs::once()
                    && group.compositor != ModelType::All =>
            {
                particles.extend(inner.particles)
            }
            other => particles.push(other),
        }
    }
    match particles.len() {
        0 => None,
        1 if group.occurs == Occurs::once() => particles.pop(),
        _ => Some(Particle::Group(ModelGroup {
            compositor: group.compositor,
            particles,
            occurs: group.occurs,
        })),
    }
}

fn occurs_ok(derived: Occurs, base: Occurs, what: &str) -> Result<(), String> {
    if derived.is_within(&base) {
        Ok(())
    } else {
        Err(format!("occurrence range {} of {} is not within {}", derived, what, base))
    }
}

fn particle_ok(derived: &Particle, base: &Particle, globals: &XsdGlobals) -> Result<(), String> {
    match (derived, base) {
        (Particle::Element(d), Particle::Element(b)) => element_ok(d, b, globals),
        (Particle::Element(d), Particle::Wildcard(b)) => {
            if !b.wildcard.admits(&d.name, &NameScope::default()) {
                return Err(format!("element {} is not admitted by the base wildcard", d.name));
            }
            occurs_ok(d.occurs, b.occurs, &derived.describe())
        }
        (Particle::Wildcard(d), Particle::Wildcard(b)) => {
            if !d.wildcard.is_subset(&b.wildcard) {
                return Err(format!("wildcard {} is not a subset of {}", d.wildcard, b.wildcard));
            }
            if d.wildcard.process_contents < b.wildcard.process_contents {
                return Err(format!(
                    "processContents '{}' is weaker than the base's '{}'",
                    d.wildcard.process_contents, b.wildcard.process_contents
                ));
            }
            occurs_ok(d.occurs, b.occurs, "any")
        }
        (Particle::Group(d), Particle::Wildcard(b)) => {
            let range = Occurs {
                min: d.effective_min_occurs(),
                max: d.effective_max_occurs(),
            };
            occurs_ok(range, b.occurs, &derived.describe())?;
            leaves_admitted(d, &b.wildcard)
        }
        (Particle::Element(_), Particle::Group(b)) => {
            let wrapped = ModelGroup::new(b.compositor, vec![derived.clone()]);
            group_ok(&wrapped, b, globals)
        }
        (Particle::Group(d), Particle::Group(b)) => group_ok(d, b, globals),
        (Particle::Wildcard(_), _) => Err(format!(
            "a wildcard cannot restrict {}",
            base.describe()
        )),
        (Particle::Group(_), Particle::Element(b)) => Err(format!(
            "{} cannot restrict element {}",
            derived.describe(),
            b.name
        )),
    }
}

fn element_ok(derived: &ElementParticle, base: &ElementParticle, globals: &XsdGlobals) -> Result<(), String> {
    if derived.name != base.name {
        return Err(format!("element {} does not match base element {}", derived.name, base.name));
    }
    occurs_ok(derived.occurs, base.occurs, &format!("element {}", derived.name))?;
    if let (Some(d), Some(b)) = (derived.decl(globals), base.decl(globals)) {
        if d.nillable && !b.nillable {
            return Err(format!("element {} cannot become nillable", d.name));
        }
        if let Some(fixed) = &b.fixed {
            if d.fixed.as_ref() != Some(fixed) {
                return Err(format!("element {} must keep the fixed value '{}'", d.name, fixed));
            }
        }
        if !globals.is_derived_from(d.type_id, b.type_id) {
            return Err(format!(
                "type of element {} is not derived from {}",
                d.name,
                globals.display_name(b.type_id)
            ));
        }
    }
    Ok(())
}

fn leaves_admitted(group: &ModelGroup, wildcard: &Wildcard) -> Result<(), String> {
    for particle in &group.particles {
        match particle {
            Particle::Element(e) if !wildcard.admits(&e.name, &NameScope::default()) => {
                return Err(format!("element {} is not admitted by the base wildcard", e.name))
            }
            Particle::Wildcard(w) if !w.wildcard.is_subset(wildcard) => {
                return Err(format!("wildcard {} is not a subset of {}", w.wildcard, wildcard))
            }
            Particle::Group(g) => leaves_admitted(g, wildcard)?,
            _ => {}
        }
    }
    Ok(())
}

fn group_ok(derived: &ModelGroup, base: &ModelGroup, globals: &XsdGlobals) -> Result<(), String> {
    use ModelType::*;
    match (derived.compositor, base.compositor) {
        (Sequence, Sequence) | (All, All) | (Choice, Choice) => {
            occurs_ok(derived.occurs, base.occurs, &derived.compositor.to_string())?;
            match derived.compositor {
                Sequence => recurse_ordered(&derived.particles, &base.particles, globals, false),
                Choice => recurse_ordered(&derived.particles, &base.particles, globals, true),
                All => recurse_unordered(&derived.particles, &base.particles, globals),
            }
        }
        (Sequence, All) => {
            occurs_ok(derived.occurs, base.occurs, "sequence")?;
            recurse_unordered(&derived.particles, &base.particles, globals)
        }
        (Sequence, Choice) => {
            for particle in &derived.particles {
                if !base.particles.iter().any(|b| particle_ok(particle, b, globals).is_ok()) {
                    return Err(format!("{} matches no alternative of the base choice", particle.describe()));
                }
            }
            let count = derived.particles.len() as u32;
            let range = Occurs {
                min: derived.occurs.min.saturating_mul(count),
                max: derived.occurs.max.map(|max| max.saturating_mul(count)),
            };
            occurs_ok(range, base.occurs, "sequence")
        }
        (d, b) => Err(format!("a {} group cannot restrict a {} group", d, b)),
    }
}

fn recurse_ordered(derived: &[Particle], base: &[Particle], globals: &XsdGlobals, lax: bool) -> Result<(), String> {
    let mut next = 0;
    for particle in derived {
        loop {
            let candidate = base.get(next).ok_or_else(|| {
                format!("{} has no counterpart in the base content model", particle.describe())
            })?;
            next += 1;
            match particle_ok(particle, candidate, globals) {
                Ok(()) => break,
                Err(reason) if !lax && !candidate.is_emptiable() => return Err(reason),
                Err(_) => {}
            }
        }
    }
    if !lax {
        if let Some(missing) = base[next..].iter().find(|p| !p.is_emptiable()) {
            return Err(format!("required {} of the base is missing", missing.describe()));
        }
    }
    Ok(())
}

fn recurse_unordered(derived: &[Particle], base: &[Particle], globals: &XsdGlobals) -> Result<(), String> {
    let mut used = vec![false; base.len()];
    for particle in derived {
        let found = base
            .iter()
            .enumerate()
            .find(|(index, candidate)| !used[*index] && particle_ok(particle, candidate, globals).is_ok())
            .map(|(index, _)| index);
        match found {
            Some(index) => used[index] = true,
            None => return Err(format!("{} has no counterpart in the base content model", particle.describe())),
        }
    }
    match base.iter().zip(&used).find(|(p, used)| !**used && !p.is_emptiable()) {
        Some((missing, _)) => Err(format!("required {} of the base is missing", missing.describe())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::wildcards::NamespaceConstraint;
    use pretty_assertions::assert_eq;

    fn q(name: &str) -> QName {
        QName::local(name)
    }

    fn elem(name: &str, min: u32, max: Option<u32>) -> Particle {
        Particle::Element(ElementParticle::reference(q(name), Occurs::new(min, max).unwrap()))
    }

    fn any(namespaces: &[&str], min: u32, max: Option<u32>) -> Particle {
        Particle::Wildcard(WildcardParticle {
            wildcard: Wildcard::new(NamespaceConstraint::only(namespaces.iter().map(|n| Some(*n)))),
            occurs: Occurs::new(min, max).unwrap(),
        })
    }

    fn compile(group: ModelGroup) -> ContentModel {
        ContentModel::compile(group, None, &Limits::default()).unwrap()
    }

    fn run(model: &ContentModel, names: &[QName]) -> (usize, bool) {
        let defined: IndexSet<QName> = IndexSet::new();
        let mut visitor = model.visitor(&defined);
        let matched = names.iter().take_while(|n| visitor.consume(n).is_some()).count();
        (matched, visitor.is_complete())
    }

    fn names(list: &[&str]) -> Vec<QName> {
        list.iter().map(|n| q(n)).collect()
    }

    #[test]
    fn test_sequence_matching() {
        let model = compile(ModelGroup::sequence(vec![
            elem("a", 1, Some(1)),
            elem("b", 0, None),
            elem("c", 1, Some(1)),
        ]));
        assert_eq!(run(&model, &names(&["a", "b", "b", "c"])), (4, true));
        assert_eq!(run(&model, &names(&["a", "c"])), (2, true));
        assert_eq!(run(&model, &names(&["a", "b"])), (2, false));
        assert_eq!(run(&model, &names(&["b"])), (0, false));
        assert_eq!(run(&model, &names(&["a", "c", "b"])), (2, true));
    }

    #[test]
    fn test_choice_prefers_first_alternative() {
        let model = compile(ModelGroup::choice(vec![
            elem("a", 1, Some(1)),
            Particle::Wildcard(WildcardParticle {
                wildcard: Wildcard::any(),
                occurs: Occurs::once(),
            }),
        ]));
        let defined: IndexSet<QName> = IndexSet::new();
        let mut visitor = model.visitor(&defined);
        assert!(matches!(visitor.consume(&q("a")), Some(ModelMatch::Element(_))));
        assert!(visitor.consume(&q("x")).is_none());
        assert!(visitor.is_complete());
    }

    #[test]
    fn test_repeated_group() {
        let inner = ModelGroup::sequence(vec![elem("k", 1, Some(1)), elem("v", 1, Some(1))])
            .with_occurs(Occurs::new(1, Some(2)).unwrap());
        let model = compile(ModelGroup::sequence(vec![Particle::Group(inner)]));
        assert_eq!(run(&model, &names(&["k", "v", "k", "v"])), (4, true));
        assert_eq!(run(&model, &names(&["k", "v", "k"])), (3, false));
        assert_eq!(run(&model, &names(&["k", "v", "k", "v", "k"])), (4, true));
    }

    #[test]
    fn test_all_group() {
        let model = compile(ModelGroup::all(vec![elem("a", 1, Some(1)), elem("b", 0, Some(1))]));
        assert_eq!(run(&model, &names(&["b", "a"])), (2, true));
        assert_eq!(run(&model, &names(&["a", "a"])), (1, true));
        assert_eq!(run(&model, &names(&["b"])), (1, false));
    }

    #[test]
    fn test_all_must_be_top_level() {
        let nested = ModelGroup::sequence(vec![Particle::Group(ModelGroup::all(vec![elem("a", 1, Some(1))]))]);
        let err = ContentModel::compile(nested, None, &Limits::default()).unwrap_err();
        assert_eq!(err.position.as_deref(), Some("sequence/all[0]"));
    }

    #[test]
    fn test_malformed_occurs_position() {
        let mut bad = ElementParticle::reference(q("b"), Occurs::once());
        bad.occurs = Occurs { min: 3, max: Some(1) };
        let group = ModelGroup::sequence(vec![elem("a", 1, Some(1)), Particle::Element(bad)]);
        let err = ContentModel::compile(group, None, &Limits::default()).unwrap_err();
        assert_eq!(err.position.as_deref(), Some("sequence/element[1]"));
    }

    #[test]
    fn test_model_depth_limit() {
        let mut group = ModelGroup::sequence(vec![elem("a", 1, Some(1))]);
        for _ in 0..4 {
            group = ModelGroup::sequence(vec![Particle::Group(group)]);
        }
        let limits = Limits {
            max_model_depth: 3,
            ..Limits::default()
        };
        assert!(ContentModel::compile(group, None, &limits).is_err());
    }

    #[test]
    fn test_suffix_open_content() {
        let open = OpenContent::new(
            OpenContentMode::Suffix,
            Some(Wildcard::new(NamespaceConstraint::only([Some("tns1")]))),
        )
        .unwrap();
        let model = ContentModel::compile(
            ModelGroup::sequence(vec![elem("a", 1, Some(1)), elem("b", 1, Some(1))]),
            Some(open),
            &Limits::default(),
        )
        .unwrap();
        let extra = QName::namespaced("tns1", "x");
        assert_eq!(run(&model, &[q("a"), q("b"), extra.clone(), extra.clone()]), (4, true));
        assert_eq!(run(&model, &[q("a"), extra.clone(), q("b")]), (1, false));
        // once in the suffix, declared particles are closed
        assert_eq!(run(&model, &[q("a"), q("b"), extra, q("b")]), (3, true));
    }

    #[test]
    fn test_interleave_open_content() {
        let open = OpenContent::new(OpenContentMode::Interleave, Some(Wildcard::any())).unwrap();
        let model = ContentModel::compile(
            ModelGroup::sequence(vec![elem("a", 1, Some(1)), elem("b", 1, Some(1))]),
            Some(open),
            &Limits::default(),
        )
        .unwrap();
        assert_eq!(run(&model, &names(&["x", "a", "y", "b", "z"])), (5, true));
    }

    #[test]
    fn test_defined_sibling_in_open_content() {
        let wildcard = Wildcard::any().excluding(crate::validators::wildcards::QNameExclusion::DefinedSibling);
        let open = OpenContent::new(OpenContentMode::Interleave, Some(wildcard)).unwrap();
        let model = ContentModel::compile(
            ModelGroup::sequence(vec![elem("a", 1, Some(1))]),
            Some(open),
            &Limits::default(),
        )
        .unwrap();
        assert_eq!(run(&model, &names(&["a", "a"])), (1, true));
        assert_eq!(run(&model, &names(&["a", "z"])), (2, true));
    }

    #[test]
    fn test_expected_names() {
        let model = compile(ModelGroup::sequence(vec![
            elem("a", 0, Some(1)),
            elem("b", 1, Some(1)),
            elem("c", 1, Some(1)),
        ]));
        let defined: IndexSet<QName> = IndexSet::new();
        let visitor = model.visitor(&defined);
        assert_eq!(visitor.expected(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_restriction_of_sequence() {
        let globals = XsdGlobals::new();
        let base = ModelGroup::sequence(vec![elem("a", 0, Some(5)), elem("b", 1, Some(1)), elem("c", 0, Some(1))]);
        let ok = ModelGroup::sequence(vec![elem("a", 1, Some(2)), elem("b", 1, Some(1))]);
        assert!(check_restriction(&ok, &base, &globals).is_ok());

        let skips_required = ModelGroup::sequence(vec![elem("a", 1, Some(1)), elem("c", 1, Some(1))]);
        assert!(check_restriction(&skips_required, &base, &globals).is_err());

        let widens = ModelGroup::sequence(vec![elem("a", 0, Some(6)), elem("b", 1, Some(1))]);
        assert!(check_restriction(&widens, &base, &globals).is_err());

        let reorders = ModelGroup::sequence(vec![elem("b", 1, Some(1)), elem("a", 1, Some(1))]);
        assert!(check_restriction(&reorders, &base, &globals).is_err());
    }

    #[test]
    fn test_restriction_of_choice_and_wildcard() {
        let globals = XsdGlobals::new();
        let choice = ModelGroup::choice(vec![elem("a", 1, Some(1)), elem("b", 1, Some(1))]);
        let pick_one = ModelGroup::sequence(vec![elem("b", 1, Some(1))]);
        assert!(check_restriction(&pick_one, &choice, &globals).is_ok());

        let wide = ModelGroup::sequence(vec![any(&["tns1", "tns2"], 0, None)]);
        let narrow = ModelGroup::sequence(vec![any(&["tns1"], 0, Some(3))]);
        assert!(check_restriction(&narrow, &wide, &globals).is_ok());
        assert!(check_restriction(&wide, &narrow, &globals).is_err());

        let mut lax = narrow.clone();
        if let Particle::Wildcard(w) = &mut lax.particles[0] {
            w.wildcard.process_contents = ProcessContents::Skip;
        }
        assert!(check_restriction(&lax, &wide, &globals).is_err());
    }

    #[test]
    fn test_restriction_to_empty() {
        let globals = XsdGlobals::new();
        let empty = ModelGroup::sequence(vec![]);
        let optional = ModelGroup::sequence(vec![elem("a", 0, Some(1))]);
        let required = ModelGroup::sequence(vec![elem("a", 1, Some(1))]);
        assert!(check_restriction(&empty, &optional, &globals).is_ok());
        assert!(check_restriction(&empty, &required, &globals).is_err());
        assert!(check_restriction(&required, &empty, &globals).is_err());
    }
}
