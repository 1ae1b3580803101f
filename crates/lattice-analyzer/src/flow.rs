//! Flow analyzer — bounded call-chain reconstruction
//!
//! Entry routines are every public routine by default, or the explicit
//! list from configuration. One trace is emitted per call site of the
//! entry; within a trace, hops are the depth-first expansion of resolved
//! callees, bounded by `flow.max_depth`, with cycle breaking along the
//! current path. Unresolvable calls become External terminal hops with the
//! original call text preserved.

use std::collections::BTreeMap;

use lattice_core::cancel::CancelToken;
use lattice_core::config::{AnalysisConfig, EntryPoint};
use lattice_core::diagnostics::Diagnostic;
use lattice_core::error::{AnalysisError, Phase};
use lattice_core::flow::{FlowHop, FlowTrace, Terminal};
use lattice_core::graph::{Provenance, RelationEdge, RelationGraph, RelationKind};
use lattice_core::model::{CallSite, EntityId, Owner, Routine, SemanticModel, TypeDecl};

use crate::builder::{Binding, Resolver, is_public_routine};
use crate::relationships::is_constructor_name;
use crate::typeexpr::parse_type_expr;

pub fn analyze(
    model: &SemanticModel,
    resolver: &Resolver,
    config: &AnalysisConfig,
    graph: &mut RelationGraph,
    diagnostics: &mut Vec<Diagnostic>,
    cancel: &CancelToken,
) -> Result<BTreeMap<EntityId, Vec<FlowTrace>>, AnalysisError> {
    let entries = entry_routines(model, config, diagnostics);
    let max_depth = config.flow.max_depth;
    let mut flows: BTreeMap<EntityId, Vec<FlowTrace>> = BTreeMap::new();

    for entry_id in entries {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled {
                phase: Phase::Analyze,
            });
        }
        let Some(routine) = model.routines.get(&entry_id) else {
            continue;
        };
        if routine.call_sites.is_empty() {
            continue;
        }

        let mut traces = Vec::new();
        for site in &routine.call_sites {
            let mut walker = Walker {
                model,
                resolver,
                graph: &mut *graph,
                max_depth,
                deepest: 0,
            };
            let mut hops = Vec::new();
            let mut path = vec![entry_id.clone()];
            let terminal = walker.expand(site, &entry_id, routine, 1, &mut path, &mut hops);
            let depth = walker.deepest;
            traces.push(FlowTrace {
                entry: entry_id.clone(),
                hops,
                depth,
                terminal,
            });
        }
        flows.insert(entry_id, traces);
    }

    Ok(flows)
}

/// Entry set: explicit (class, method) / (module, function) pairs, or
/// every public routine. Ordered by identifier either way.
fn entry_routines(
    model: &SemanticModel,
    config: &AnalysisConfig,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<EntityId> {
    match &config.flow.entry_points {
        Some(explicit) => {
            let mut out = Vec::new();
            for entry in explicit {
                match resolve_entry(model, entry) {
                    Some(id) => out.push(id),
                    None => diagnostics.push(Diagnostic::resolution_miss(
                        String::new(),
                        None,
                        format!("flow entry point {entry:?} matches no routine"),
                    )),
                }
            }
            out.sort();
            out.dedup();
            out
        }
        None => model
            .routines
            .iter()
            .filter(|(_, r)| is_public_routine(r))
            .map(|(id, _)| id.clone())
            .collect(),
    }
}

fn resolve_entry(model: &SemanticModel, entry: &EntryPoint) -> Option<EntityId> {
    match entry {
        EntryPoint::Method { type_name, method } => {
            let decl = model.find_type(type_name)?;
            decl.methods
                .iter()
                .find(|id| {
                    model
                        .routines
                        .get(id)
                        .is_some_and(|r| &r.name == method)
                })
                .cloned()
        }
        EntryPoint::Function { module, function } => {
            let module = model.modules.values().find(|m| {
                &m.path == module
                    || m.path
                        .rsplit_once('.')
                        .is_some_and(|(stem, _)| stem == module)
            })?;
            module
                .routines
                .iter()
                .find(|id| {
                    model
                        .routines
                        .get(id)
                        .is_some_and(|r| &r.name == function)
                })
                .cloned()
        }
    }
}

enum Resolution {
    Routine { id: EntityId, note: Option<String> },
    External,
}

struct Walker<'a> {
    model: &'a SemanticModel,
    resolver: &'a Resolver,
    graph: &'a mut RelationGraph,
    max_depth: u32,
    deepest: u32,
}

impl<'a> Walker<'a> {
    fn expand(
        &mut self,
        site: &CallSite,
        caller_id: &EntityId,
        caller: &Routine,
        depth: u32,
        path: &mut Vec<EntityId>,
        hops: &mut Vec<FlowHop>,
    ) -> Terminal {
        self.deepest = self.deepest.max(depth);

        match self.resolve_call(site, caller) {
            Resolution::External => {
                hops.push(FlowHop {
                    caller: caller_id.clone(),
                    callee: EntityId::external(),
                    call_text: site.callee.clone(),
                    line: site.line,
                    note: None,
                });
                Terminal::Unresolved
            }
            Resolution::Routine { id: callee_id, note } => {
                hops.push(FlowHop {
                    caller: caller_id.clone(),
                    callee: callee_id.clone(),
                    call_text: site.callee.clone(),
                    line: site.line,
                    note,
                });
                let module_path = self
                    .model
                    .owning_module(caller_id)
                    .and_then(|m| self.model.modules.get(&m).map(|m| m.path.clone()))
                    .unwrap_or_default();
                self.graph.add_edge(RelationEdge {
                    source: caller_id.clone(),
                    target: callee_id.clone(),
                    kind: RelationKind::Calls,
                    cardinality: None,
                    optional: false,
                    provenance: Provenance {
                        file: module_path,
                        line: site.line,
                    },
                });

                if path.contains(&callee_id) {
                    return Terminal::CycleBreak;
                }
                let Some(callee) = self.model.routines.get(&callee_id) else {
                    return Terminal::Unresolved;
                };
                if callee.call_sites.is_empty() {
                    return Terminal::Leaf;
                }
                if depth >= self.max_depth {
                    return Terminal::DepthLimit;
                }

                path.push(callee_id.clone());
                let mut terminal = Terminal::Leaf;
                let sites = callee.call_sites.clone();
                for next in &sites {
                    terminal = self.expand(next, &callee_id, callee, depth + 1, path, hops);
                }
                path.pop();
                terminal
            }
        }
    }

    /// §4.5 resolution cascade: enclosing scope, then self/this with the
    /// MRO walk, then declared receiver types, otherwise External.
    fn resolve_call(&self, site: &CallSite, caller: &Routine) -> Resolution {
        let module_id = match self.model.owning_module(&caller.id) {
            Some(id) => id,
            None => return Resolution::External,
        };
        let owner_type = match &caller.owner {
            Owner::Type(id) => self.model.types.get(id),
            Owner::Module(_) => None,
        };

        match site.receiver.as_deref() {
            None => self.resolve_free_name(site, &module_id),
            Some(receiver) if is_self_receiver(receiver) => {
                let Some(owner) = owner_type else {
                    return Resolution::External;
                };
                self.method_on_type(owner, &site.name)
            }
            Some("parent") => {
                // PHP `parent::` starts the walk at the first base.
                let Some(owner) = owner_type else {
                    return Resolution::External;
                };
                let bases = self.graph.bases_of(&owner.id);
                match bases.iter().find(|b| !b.is_external()) {
                    Some(base) => match self.model.types.get(base) {
                        Some(base_decl) => self.method_on_type(base_decl, &site.name),
                        None => Resolution::External,
                    },
                    None => Resolution::External,
                }
            }
            Some(receiver) => {
                match self.receiver_type(receiver, caller, owner_type, &module_id) {
                    Some(type_id) => match self.model.types.get(&type_id) {
                        Some(decl) => self.method_on_type(decl, &site.name),
                        None => Resolution::External,
                    },
                    None => Resolution::External,
                }
            }
        }
    }

    /// Free-standing names: local module helper first, then imports, then
    /// a constructor of a resolvable type.
    fn resolve_free_name(&self, site: &CallSite, module_id: &EntityId) -> Resolution {
        let name = bare_name(&site.name);

        if let Some(id) = self.resolver.module_routine(module_id, name) {
            return Resolution::Routine { id, note: None };
        }
        match self.resolver.binding(module_id, name) {
            Some(Binding::Routine(id)) => {
                return Resolution::Routine {
                    id: id.clone(),
                    note: None,
                };
            }
            Some(Binding::Type(type_id)) => {
                return self.constructor_of(type_id.clone());
            }
            _ => {}
        }
        // A dotted callee (`module.helper(…)`) through an imported module.
        if let Some((first, rest)) = site.callee.split_once('.') {
            if site.receiver.is_none() || site.receiver.as_deref() == Some(first) {
                if let Some(Binding::Module(target)) = self.resolver.binding(module_id, first) {
                    if !rest.contains('.') {
                        if let Some(id) = self.resolver.module_routine(target, rest) {
                            return Resolution::Routine { id, note: None };
                        }
                    }
                }
            }
        }
        if let Some(type_id) = self.resolver.resolve_type(module_id, name) {
            return self.constructor_of(type_id);
        }
        Resolution::External
    }

    fn constructor_of(&self, type_id: EntityId) -> Resolution {
        let Some(decl) = self.model.types.get(&type_id) else {
            return Resolution::External;
        };
        let ctor = decl.methods.iter().find(|id| {
            self.model
                .routines
                .get(id)
                .is_some_and(|r| is_constructor_name(&r.name))
        });
        match ctor {
            Some(id) => Resolution::Routine {
                id: id.clone(),
                note: None,
            },
            None => Resolution::External,
        }
    }

    /// Method lookup with the MRO walk: the type itself, then bases
    /// left-to-right depth-first with duplicate suppression. When several
    /// bases match, the left-most wins and the hop carries a note.
    fn method_on_type(&self, decl: &TypeDecl, name: &str) -> Resolution {
        let mro = self.linearize(&decl.id);
        let mut winner: Option<(usize, EntityId)> = None;
        let mut base_holders = 0usize;
        for (index, type_id) in mro.iter().enumerate() {
            let Some(candidate) = self.model.types.get(type_id) else {
                continue;
            };
            let found = candidate.methods.iter().find(|id| {
                self.model.routines.get(id).is_some_and(|r| r.name == name)
            });
            if let Some(found) = found {
                if index > 0 {
                    base_holders += 1;
                }
                if winner.is_none() {
                    winner = Some((index, found.clone()));
                }
            }
        }
        match winner {
            Some((index, id)) => Resolution::Routine {
                id,
                // Ambiguity note only when the pick happened among bases.
                note: (index > 0 && base_holders > 1)
                    .then(|| "left-most base wins".to_string()),
            },
            None => Resolution::External,
        }
    }

    /// Left-to-right depth-first linearisation over project bases, with
    /// duplicate suppression.
    fn linearize(&self, type_id: &EntityId) -> Vec<EntityId> {
        let mut order = Vec::new();
        let mut stack = vec![type_id.clone()];
        while let Some(current) = stack.pop() {
            if order.contains(&current) {
                continue;
            }
            order.push(current.clone());
            let bases = self.graph.bases_of(&current);
            for base in bases.into_iter().rev() {
                if !base.is_external() && !order.contains(&base) {
                    stack.push(base);
                }
            }
        }
        order
    }

    /// Declared type of a call receiver: a parameter annotation, an owned
    /// attribute, a typed local, or a type name used statically.
    fn receiver_type(
        &self,
        receiver: &str,
        caller: &Routine,
        owner_type: Option<&TypeDecl>,
        module_id: &EntityId,
    ) -> Option<EntityId> {
        // `self.engine.start()`: the receiver is an owned attribute.
        if let Some(attr_name) = attribute_receiver(receiver) {
            let owner = owner_type?;
            let attr = owner
                .attributes
                .iter()
                .filter_map(|id| self.model.attributes.get(id))
                .find(|a| a.name == attr_name)?;
            let target = attr.type_ref.clone()?;
            return (!target.is_external()).then_some(target);
        }

        // PHP `self::` / `static::` stay on the owner.
        if matches!(receiver, "self" | "static") {
            return owner_type.map(|t| t.id.clone());
        }

        let bare = receiver.trim_start_matches('$');
        if let Some(param) = caller
            .params
            .iter()
            .find(|p| p.name == bare || p.name == receiver)
        {
            let annotation = param.annotation.as_deref()?;
            let core = parse_type_expr(annotation).core;
            if !core.is_empty() {
                return self.resolver.resolve_type(module_id, &core);
            }
            return None;
        }
        if let Some(local) = caller
            .locals
            .iter()
            .find(|l| l.name == receiver || l.name.trim_start_matches('$') == bare)
        {
            let core = parse_type_expr(&local.type_text).core;
            if !core.is_empty() {
                return self.resolver.resolve_type(module_id, &core);
            }
            return None;
        }

        // Static dispatch through a type name.
        self.resolver.resolve_type(module_id, receiver)
    }
}

fn is_self_receiver(receiver: &str) -> bool {
    matches!(receiver, "self" | "this" | "$this")
}

fn bare_name(name: &str) -> &str {
    name.rsplit(['.', '\\']).next().unwrap_or(name)
}

/// `self.engine` / `this.engine` / `$this->engine` → `engine`.
fn attribute_receiver(receiver: &str) -> Option<&str> {
    for prefix in ["self.", "this.", "$this->"] {
        if let Some(rest) = receiver.strip_prefix(prefix) {
            if !rest.is_empty() && !rest.contains(['.', '(', '-', '[']) {
                return Some(rest);
            }
        }
    }
    None
}
