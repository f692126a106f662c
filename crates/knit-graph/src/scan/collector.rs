//! AST visitor that records where root-scope symbols are read and spelled.

use oxc_ast::ast::{
    AssignmentTargetPropertyIdentifier, BindingIdentifier, BindingProperty, IdentifierReference,
    ObjectProperty, TSClassImplements, TSType, TSTypeParameterDeclaration,
    TSTypeParameterInstantiation,
};
use oxc_ast_visit::{Visit, walk};
use oxc_semantic::{Scoping, SymbolId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::module_id::SymbolIdx;

use super::records::Occurrence;

/// Collects references and identifier positions for one module.
///
/// Type positions are skipped entirely: they are erased at runtime, so a
/// name used only in an annotation must not keep a declaration alive.
pub(super) struct ReferenceCollector<'s> {
    scoping: &'s Scoping,
    root_symbols: &'s FxHashMap<SymbolId, SymbolIdx>,
    /// Root symbols read or written by the statement being visited.
    pub referenced: Vec<SymbolIdx>,
    pub occurrences: Vec<Occurrence>,
    pub globals: FxHashSet<String>,
    pub nested_names: FxHashSet<String>,
    shorthand: bool,
}

impl<'s> ReferenceCollector<'s> {
    pub fn new(scoping: &'s Scoping, root_symbols: &'s FxHashMap<SymbolId, SymbolIdx>) -> Self {
        Self {
            scoping,
            root_symbols,
            referenced: Vec::new(),
            occurrences: Vec::new(),
            globals: FxHashSet::default(),
            nested_names: FxHashSet::default(),
            shorthand: false,
        }
    }

    /// Take the references gathered since the last call, sorted and unique.
    pub fn take_referenced(&mut self) -> Vec<SymbolIdx> {
        let mut referenced = std::mem::take(&mut self.referenced);
        referenced.sort_unstable();
        referenced.dedup();
        referenced
    }
}

impl<'a> Visit<'a> for ReferenceCollector<'_> {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        let shorthand = std::mem::take(&mut self.shorthand);
        let symbol = ident
            .reference_id
            .get()
            .and_then(|reference| self.scoping.get_reference(reference).symbol_id());

        match symbol {
            Some(symbol_id) => {
                if let Some(&symbol) = self.root_symbols.get(&symbol_id) {
                    self.referenced.push(symbol);
                    self.occurrences.push(Occurrence {
                        span: ident.span,
                        symbol,
                        shorthand,
                    });
                }
            }
            None => {
                self.globals.insert(ident.name.to_string());
            }
        }
    }

    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        let shorthand = std::mem::take(&mut self.shorthand);
        match ident
            .symbol_id
            .get()
            .and_then(|symbol_id| self.root_symbols.get(&symbol_id))
        {
            Some(&symbol) => self.occurrences.push(Occurrence {
                span: ident.span,
                symbol,
                shorthand,
            }),
            None => {
                self.nested_names.insert(ident.name.to_string());
            }
        }
    }

    fn visit_object_property(&mut self, prop: &ObjectProperty<'a>) {
        self.shorthand = prop.shorthand;
        walk::walk_object_property(self, prop);
        self.shorthand = false;
    }

    fn visit_binding_property(&mut self, prop: &BindingProperty<'a>) {
        self.shorthand = prop.shorthand;
        walk::walk_binding_property(self, prop);
        self.shorthand = false;
    }

    fn visit_assignment_target_property_identifier(
        &mut self,
        prop: &AssignmentTargetPropertyIdentifier<'a>,
    ) {
        self.shorthand = true;
        walk::walk_assignment_target_property_identifier(self, prop);
        self.shorthand = false;
    }

    fn visit_ts_type(&mut self, _ty: &TSType<'a>) {}

    fn visit_ts_class_implements(&mut self, _implements: &TSClassImplements<'a>) {}

    fn visit_ts_type_parameter_declaration(&mut self, _params: &TSTypeParameterDeclaration<'a>) {}

    fn visit_ts_type_parameter_instantiation(
        &mut self,
        _params: &TSTypeParameterInstantiation<'a>,
    ) {
    }
}
