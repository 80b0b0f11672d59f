use itertools::Itertools;

use crate::{Name, PpdlError, Res};

/// The typed object universe of an instance.
///
/// Iteration over the instances of a type follows declaration order, which
/// fixes the canonical enumeration used by grounding and aggregations.
#[derive(Clone, Debug, Default)]
pub struct Objects {
    /// Types in declaration order.
    order: Vec<Name>,
    instances: hashbrown::HashMap<Name, Vec<Name>>,
    /// Reverse mapping object -> type.
    owner: hashbrown::HashMap<Name, Name>,
}

impl Objects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_type(&mut self, tpe: impl Into<Name>, objects: Vec<Name>) {
        let tpe = tpe.into();
        for obj in &objects {
            self.owner.insert(obj.clone(), tpe.clone());
        }
        if !self.instances.contains_key(&tpe) {
            self.order.push(tpe.clone());
        }
        self.instances.entry(tpe).or_default().extend(objects);
    }

    pub fn instances_of(&self, tpe: &str) -> Res<&[Name]> {
        self.instances
            .get(tpe)
            .map(|v| v.as_slice())
            .ok_or_else(|| PpdlError::UndefinedVariable(tpe.into()))
    }

    pub fn type_of(&self, obj: &str) -> Option<&Name> {
        self.owner.get(obj)
    }

    pub fn contains_object(&self, obj: &str) -> bool {
        self.owner.contains_key(obj)
    }

    pub fn types(&self) -> impl Iterator<Item = &Name> + '_ {
        self.order.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Cartesian product of the instances of `param_types`, in declaration
    /// order. An empty parameter list yields the single empty tuple.
    pub fn tuples(&self, param_types: &[Name]) -> Res<Vec<Vec<Name>>> {
        if param_types.is_empty() {
            return Ok(vec![Vec::new()]);
        }
        let mut per_type = Vec::with_capacity(param_types.len());
        for tpe in param_types {
            per_type.push(self.instances_of(tpe)?.iter().cloned());
        }
        Ok(per_type.into_iter().multi_cartesian_product().collect())
    }
}
