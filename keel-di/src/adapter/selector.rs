//! Constructor selection the way the host does it.

use keel_core::{
    ConstructorInfo, ConstructorSelector, Parameter, ParameterKind, PluggedType, RegistrationModel,
};

/// A constructor marked with `#[inject]` wins. Otherwise the constructor with the most
/// parameters the model can satisfy; the first declared wins a tie. Optional and sequence
/// parameters are always satisfiable.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostConstructorSelector;

impl ConstructorSelector for HostConstructorSelector {
    fn select<'a>(
        &self,
        plugged: &'a PluggedType,
        model: &RegistrationModel,
    ) -> Option<&'a ConstructorInfo> {
        let constructors = plugged.constructors();
        if let Some(marked) = constructors.iter().find(|constructor| constructor.is_marked()) {
            return Some(marked);
        }
        constructors
            .iter()
            .rev()
            .filter(|constructor| {
                constructor
                    .parameters()
                    .iter()
                    .all(|parameter| satisfiable(model, parameter))
            })
            .max_by_key(|constructor| constructor.parameters().len())
    }
}

fn satisfiable(model: &RegistrationModel, parameter: &Parameter) -> bool {
    match parameter.kind() {
        ParameterKind::Required => model.can_resolve(parameter.service_type()),
        ParameterKind::Optional | ParameterKind::Sequence => true,
    }
}
