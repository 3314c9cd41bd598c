use super::{Block, Type, Value};
use crate::ops::Operator;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueDef {
    BlockParam(Block, u32, Type),
    Operator(Operator, Vec<Value>, Vec<Type>),
    Alias(Value),
    Placeholder(Type),
    None,
}

impl std::default::Default for ValueDef {
    fn default() -> Self {
        ValueDef::None
    }
}

impl ValueDef {
    /// The single result type of this value, if it has exactly one.
    pub fn ty(&self) -> Option<Type> {
        match self {
            &ValueDef::BlockParam(_, _, ty) => Some(ty),
            &ValueDef::Operator(_, _, ref tys) if tys.len() == 1 => Some(tys[0]),
            &ValueDef::Placeholder(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn visit_uses<F: FnMut(Value)>(&self, mut f: F) {
        match self {
            &ValueDef::BlockParam { .. } => {}
            &ValueDef::Operator(_, ref args, _) => {
                for &arg in args {
                    f(arg);
                }
            }
            &ValueDef::Alias(value) => f(value),
            &ValueDef::Placeholder(_) => {}
            &ValueDef::None => {}
        }
    }

    pub fn update_uses<F: FnMut(&mut Value)>(&mut self, mut f: F) {
        match self {
            &mut ValueDef::BlockParam { .. } => {}
            &mut ValueDef::Operator(_, ref mut args, _) => {
                for arg in args {
                    f(arg);
                }
            }
            &mut ValueDef::Alias(ref mut value) => f(value),
            &mut ValueDef::Placeholder(_) => {}
            &mut ValueDef::None => {}
        }
    }
}
