//! Resolve all aliases.

use crate::ir::{FunctionBody, ValueDef};

/// Rewrite every use of an alias, in value definitions and in
/// terminators, to the value it ultimately refers to.
pub fn run(body: &mut FunctionBody) {
    log::trace!(
        "resolve_aliases: running on:\n{}\n",
        body.display_verbose("| "),
    );
    for value in body.values.iter() {
        let mut value_def = std::mem::take(&mut body.values[value]);
        match &mut value_def {
            ValueDef::Operator(_, args, _) => {
                for arg in args.iter_mut() {
                    *arg = body.resolve_and_update_alias(*arg);
                }
            }
            ValueDef::Alias(to) => {
                *to = body.resolve_alias(*to);
            }
            _ => {}
        }
        body.values[value] = value_def;
    }
    let mut blocks = std::mem::take(&mut body.blocks);
    for block in blocks.values_mut() {
        block.terminator.update_uses(|u| {
            *u = body.resolve_alias(*u);
        });
    }
    body.blocks = blocks;
}
