//! Displaying IR.

use super::{FuncDecl, FunctionBody, Module, ValueDef};

use std::fmt::{Display, Formatter, Result as FmtResult};

pub struct FunctionBodyDisplay<'a>(
    pub(crate) &'a FunctionBody,
    pub(crate) &'a str,
    pub(crate) bool,
);

impl<'a> Display for FunctionBodyDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let arg_tys = self.0.blocks.get(self.0.entry).map_or(vec![], |entry| {
            entry
                .params
                .iter()
                .take(self.0.n_params)
                .map(|(ty, _)| format!("{}", ty))
                .collect::<Vec<_>>()
        });
        let ret_tys = self
            .0
            .rets
            .iter()
            .map(|&ty| format!("{}", ty))
            .collect::<Vec<_>>();
        writeln!(
            f,
            "{}function({}) -> {} {{",
            self.1,
            arg_tys.join(", "),
            ret_tys.join(", ")
        )?;

        if self.2 {
            for (value, value_def) in self.0.values.entries() {
                writeln!(f, "{}  {} = {:?}", self.1, value, value_def)?;
            }
        }

        for (block_id, block) in self.0.blocks.entries() {
            let block_params = block
                .params
                .iter()
                .map(|(ty, val)| format!("{}: {}", val, ty))
                .collect::<Vec<_>>();
            writeln!(f, "{}  {}({}):", self.1, block_id, block_params.join(", "))?;
            for &pred in &block.preds {
                writeln!(f, "{}    # pred: {}", self.1, pred)?;
            }
            for &succ in &block.succs {
                writeln!(f, "{}    # succ: {}", self.1, succ)?;
            }
            for &inst in &block.insts {
                let inst = self.0.resolve_alias(inst);
                match &self.0.values[inst] {
                    ValueDef::Operator(op, args, tys) => {
                        let args = args
                            .iter()
                            .map(|&v| {
                                let v = self.0.resolve_alias(v);
                                format!("{}", v)
                            })
                            .collect::<Vec<_>>();
                        let tys = tys.iter().map(|&ty| format!("{}", ty)).collect::<Vec<_>>();
                        writeln!(
                            f,
                            "{}    {} = {} {} # {}",
                            self.1,
                            inst,
                            op,
                            args.join(", "),
                            tys.join(", ")
                        )?;
                    }
                    other => {
                        writeln!(f, "{}    {} = <{:?}>", self.1, inst, other)?;
                    }
                }
            }
            writeln!(f, "{}    {}", self.1, block.terminator)?;
        }

        writeln!(f, "{}}}", self.1)?;

        Ok(())
    }
}

pub struct ModuleDisplay<'a>(pub(crate) &'a Module);

impl<'a> Display for ModuleDisplay<'a> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        writeln!(f, "module {{")?;
        for (func, func_decl) in self.0.funcs.entries() {
            match func_decl {
                FuncDecl::Body(sig, name, body) => {
                    writeln!(
                        f,
                        "  {} \"{}\": {} = # {}",
                        func, name, sig, self.0.signatures[*sig]
                    )?;
                    write!(f, "{}", body.display("    "))?;
                }
                FuncDecl::Import(sig, name) => {
                    let module = self
                        .0
                        .import_of(func)
                        .map(|import| import.module.as_str())
                        .unwrap_or("?");
                    writeln!(
                        f,
                        "  {}: import \"{}\".\"{}\": {} # {}",
                        func, module, name, sig, self.0.signatures[*sig]
                    )?;
                }
            }
        }
        writeln!(f, "}}")?;
        Ok(())
    }
}
