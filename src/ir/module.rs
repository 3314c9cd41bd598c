use super::{Func, FuncDecl, FunctionBody, ModuleDisplay, Signature, Type};
use crate::entity::EntityVec;
use crate::errors::DeclError;
use fxhash::FxHashMap;

/// A compilation unit: a collection of functions, some defined here
/// and some imported from whatever the unit is eventually linked
/// against.
///
/// Imports double as the unit's symbol table for external functions:
/// `declare_import` hands back the existing entry when an equivalent
/// symbol was declared before, so passes may declare the symbols they
/// call as often as they like.
#[derive(Clone, Debug, Default)]
pub struct Module {
    /// The functions in this module: imports or bodies.
    pub funcs: EntityVec<Func, FuncDecl>,
    /// Type signatures, referred to by `funcs`. Interned: equal
    /// signatures share one entry.
    pub signatures: EntityVec<Signature, SignatureData>,
    /// Imports into this module. Every import also has an entry at
    /// the appropriate function index in `funcs`.
    pub imports: Vec<Import>,
    signature_dedup: FxHashMap<SignatureData, Signature>,
    import_index: FxHashMap<(String, String), Func>,
}

/// A function signature definition.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignatureData {
    /// Parameters: zero or more primitive types.
    pub params: Vec<Type>,
    /// Returns: zero or more primitive types.
    pub returns: Vec<Type>,
}

impl std::fmt::Display for SignatureData {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let params = self
            .params
            .iter()
            .map(|ty| format!("{}", ty))
            .collect::<Vec<_>>();
        let returns = self
            .returns
            .iter()
            .map(|ty| format!("{}", ty))
            .collect::<Vec<_>>();
        write!(f, "({}) -> ({})", params.join(", "), returns.join(", "))
    }
}

/// A module import definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    /// The name of the module the import comes from.
    pub module: String,
    /// The name of the symbol within that module.
    pub name: String,
    /// The function index this import occupies.
    pub func: Func,
}

impl Module {
    pub fn empty() -> Module {
        Module::default()
    }

    /// Intern a signature, returning the existing entry for an equal
    /// signature if there is one.
    pub fn add_signature(&mut self, sig: SignatureData) -> Signature {
        if let Some(&id) = self.signature_dedup.get(&sig) {
            return id;
        }
        let id = self.signatures.push(sig.clone());
        self.signature_dedup.insert(sig, id);
        id
    }

    /// Add a function definition.
    pub fn add_func(&mut self, sig: Signature, name: &str, body: FunctionBody) -> Func {
        let func = self.funcs.push(FuncDecl::Body(sig, name.to_owned(), body));
        log::trace!("add_func: {} = {} {}", func, name, self.signatures[sig]);
        func
    }

    /// Declare an external function `module::name` with signature
    /// `sig`. Re-declaring an equivalent symbol returns the existing
    /// function; re-declaring it with another signature is an error.
    pub fn declare_import(
        &mut self,
        module: &str,
        name: &str,
        sig: SignatureData,
    ) -> Result<Func, DeclError> {
        let key = (module.to_owned(), name.to_owned());
        if let Some(&func) = self.import_index.get(&key) {
            if self.signatures[self.funcs[func].sig()] != sig {
                return Err(DeclError::Conflict {
                    name: format!("{}::{}", module, name),
                });
            }
            return Ok(func);
        }
        let sig = self.add_signature(sig);
        let func = self.funcs.push(FuncDecl::Import(sig, name.to_owned()));
        self.imports.push(Import {
            module: module.to_owned(),
            name: name.to_owned(),
            func,
        });
        self.import_index.insert(key, func);
        log::debug!("declared import {}::{} as {}", module, name, func);
        Ok(func)
    }

    pub fn lookup_import(&self, module: &str, name: &str) -> Option<Func> {
        self.import_index
            .get(&(module.to_owned(), name.to_owned()))
            .copied()
    }

    /// The import entry backing `func`, if `func` is an import.
    pub fn import_of(&self, func: Func) -> Option<&Import> {
        self.imports.iter().find(|import| import.func == func)
    }

    /// Return a wrapper that implements Display on this module,
    /// pretty-printing it as textual IR.
    pub fn display(&self) -> ModuleDisplay<'_> {
        ModuleDisplay(self)
    }
}
