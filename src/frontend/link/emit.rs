//! Rendering the linked surface back to source text.

use crate::frontend::ast::Declaration;
use crate::frontend::printer::{PrintConfig, Printer};

use super::{LinkedMember, LinkedUnit};

/// Print the linked surface. Signature annotations (`->`, `:`) never appear in the output.
pub fn render(unit: &LinkedUnit<'_>, config: PrintConfig) -> String {
    let mut printer = Printer::new(config);
    print_members(&mut printer, &unit.root.members);
    printer.finish()
}

fn print_members(printer: &mut Printer, members: &[LinkedMember<'_>]) {
    for (i, member) in members.iter().enumerate() {
        if i > 0 {
            printer.separate();
        }
        match member {
            LinkedMember::Declaration(Declaration::Alias(alias)) if !alias.signatures.is_empty() => {
                let mut plain = alias.clone();
                plain.signatures.clear();
                printer.print_declaration(&Declaration::Alias(plain));
            }
            LinkedMember::Declaration(decl) => printer.print_declaration(decl),
            LinkedMember::OpaqueType(name) => printer.print_opaque_type(name),
            LinkedMember::Module(module) => {
                printer.open_module(&module.name, &[]);
                print_members(printer, &module.members);
                printer.close_block();
            }
        }
    }
}
