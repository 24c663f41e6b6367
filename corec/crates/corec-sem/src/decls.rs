//! The four declaration lists plus `main` that stage 3 hands to stage 5 and
//! the driver (spec §4.3: "four declaration lists ... plus the `main`
//! value").

use corec_role::DefId;

use crate::value::ValueId;

/// Every top-level declaration stage 3 accepted, grouped by kind, in
/// `roles.order` order.
#[derive(Default)]
pub struct Declarations {
    pub structs: Vec<DefId>,
    pub extern_vars: Vec<DefId>,
    pub extern_functions: Vec<DefId>,
    pub functions: Vec<DefId>,
    pub main: Option<ValueId>,
}
