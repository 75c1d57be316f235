//! CSS support: declarations, the patch allow-list, stylesheet scanning and a
//! static cascade.

pub mod cascade;
pub mod declaration;
pub mod sanitize;
pub mod stylesheet;

pub use cascade::{StyleMap, effective_style};
pub use declaration::{
    Declaration, DeclarationError, parse_declaration, parse_declaration_block,
    parse_valid_declarations, serialize_declarations, upsert_declaration,
};
pub use sanitize::{SNAPSHOT_PROPERTIES, check_declaration, check_value, is_allowed_property};
pub use stylesheet::{StyleRule, StyleSheetSet, readable_sheets};
