//! Static tag, name and entity tables.
//!
//! All tables are initialized once on first use and never mutated.

mod dtd;
pub mod entities;
mod names;
mod rules;
mod tag_set;
mod tags;

pub use dtd::{
    ContextDef, ContextText, Dtd, Fill, FillCode, LiteralMode, Scope, TagDefinition,
    TextContainer, TextType, is_tag_in_set,
};
pub use entities::{MAX_ENTITY_LEN, lookup_entity, numeric_reference};
pub use names::{AttrId, MAX_NAME_LEN, NameId, lookup_name};
pub use tag_set::{TagSet, TagSetId};
pub use tags::TagId;
