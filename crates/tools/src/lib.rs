//! Small helpers shared by the collection and request layers: runtime type
//! tags, the form body serializer and a few numeric utilities.

pub mod error;
pub mod numeric;
pub mod serialize;
pub mod text;
pub mod type_tag;

pub use error::{Result, ToolsError};
pub use numeric::{
    is_between, random_number, round, round_to_string, MAX_SAFE_INTEGER, MIN_SAFE_INTEGER,
};
pub use serialize::{coerce_to_string, serialize_object};
pub use text::capitalize_first_letter;
pub use type_tag::{is_type, TypeTag};
