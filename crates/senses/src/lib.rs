//! Sense inventory builder: for every cleaned word and phrase, ensure the
//! registry holds a small set of pedagogically distinct senses.
//!
//! Sources, in order of preference: senses already in the registry (no
//! network), dictionary API entries clustered by a balanced-tier LLM, and
//! direct LLM generation from exam contexts when the dictionary is silent.
//! Pattern entries take a structural path through the closed display-name
//! tables instead.

mod cluster;
mod dictionary;
mod inventory;
mod patterns;
mod prompts;

pub use dictionary::{DictionaryApi, DictionaryClient, DictionarySense};
pub use inventory::{ProgressFn, assign_all_senses};
pub use patterns::{category_display_name, subtype_display_name, subtype_structure};
