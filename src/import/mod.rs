pub mod dedup;
pub mod entry;
pub mod importer;
pub mod mapping;
pub mod matcher;
pub mod possible_values;
pub mod prompter;
pub mod resolver;
pub mod tags;
