pub mod count_ancestors;
pub mod escape_class_name;
pub mod extract_class_name;
pub mod generate_hash;
pub mod generate_utility_class_name;
pub mod remove_rule_if_empty;
pub mod split_comma_separated;
pub mod split_component_values;
