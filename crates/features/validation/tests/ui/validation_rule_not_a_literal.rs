const ID: &str = "x";

#[fstone_derive::validation_rule(id = ID, category = "version")]
pub struct ConstIdRule;

fn main() {}
