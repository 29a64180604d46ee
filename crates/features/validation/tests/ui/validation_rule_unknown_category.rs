#[fstone_derive::validation_rule(id = "x", category = "cosmic")]
pub struct CosmicRule;

fn main() {}
