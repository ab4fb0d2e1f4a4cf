pub mod ami_map;
pub mod generate;
