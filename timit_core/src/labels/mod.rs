pub mod phone;
pub mod phone_map;
pub mod vocab;
