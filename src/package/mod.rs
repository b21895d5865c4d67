pub mod hash;
pub mod manifest;
pub mod objects;
pub mod publish;
pub mod store;
