pub mod address_repository;

pub use address_repository::{AddressError, AddressRepository, InMemoryAddressRepository};
