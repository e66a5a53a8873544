pub mod control;
pub mod device;
pub mod discovery;
pub mod soap;
pub mod ssdp;
